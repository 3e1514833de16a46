use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::models::Config;

/** \brief 默认配置文件名（当前工作目录下）。 */
pub const DEFAULT_CONFIG_FILE: &str = "chatrelay.json";

/**
 * \brief 读取失败的内部区分：文件不存在 vs 内容损坏。
 * \details 仅在存储内部使用；对外两者都折叠为空配置，
 *          缺失或损坏的配置属于正常的首次运行状态。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadError {
    Absent,
    Corrupt,
}

/**
 * \brief 配置存储：单个 JSON 文件承载整条配置记录。
 */
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /**
     * \brief 打开默认位置的配置存储。
     */
    pub fn open_default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CONFIG_FILE),
        }
    }

    /**
     * \brief 打开指定路径的配置存储，用于测试或非默认部署。
     */
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Config, ReadError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Err(ReadError::Absent),
            Err(_) => return Err(ReadError::Corrupt),
        };
        serde_json::from_str(&raw).map_err(|_| ReadError::Corrupt)
    }

    /**
     * \brief 读取当前配置；文件缺失或损坏时返回空配置而非报错。
     */
    pub fn load(&self) -> Config {
        self.read().unwrap_or_default()
    }

    /**
     * \brief 合并部分更新并整体写回，返回合并后的完整记录。
     * \details 先写临时文件再重命名，保证自身访问视角下的原子性；
     *          并发写入为最后写入者胜出。
     */
    pub fn save(&self, partial: Config) -> Result<Config> {
        let mut merged = self.load();
        merged.merge(partial);
        let raw = serde_json::to_string_pretty(&merged)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(merged)
    }

    /**
     * \brief 删除整条配置记录；记录本就不存在时不视为错误。
     */
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = ConfigStore::at(dir.path().join("chatrelay.json"));
        (dir, store)
    }

    #[test]
    fn test_load_without_file_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_partial_saves_merge() {
        let (_dir, store) = temp_store();
        store
            .save(Config {
                api_key: Some("X".into()),
                ..Config::default()
            })
            .expect("save api_key");
        store
            .save(Config {
                username: Some("Y".into()),
                ..Config::default()
            })
            .expect("save username");

        let config = store.load();
        assert_eq!(config.api_key.as_deref(), Some("X"));
        assert_eq!(config.username.as_deref(), Some("Y"));
        assert!(config.model.is_none());
    }

    #[test]
    fn test_save_overwrites_supplied_field_only() {
        let (_dir, store) = temp_store();
        store
            .save(Config {
                api_key: Some("old".into()),
                model: Some("m1".into()),
                ..Config::default()
            })
            .expect("initial save");
        store
            .save(Config {
                api_key: Some("new".into()),
                ..Config::default()
            })
            .expect("partial save");

        let config = store.load();
        assert_eq!(config.api_key.as_deref(), Some("new"));
        assert_eq!(config.model.as_deref(), Some("m1"));
    }

    #[test]
    fn test_clear_then_load_is_empty() {
        let (_dir, store) = temp_store();
        store
            .save(Config {
                api_key: Some("X".into()),
                ..Config::default()
            })
            .expect("save");
        store.clear().expect("clear");
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_clear_without_file_is_ok() {
        let (_dir, store) = temp_store();
        store.clear().expect("clear absent store");
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{not json").expect("write garbage");
        assert_eq!(store.read(), Err(ReadError::Corrupt));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_recovers_on_save() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "{not json").expect("write garbage");
        store
            .save(Config {
                model: Some("m1".into()),
                ..Config::default()
            })
            .expect("save over corrupt file");
        assert_eq!(store.load().model.as_deref(), Some("m1"));
    }
}
