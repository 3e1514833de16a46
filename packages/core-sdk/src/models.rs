use serde::{Deserialize, Serialize};
use serde_json::Value;

/**
 * \brief 消息角色，序列化为小写（system/user/assistant）。
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/**
 * \brief 消息结构，与 OpenAI Chat 消息格式对齐。
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /** \brief 角色：system/user/assistant */
    pub role: Role,
    /** \brief 内容 */
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/**
 * \brief 中继配置记录，三个字段均可缺省。
 * \details 持久化为单个 JSON 对象；缺省的键在序列化时省略。
 */
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /** \brief API 密钥 */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /** \brief 用户显示名称 */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /** \brief 默认模型名 */
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl Config {
    /**
     * \brief 合并部分更新：仅覆盖对方提供的字段，未提供的保持原值。
     */
    pub fn merge(&mut self, partial: Config) {
        if partial.api_key.is_some() {
            self.api_key = partial.api_key;
        }
        if partial.username.is_some() {
            self.username = partial.username;
        }
        if partial.model.is_some() {
            self.model = partial.model;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.username.is_none() && self.model.is_none()
    }
}

/**
 * \brief 请求输入的两种形态：单条消息或完整历史。
 */
#[derive(Debug, Clone, PartialEq)]
pub enum RelayInput {
    /** \brief `{"message": "..."}` */
    Single(String),
    /** \brief `{"messages": [{role, content}, ...]}` */
    History(Vec<Message>),
}

impl RelayInput {
    /**
     * \brief 从请求体 JSON 中识别输入形态。
     * \details `message` 键优先；两种形态都无法识别时返回 None，
     *          由调用方转换为输入错误。
     */
    pub fn from_value(body: &Value) -> Option<RelayInput> {
        if let Some(message) = body.get("message") {
            return message
                .as_str()
                .map(|text| RelayInput::Single(text.to_string()));
        }
        if let Some(messages) = body.get("messages") {
            let parsed: Vec<Message> = serde_json::from_value(messages.clone()).ok()?;
            return Some(RelayInput::History(parsed));
        }
        None
    }
}

/**
 * \brief 单次调用模式的配置覆盖：密钥与模型随请求传递。
 */
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigOverride {
    pub api_key: String,
    pub model: String,
}
