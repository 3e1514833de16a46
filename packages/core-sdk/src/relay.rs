use crate::config::ConfigStore;
use crate::error::RelayError;
use crate::llm;
use crate::models::{Config, ConfigOverride, Message, RelayInput, Role};

/** \brief 覆盖模式下未配置显示名称时使用的占位称呼。 */
pub const DEFAULT_USERNAME: &str = "the user";

/**
 * \brief 本次调用生效的完整配置；三个字段均已落定。
 */
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub api_key: String,
    pub username: String,
    pub model: String,
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, RelayError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(RelayError::ConfigurationMissing(field)),
    }
}

/**
 * \brief 求解生效配置。
 * \details 覆盖模式下密钥与模型随请求传递，不要求会话配置齐全；
 *          显示名称取存储值，缺省时用占位称呼。会话模式要求三个
 *          字段全部就绪，缺一即报配置缺失。
 */
pub fn resolve_config(
    stored: &Config,
    override_: Option<&ConfigOverride>,
) -> Result<EffectiveConfig, RelayError> {
    if let Some(ov) = override_ {
        return Ok(EffectiveConfig {
            api_key: ov.api_key.clone(),
            model: ov.model.clone(),
            username: stored
                .username
                .clone()
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
        });
    }

    Ok(EffectiveConfig {
        api_key: required(&stored.api_key, "api_key")?,
        username: required(&stored.username, "username")?,
        model: required(&stored.model, "model")?,
    })
}

/**
 * \brief 合成每次外呼唯一的前置 system 消息，嵌入配置的用户名。
 */
pub fn system_message(username: &str) -> Message {
    Message::new(
        Role::System,
        format!(
            "You are a helpful assistant. Keep your answers focused on what {} requires.",
            username
        ),
    )
}

/**
 * \brief 将输入归一化为一次外呼的消息序列。
 * \details 首条为合成的 system 消息，其后为调用方消息并保持原序；
 *          空白消息、空历史或不含有效用户消息的历史均视为空输入。
 */
pub fn build_messages(username: &str, input: &RelayInput) -> Result<Vec<Message>, RelayError> {
    let mut out = vec![system_message(username)];
    match input {
        RelayInput::Single(text) => {
            if text.trim().is_empty() {
                return Err(RelayError::EmptyInput);
            }
            out.push(Message::new(Role::User, text.clone()));
        }
        RelayInput::History(messages) => {
            if messages.is_empty() {
                return Err(RelayError::EmptyInput);
            }
            let has_user_message = messages
                .iter()
                .any(|m| m.role == Role::User && !m.content.trim().is_empty());
            if !has_user_message {
                return Err(RelayError::EmptyInput);
            }
            out.extend(messages.iter().cloned());
        }
    }
    Ok(out)
}

/**
 * \brief 中继一个会话轮次：校验、归一化并外呼一次，返回回复文本。
 * \details 本身无状态；历史由调用方累积并随每次调用完整传入。
 *          校验失败在构造外呼请求之前返回，不产生网络调用。
 */
pub async fn relay(
    store: &ConfigStore,
    input: &RelayInput,
    override_: Option<&ConfigOverride>,
) -> Result<String, RelayError> {
    let effective = resolve_config(&store.load(), override_)?;
    let messages = build_messages(&effective.username, input)?;
    llm::chat_once(
        llm::API_BASE,
        &effective.api_key,
        &effective.model,
        &messages,
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> Config {
        Config {
            api_key: Some("k".into()),
            username: Some("Ana".into()),
            model: Some("m1".into()),
        }
    }

    #[test]
    fn test_resolve_session_mode_requires_all_fields() {
        for field in ["api_key", "username", "model"] {
            let mut config = full_config();
            match field {
                "api_key" => config.api_key = None,
                "username" => config.username = None,
                _ => config.model = None,
            }
            match resolve_config(&config, None) {
                Err(RelayError::ConfigurationMissing(missing)) => assert_eq!(missing, field),
                other => panic!("expected missing {}, got {:?}", field, other),
            }
        }
    }

    #[test]
    fn test_resolve_blank_field_counts_as_missing() {
        let mut config = full_config();
        config.model = Some("   ".into());
        assert!(matches!(
            resolve_config(&config, None),
            Err(RelayError::ConfigurationMissing("model"))
        ));
    }

    #[test]
    fn test_resolve_override_skips_session_requirements() {
        let ov = ConfigOverride {
            api_key: "ok".into(),
            model: "om".into(),
        };
        let effective = resolve_config(&Config::default(), Some(&ov)).unwrap();
        assert_eq!(effective.api_key, "ok");
        assert_eq!(effective.model, "om");
        assert_eq!(effective.username, DEFAULT_USERNAME);
    }

    #[test]
    fn test_resolve_override_uses_stored_username() {
        let ov = ConfigOverride {
            api_key: "ok".into(),
            model: "om".into(),
        };
        let effective = resolve_config(&full_config(), Some(&ov)).unwrap();
        assert_eq!(effective.username, "Ana");
    }

    #[test]
    fn test_system_message_embeds_username() {
        let message = system_message("Ana");
        assert_eq!(message.role, Role::System);
        assert!(message.content.contains("what Ana requires"));
        assert!(!message.content.contains("{username}"));
    }

    #[test]
    fn test_single_message_normalization() {
        let messages = build_messages("Ana", &RelayInput::Single("Hello".into())).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages.last().unwrap().role, Role::User);
        assert_eq!(messages.last().unwrap().content, "Hello");
    }

    #[test]
    fn test_history_preserves_order_after_system() {
        let history = vec![
            Message::new(Role::User, "hi"),
            Message::new(Role::Assistant, "hello"),
            Message::new(Role::User, "and now?"),
        ];
        let messages = build_messages("Ana", &RelayInput::History(history.clone())).unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(&messages[1..], history.as_slice());
    }

    #[test]
    fn test_blank_message_is_empty_input() {
        assert!(matches!(
            build_messages("Ana", &RelayInput::Single("   \n".into())),
            Err(RelayError::EmptyInput)
        ));
    }

    #[test]
    fn test_empty_history_is_empty_input() {
        assert!(matches!(
            build_messages("Ana", &RelayInput::History(vec![])),
            Err(RelayError::EmptyInput)
        ));
    }

    #[test]
    fn test_history_without_user_message_is_empty_input() {
        let history = vec![Message::new(Role::Assistant, "hello")];
        assert!(matches!(
            build_messages("Ana", &RelayInput::History(history)),
            Err(RelayError::EmptyInput)
        ));
    }
}
