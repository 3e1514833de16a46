use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::error::RelayError;
use crate::models::Message;

/** \brief 固定的远端 API 基地址。 */
pub const API_BASE: &str = "https://openrouter.ai/api/v1";

/** \brief 单次外呼的等待上限。 */
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

fn client() -> Result<reqwest::Client, RelayError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| RelayError::Transport(err.to_string()))
}

/** \brief 将 reqwest 故障归类：超时与一般传输故障分开。 */
fn classify(err: reqwest::Error) -> RelayError {
    if err.is_timeout() {
        RelayError::Timeout
    } else {
        RelayError::Transport(err.to_string())
    }
}

/**
 * \brief 非流式聊天调用，返回首个候选的完整回复。
 * \details 单次尝试，不做重试；非成功状态的正文原样带回。
 */
pub async fn chat_once(
    api_base: &str,
    api_key: &str,
    model: &str,
    messages: &[Message],
) -> Result<String, RelayError> {
    let url = format!("{}/chat/completions", api_base.trim_end_matches('/'));
    let body = json!({
        "model": model,
        "messages": messages,
    });

    let resp = client()?
        .post(url)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {}", api_key))
        .json(&body)
        .send()
        .await
        .map_err(classify)?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(RelayError::Remote { status, body });
    }

    let v: Value = resp.json().await.map_err(classify)?;
    extract_reply(&v)
}

/**
 * \brief 列出远端可用模型，仅供前端选择列表使用。
 */
pub async fn list_models(api_base: &str, api_key: &str) -> Result<Vec<String>, RelayError> {
    let url = format!("{}/models", api_base.trim_end_matches('/'));
    let resp = client()?
        .get(url)
        .header(AUTHORIZATION, format!("Bearer {}", api_key))
        .send()
        .await
        .map_err(classify)?;

    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(RelayError::Remote { status, body });
    }

    parse_model_list(resp.json().await.map_err(classify)?)
}

fn extract_reply(v: &Value) -> Result<String, RelayError> {
    v.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            RelayError::Transport(format!("missing choices[0].message.content in: {}", v))
        })
}

fn parse_model_list(v: Value) -> Result<Vec<String>, RelayError> {
    if let Some(arr) = v.get("data").and_then(|x| x.as_array()) {
        Ok(arr
            .iter()
            .filter_map(|item| item.get("id").and_then(|s| s.as_str()))
            .map(|s| s.to_string())
            .collect())
    } else if let Some(arr) = v.as_array() {
        Ok(arr
            .iter()
            .filter_map(|item| {
                item.get("id")
                    .and_then(|s| s.as_str())
                    .or_else(|| item.as_str())
            })
            .map(|s| s.to_string())
            .collect())
    } else {
        Err(RelayError::Transport(format!(
            "unexpected models payload: {}",
            v
        )))
    }
}
