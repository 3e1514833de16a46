use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;

use crate::{
    config::ConfigStore,
    error::RelayError,
    llm,
    models::{Config, ConfigOverride, RelayInput},
    relay, telemetry,
};

/**
 * \brief 启动本地 HTTP 服务。
 * \param addr 监听地址，如 "127.0.0.1:5000"
 */
pub async fn run(addr: &str) -> Result<()> {
    let app = router(ConfigStore::open_default());
    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

/**
 * \brief 构建路由；存储作为共享状态注入各处理器。
 */
pub fn router(store: ConfigStore) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/models", get(list_models))
        .route(
            "/api/config",
            get(get_config).post(set_config).delete(clear_config),
        )
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .with_state(store)
}

type ErrorResponse = (StatusCode, Json<Value>);

fn relay_err(err: RelayError) -> ErrorResponse {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"error": err.client_message()})))
}

fn internal_err<E: std::fmt::Display>(err: E) -> ErrorResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": err.to_string()})),
    )
}

/** \brief 请求体同时携带密钥与模型时视为覆盖模式。 */
fn parse_override(body: &Value) -> Option<ConfigOverride> {
    serde_json::from_value(body.clone()).ok()
}

/**
 * \brief 聊天接口：接受单条消息或完整历史两种请求体。
 */
async fn chat(
    State(store): State<ConfigStore>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ErrorResponse> {
    let input = match RelayInput::from_value(&body) {
        Some(input) => input,
        None => {
            telemetry::log_error("server.chat", "unrecognized request body");
            return Err(relay_err(RelayError::EmptyInput));
        }
    };
    let override_ = parse_override(&body);

    let mode = if override_.is_some() {
        "override"
    } else {
        "session"
    };
    let shape = match &input {
        RelayInput::Single(_) => "single".to_string(),
        RelayInput::History(messages) => format!("history len={}", messages.len()),
    };
    telemetry::log_event("server.chat", &format!("relay mode={} {}", mode, shape));

    match relay::relay(&store, &input, override_.as_ref()).await {
        Ok(reply) => Ok(Json(json!({"reply": reply}))),
        Err(err) => {
            telemetry::log_error("server.chat", &format!("relay failed: {}", err));
            Err(relay_err(err))
        }
    }
}

/**
 * \brief 模型列表透传，仅用于填充前端选择列表。
 */
async fn list_models(State(store): State<ConfigStore>) -> Result<Json<Value>, ErrorResponse> {
    let config = store.load();
    let api_key = config
        .api_key
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| relay_err(RelayError::ConfigurationMissing("api_key")))?;
    let models = llm::list_models(llm::API_BASE, &api_key)
        .await
        .map_err(relay_err)?;
    Ok(Json(json!({"models": models})))
}

/**
 * \brief 获取当前配置记录。
 */
async fn get_config(State(store): State<ConfigStore>) -> Json<Config> {
    Json(store.load())
}

/**
 * \brief 部分更新配置：仅覆盖请求中出现的字段。
 */
async fn set_config(
    State(store): State<ConfigStore>,
    Json(partial): Json<Config>,
) -> Result<Json<Config>, ErrorResponse> {
    let merged = store.save(partial).map_err(internal_err)?;
    telemetry::log_event("server.config", "saved configuration");
    Ok(Json(merged))
}

/**
 * \brief 清除整条配置记录。
 */
async fn clear_config(State(store): State<ConfigStore>) -> Result<Json<Value>, ErrorResponse> {
    store.clear().map_err(internal_err)?;
    telemetry::log_event("server.config", "cleared configuration");
    Ok(Json(json!({"cleared": true})))
}

/**
 * \brief 健康检查：尝试列出模型并返回状态，自身不以错误响应。
 */
async fn health_check(State(store): State<ConfigStore>) -> Json<Value> {
    let config = store.load();
    let api_key = match config.api_key {
        Some(key) if !key.trim().is_empty() => key,
        _ => {
            return Json(json!({
                "ok": false,
                "error": "configuration incomplete: missing api_key"
            }))
        }
    };
    match llm::list_models(llm::API_BASE, &api_key).await {
        Ok(models) => Json(json!({
            "ok": true,
            "model": config.model,
            "models": models.len()
        })),
        Err(err) => Json(json!({
            "ok": false,
            "model": config.model,
            "error": err.client_message()
        })),
    }
}
