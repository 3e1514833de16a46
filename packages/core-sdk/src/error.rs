use thiserror::Error;

/**
 * \brief 中继层错误分类。
 * \details 所有失败在中继边界收敛为该枚举，再映射为 HTTP 状态码；
 *          远端返回的错误正文原样透传，不做二次解释。
 */
#[derive(Debug, Error)]
pub enum RelayError {
    /** \brief 会话模式下配置缺少必填字段。 */
    #[error("configuration incomplete: missing {0}")]
    ConfigurationMissing(&'static str),

    /** \brief 没有可发送的消息。 */
    #[error("no message provided")]
    EmptyInput,

    /** \brief 远端在限定时间内未响应。 */
    #[error("upstream request timed out")]
    Timeout,

    /** \brief 远端返回非成功状态，状态码与正文原样保留。 */
    #[error("upstream returned {status}: {body}")]
    Remote { status: u16, body: String },

    /** \brief 网络或解析层故障。 */
    #[error("transport failure: {0}")]
    Transport(String),
}

impl RelayError {
    /**
     * \brief 各错误类别对应的 HTTP 状态码。
     */
    pub fn http_status(&self) -> u16 {
        match self {
            RelayError::ConfigurationMissing(_) | RelayError::EmptyInput => 400,
            RelayError::Timeout => 504,
            RelayError::Remote { status, .. } => *status,
            RelayError::Transport(_) => 500,
        }
    }

    /**
     * \brief 返回给客户端的错误文本；远端错误使用其原始正文。
     */
    pub fn client_message(&self) -> String {
        match self {
            RelayError::Remote { body, .. } if !body.is_empty() => body.clone(),
            other => other.to_string(),
        }
    }
}
