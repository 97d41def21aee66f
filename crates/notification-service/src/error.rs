//! 通知服务错误类型
//!
//! 定义模板解析、接收者解析、存储与网关调用等场景的错误分类。
//! 只有模板解析失败会使整个 publish 调用失败；其余错误都被限制在
//! 单个接收者或单个端点的范围内，以数据而非异常的形式上报。

use thiserror::Error;

/// 通知服务错误类型
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("未知通知类型: {0}")]
    UnknownNotificationType(String),

    #[error("未知接收者角色: {0}")]
    UnknownRecipientRole(String),

    #[error("存储错误: {0}")]
    Storage(String),

    #[error("推送网关错误: {0}")]
    Gateway(String),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 通知服务 Result 类型别名
pub type Result<T> = std::result::Result<T, NotificationError>;

impl NotificationError {
    /// 检查是否为可重试的错误
    ///
    /// 本层不做自动重试，调用方希望重试时重新调用 publish 即可
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Gateway(_))
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownNotificationType(_) => "UNKNOWN_NOTIFICATION_TYPE",
            Self::UnknownRecipientRole(_) => "UNKNOWN_RECIPIENT_ROLE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Gateway(_) => "GATEWAY_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
