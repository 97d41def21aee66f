//! 推送网关抽象
//!
//! 通过 `PushGateway` trait 抽象外部推送服务的「批量发送」单一操作。
//! 网关协议要求数据负载为纯字符串键值对，且单次调用的端点数量有硬上限。
//! 生产环境接入真实推送服务的 SDK 时只需实现同一 trait；
//! 仓库内提供模拟实现（仅记录日志、全部成功）用于开发环境验证管道完整性。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;

/// 单次网关调用的端点数量上限
///
/// 这是网关协议的硬性约束，不是可调参数
pub const MAX_TOKENS_PER_BATCH: usize = 500;

/// 网关报告的永久失效错误码
///
/// 命中这些错误码的端点应被标记为不活跃，后续投递不再解析到它们
pub const TOKEN_NOT_REGISTERED: &str = "registration-token-not-registered";
pub const INVALID_TOKEN: &str = "invalid-registration-token";

/// 合成错误码：网关凭证未配置（非网关报告的按端点失败）
pub const GATEWAY_UNCONFIGURED: &str = "gateway-unconfigured";
/// 合成错误码：整批调用在传输层失败（超时、连接中断）
pub const GATEWAY_ERROR: &str = "gateway-error";

/// 推送消息负载
///
/// data 的所有值已字符串化：网关协议只接受字符串键值对
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

/// 网关报告的按端点错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayError {
    pub code: String,
    pub message: String,
}

impl GatewayError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// 该端点是否已永久失效（应被停用）
    pub fn is_token_invalid(&self) -> bool {
        self.code == TOKEN_NOT_REGISTERED || self.code == INVALID_TOKEN
    }
}

/// 单端点发送结果，顺序与提交的端点列表一致
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    pub error: Option<GatewayError>,
}

impl SendOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: GatewayError) -> Self {
        Self {
            success: false,
            error: Some(error),
        }
    }
}

/// 单批调用的网关响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponse {
    pub success_count: usize,
    pub failure_count: usize,
    /// 与提交端点列表同序的按端点结果
    pub outcomes: Vec<SendOutcome>,
}

impl BatchResponse {
    /// 由按端点结果汇总计数构造响应
    pub fn from_outcomes(outcomes: Vec<SendOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        Self {
            success_count,
            failure_count: outcomes.len() - success_count,
            outcomes,
        }
    }

    /// 全部成功的响应
    pub fn all_success(count: usize) -> Self {
        Self::from_outcomes(vec![SendOutcome::ok(); count])
    }
}

/// 推送网关 trait
///
/// 唯一操作：对一批端点发送同一条消息，返回按端点的成功/失败结果。
/// 实现方不需要处理端点数量上限与去重，那是调度器的职责。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    /// 对一批端点发送消息
    ///
    /// 返回 Err 表示整批调用在传输层失败（超时、连接中断），
    /// 按端点的业务失败通过 [`BatchResponse`] 的 outcomes 上报。
    async fn send_batch(&self, message: &PushMessage, tokens: &[String]) -> Result<BatchResponse>;
}

// ---------------------------------------------------------------------------
// 模拟网关
// ---------------------------------------------------------------------------

/// 模拟推送网关
///
/// 仅记录日志并对全部端点返回成功，便于在无外部依赖的情况下
/// 验证扇出管道的完整性。生产环境替换为真实推送服务的实现。
pub struct SimulatedPushGateway;

#[async_trait]
impl PushGateway for SimulatedPushGateway {
    async fn send_batch(&self, message: &PushMessage, tokens: &[String]) -> Result<BatchResponse> {
        info!(
            token_count = tokens.len(),
            title = %message.title,
            "模拟发送推送批次"
        );
        Ok(BatchResponse::all_success(tokens.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_error_invalid_classification() {
        assert!(GatewayError::new(TOKEN_NOT_REGISTERED, "token 未注册").is_token_invalid());
        assert!(GatewayError::new(INVALID_TOKEN, "token 非法").is_token_invalid());
        assert!(!GatewayError::new("internal-error", "服务端错误").is_token_invalid());
        assert!(!GatewayError::new(GATEWAY_UNCONFIGURED, "网关未配置").is_token_invalid());
    }

    #[test]
    fn test_batch_response_counts() {
        let response = BatchResponse::from_outcomes(vec![
            SendOutcome::ok(),
            SendOutcome::failed(GatewayError::new(TOKEN_NOT_REGISTERED, "token 未注册")),
            SendOutcome::ok(),
        ]);

        assert_eq!(response.success_count, 2);
        assert_eq!(response.failure_count, 1);
        assert_eq!(response.outcomes.len(), 3);
    }

    #[tokio::test]
    async fn test_simulated_gateway_all_success() {
        let gateway = SimulatedPushGateway;
        let message = PushMessage {
            title: "测试标题".to_string(),
            body: "测试内容".to_string(),
            data: HashMap::new(),
        };
        let tokens: Vec<String> = (0..3).map(|i| format!("token-{i}")).collect();

        let response = gateway.send_batch(&message, &tokens).await.unwrap();

        assert_eq!(response.success_count, 3);
        assert_eq!(response.failure_count, 0);
        assert!(response.outcomes.iter().all(|o| o.success));
    }
}
