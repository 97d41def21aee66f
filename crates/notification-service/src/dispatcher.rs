//! 推送批次调度器
//!
//! 将端点列表切分为网关允许的批次，逐批调用推送网关，汇总各批的
//! 成功/失败计数，并对网关报告为永久失效的端点触发停用。
//!
//! 部分失败是常态（用户卸载 App、token 轮换），以数据而非异常上报；
//! 单批的传输层失败计入失败数，不中断其余批次。

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::device::DeviceRegistry;
use crate::gateway::{
    GATEWAY_ERROR, GATEWAY_UNCONFIGURED, MAX_TOKENS_PER_BATCH, PushGateway, PushMessage,
};

/// 单端点的投递失败明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchError {
    pub token: String,
    pub message: String,
    pub code: String,
}

/// 一次调度的聚合结果
///
/// skipped 为 true 表示没有发起任何网关调用（无端点，或网关未配置）。
/// 这是合法的终态而非错误。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResult {
    pub success_count: usize,
    pub failure_count: usize,
    pub skipped: bool,
    pub errors: Vec<DispatchError>,
}

impl DispatchResult {
    /// 无端点可投递的跳过结果
    fn skipped_empty() -> Self {
        Self {
            success_count: 0,
            failure_count: 0,
            skipped: true,
            errors: Vec::new(),
        }
    }
}

/// 推送批次调度器
#[derive(Clone)]
pub struct PushDispatcher {
    /// 网关未配置（凭证缺失）时为 None，send 走跳过路径
    gateway: Option<Arc<dyn PushGateway>>,
    /// 用于停用永久失效端点的注册表
    devices: DeviceRegistry,
}

impl PushDispatcher {
    pub fn new(gateway: Option<Arc<dyn PushGateway>>, devices: DeviceRegistry) -> Self {
        Self { gateway, devices }
    }

    /// 向一组端点投递同一条消息
    ///
    /// 端点列表先去重（保留首次出现顺序），再按网关上限切批。
    /// 永不返回错误：所有失败以 [`DispatchResult`] 数据形式上报。
    #[instrument(skip(self, message, token_values), fields(token_count = token_values.len()))]
    pub async fn send(&self, message: &PushMessage, token_values: &[String]) -> DispatchResult {
        let tokens = dedup(token_values);

        if tokens.is_empty() {
            debug!("接收者没有可用端点，跳过投递");
            return DispatchResult::skipped_empty();
        }

        let Some(gateway) = &self.gateway else {
            // 凭证缺失不是按端点的网关失败，用合成错误码区分
            warn!(token_count = tokens.len(), "推送网关未配置，跳过投递");
            return DispatchResult {
                success_count: 0,
                failure_count: tokens.len(),
                skipped: true,
                errors: tokens
                    .into_iter()
                    .map(|token| DispatchError {
                        token,
                        message: "推送网关未配置".to_string(),
                        code: GATEWAY_UNCONFIGURED.to_string(),
                    })
                    .collect(),
            };
        };

        let mut result = DispatchResult {
            success_count: 0,
            failure_count: 0,
            skipped: false,
            errors: Vec::new(),
        };

        for batch in tokens.chunks(MAX_TOKENS_PER_BATCH) {
            match gateway.send_batch(message, batch).await {
                Ok(response) => {
                    result.success_count += response.success_count;
                    result.failure_count += response.failure_count;

                    // outcomes 与提交的端点列表同序
                    for (token, outcome) in batch.iter().zip(&response.outcomes) {
                        let Some(error) = &outcome.error else {
                            continue;
                        };
                        result.errors.push(DispatchError {
                            token: token.clone(),
                            message: error.message.clone(),
                            code: error.code.clone(),
                        });

                        if error.is_token_invalid() {
                            self.deactivate_detached(token.clone());
                        }
                    }
                }
                Err(e) => {
                    // 传输层失败：整批计为失败，不中断其余批次
                    warn!(
                        batch_size = batch.len(),
                        error = %e,
                        "推送批次调用失败"
                    );
                    result.failure_count += batch.len();
                    result.errors.extend(batch.iter().map(|token| DispatchError {
                        token: token.clone(),
                        message: e.to_string(),
                        code: GATEWAY_ERROR.to_string(),
                    }));
                }
            }
        }

        info!(
            success_count = result.success_count,
            failure_count = result.failure_count,
            error_count = result.errors.len(),
            "推送调度完成"
        );

        result
    }

    /// 在后台任务中停用失效端点
    ///
    /// 停用绝不阻塞或影响本次调度的返回；任务自身的失败只记录日志。
    fn deactivate_detached(&self, token: String) {
        let devices = self.devices.clone();
        tokio::spawn(async move {
            debug!(token = %token, "网关报告端点永久失效，停用");
            devices.deactivate(&token).await;
        });
    }
}

/// 去重，保留首次出现顺序
fn dedup(token_values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    token_values
        .iter()
        .filter(|value| seen.insert(value.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::error::{NotificationError, Result};
    use crate::gateway::{
        BatchResponse, GatewayError, MockPushGateway, SendOutcome, TOKEN_NOT_REGISTERED,
    };
    use crate::repository::{DeviceTokenRepository, InMemoryDeviceTokenRepository};
    use medilink_shared::events::RecipientRole;

    use crate::models::DeviceToken;

    /// 记录每批提交端点列表的测试网关
    struct RecordingGateway {
        batches: Mutex<Vec<Vec<String>>>,
        /// 按端点值指定失败错误；未指定的端点返回成功
        failures: HashMap<String, GatewayError>,
        /// 为 true 时整批返回传输层错误
        transport_error: bool,
    }

    impl RecordingGateway {
        fn all_success() -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                failures: HashMap::new(),
                transport_error: false,
            }
        }

        fn with_failures(failures: HashMap<String, GatewayError>) -> Self {
            Self {
                batches: Mutex::new(Vec::new()),
                failures,
                transport_error: false,
            }
        }

        fn recorded(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PushGateway for RecordingGateway {
        async fn send_batch(
            &self,
            _message: &PushMessage,
            tokens: &[String],
        ) -> Result<BatchResponse> {
            self.batches.lock().unwrap().push(tokens.to_vec());

            if self.transport_error {
                return Err(NotificationError::Gateway("请求超时".to_string()));
            }

            let outcomes = tokens
                .iter()
                .map(|token| match self.failures.get(token) {
                    Some(error) => SendOutcome::failed(error.clone()),
                    None => SendOutcome::ok(),
                })
                .collect();
            Ok(BatchResponse::from_outcomes(outcomes))
        }
    }

    fn make_message() -> PushMessage {
        PushMessage {
            title: "就诊叫号提醒".to_string(),
            body: "请前往诊室".to_string(),
            data: HashMap::new(),
        }
    }

    fn make_registry() -> (DeviceRegistry, Arc<InMemoryDeviceTokenRepository>) {
        let repo = Arc::new(InMemoryDeviceTokenRepository::new());
        (DeviceRegistry::new(repo.clone()), repo)
    }

    fn tokens(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("token-{i:04}")).collect()
    }

    /// 带上限轮询等待后台停用任务生效，不依赖固定时延
    async fn wait_until_active_is(
        devices: &DeviceRegistry,
        user_id: &str,
        expected: &[&str],
    ) -> Vec<String> {
        for _ in 0..100 {
            let active = devices.list_active(user_id).await.unwrap();
            if active == expected {
                return active;
            }
            tokio::task::yield_now().await;
        }
        devices.list_active(user_id).await.unwrap()
    }

    #[tokio::test]
    async fn test_send_empty_is_skipped_not_error() {
        let (devices, _) = make_registry();
        let dispatcher =
            PushDispatcher::new(Some(Arc::new(RecordingGateway::all_success())), devices);

        let result = dispatcher.send(&make_message(), &[]).await;

        assert!(result.skipped);
        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 0);
        assert!(result.errors.is_empty());
    }

    #[tokio::test]
    async fn test_send_deduplicates_tokens() {
        let (devices, _) = make_registry();
        let gateway = Arc::new(RecordingGateway::all_success());
        let dispatcher = PushDispatcher::new(Some(gateway.clone()), devices);

        let input = vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
        ];
        let result = dispatcher.send(&make_message(), &input).await;

        // 与去重后调用的行为一致
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failure_count, 0);
        assert_eq!(gateway.recorded(), vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test]
    async fn test_send_without_gateway_is_skipped_with_synthetic_errors() {
        let (devices, _) = make_registry();
        let dispatcher = PushDispatcher::new(None, devices);

        let input = tokens(3);
        let result = dispatcher.send(&make_message(), &input).await;

        assert!(result.skipped);
        assert_eq!(result.success_count, 0);
        assert_eq!(result.failure_count, 3);
        assert_eq!(result.errors.len(), 3);
        // 合成错误码可与网关报告的按端点失败区分
        assert!(result.errors.iter().all(|e| e.code == GATEWAY_UNCONFIGURED));
    }

    #[tokio::test]
    async fn test_send_splits_into_batches_of_gateway_limit() {
        let (devices, _) = make_registry();
        let gateway = Arc::new(RecordingGateway::all_success());
        let dispatcher = PushDispatcher::new(Some(gateway.clone()), devices);

        let input = tokens(MAX_TOKENS_PER_BATCH + 1);
        let result = dispatcher.send(&make_message(), &input).await;

        // ceil(501 / 500) = 2 次网关调用，批大小 500 + 1
        let batches = gateway.recorded();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), MAX_TOKENS_PER_BATCH);
        assert_eq!(batches[1].len(), 1);

        // 各批的并集等于去重后的输入，无遗漏无重复
        let union: Vec<String> = batches.into_iter().flatten().collect();
        assert_eq!(union, input);

        assert_eq!(result.success_count, MAX_TOKENS_PER_BATCH + 1);
        assert_eq!(result.failure_count, 0);
        assert!(!result.skipped);
    }

    #[tokio::test]
    async fn test_send_counts_are_conserved_on_partial_failure() {
        let (devices, _) = make_registry();
        let mut failures = HashMap::new();
        failures.insert(
            "token-0001".to_string(),
            GatewayError::new("internal-error", "服务端错误"),
        );
        failures.insert(
            "token-0003".to_string(),
            GatewayError::new("quota-exceeded", "配额用尽"),
        );
        let gateway = Arc::new(RecordingGateway::with_failures(failures));
        let dispatcher = PushDispatcher::new(Some(gateway), devices);

        let input = tokens(5);
        let result = dispatcher.send(&make_message(), &input).await;

        assert_eq!(result.success_count, 3);
        assert_eq!(result.failure_count, 2);
        assert_eq!(result.success_count + result.failure_count, input.len());
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|e| e.token == "token-0001"));
        assert!(result.errors.iter().any(|e| e.token == "token-0003"));
    }

    #[tokio::test]
    async fn test_send_transport_error_counts_batch_as_failed() {
        let (devices, _) = make_registry();
        let gateway = Arc::new(RecordingGateway {
            batches: Mutex::new(Vec::new()),
            failures: HashMap::new(),
            transport_error: true,
        });
        let dispatcher = PushDispatcher::new(Some(gateway.clone()), devices);

        let input = tokens(MAX_TOKENS_PER_BATCH + 2);
        let result = dispatcher.send(&make_message(), &input).await;

        // 两批都被尝试：单批失败不中断其余批次
        assert_eq!(gateway.recorded().len(), 2);
        assert_eq!(result.failure_count, input.len());
        assert_eq!(result.success_count, 0);
        assert!(!result.skipped);
        assert!(result.errors.iter().all(|e| e.code == GATEWAY_ERROR));
    }

    #[tokio::test]
    async fn test_invalid_token_is_deactivated_and_still_reported() {
        let (devices, repo) = make_registry();
        repo.upsert(&DeviceToken::new("dead-token", "p1", RecipientRole::Patient))
            .await
            .unwrap();
        repo.upsert(&DeviceToken::new("live-token", "p1", RecipientRole::Patient))
            .await
            .unwrap();

        let mut failures = HashMap::new();
        failures.insert(
            "dead-token".to_string(),
            GatewayError::new(TOKEN_NOT_REGISTERED, "token 未注册"),
        );
        let gateway = Arc::new(RecordingGateway::with_failures(failures));
        let dispatcher = PushDispatcher::new(Some(gateway), devices.clone());

        let input = vec!["dead-token".to_string(), "live-token".to_string()];
        let result = dispatcher.send(&make_message(), &input).await;

        // 失效端点仍然出现在错误列表中
        assert_eq!(result.failure_count, 1);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].token, "dead-token");

        // 停用在后台任务中执行，轮询等待它完成
        let active = wait_until_active_is(&devices, "p1", &["live-token"]).await;
        assert_eq!(active, vec!["live-token".to_string()]);
    }

    #[tokio::test]
    async fn test_send_with_mockall_gateway() {
        let (devices, _) = make_registry();
        let mut gateway = MockPushGateway::new();
        gateway
            .expect_send_batch()
            .times(1)
            .returning(|_, tokens| Ok(BatchResponse::all_success(tokens.len())));

        let dispatcher = PushDispatcher::new(Some(Arc::new(gateway)), devices);
        let result = dispatcher.send(&make_message(), &tokens(2)).await;

        assert_eq!(result.success_count, 2);
        assert!(!result.skipped);
    }
}
