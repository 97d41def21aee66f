//! 通知编排器
//!
//! 扇出管道的顶层入口：给定事件类型、接收者列表与上下文数据，渲染消息、
//! 为每个接收者持久化通知记录、解析其活跃端点、调用批次调度器投递，
//! 并把投递结果写回记录。
//!
//! ## 设计说明
//!
//! - **接收者相互隔离**：逐个顺序处理，单个接收者的任何失败都不会
//!   影响其他接收者的处理与记录结果
//! - **只有模板解析失败会使整个调用失败**（此时零条记录被创建）
//! - **部分失败是数据不是异常**：调度结果分类为终态写回记录
//! - 本层不做自动重试；调用方希望重试时重新调用 publish

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

use medilink_shared::events::{DeliveryStatus, NotificationType, Recipient, RecipientRole};

use crate::device::DeviceRegistry;
use crate::dispatcher::{DispatchResult, PushDispatcher};
use crate::error::{NotificationError, Result};
use crate::gateway::PushMessage;
use crate::models::NotificationRecord;
use crate::repository::NotificationRepository;
use crate::template::{self, RenderedMessage};

/// 无活跃端点时写入结果的结构化原因码
pub const REASON_NO_TOKENS: &str = "no_tokens";

/// 单个接收者的发布结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientOutcome {
    pub role: RecipientRole,
    pub user_id: String,
    pub status: DeliveryStatus,
    /// 结构化原因码（如 no_tokens），仅在未发起调度时填写
    pub reason: Option<String>,
    /// 调度聚合结果，含完整的按端点错误列表
    pub send_result: Option<DispatchResult>,
}

/// 通知编排器
#[derive(Clone)]
pub struct NotificationService {
    records: Arc<dyn NotificationRepository>,
    devices: DeviceRegistry,
    dispatcher: PushDispatcher,
}

impl NotificationService {
    pub fn new(
        records: Arc<dyn NotificationRepository>,
        devices: DeviceRegistry,
        dispatcher: PushDispatcher,
    ) -> Self {
        Self {
            records,
            devices,
            dispatcher,
        }
    }

    /// 发布通知（字符串事件类型入口）
    ///
    /// 类型标签无法解析时整个调用失败且零条记录被创建；
    /// 通过类型检查后不存在「整体失败」的概念，无论各接收者结果如何
    /// 都返回完整的逐接收者结果列表。
    #[instrument(
        skip(self, recipients, context, data),
        fields(event_type = %event_type, recipient_count = recipients.len())
    )]
    pub async fn publish(
        &self,
        event_type: &str,
        recipients: &[Recipient],
        context: &serde_json::Value,
        data: &HashMap<String, String>,
    ) -> Result<Vec<RecipientOutcome>> {
        let notification_type = NotificationType::parse(event_type).ok_or_else(|| {
            NotificationError::UnknownNotificationType(event_type.to_string())
        })?;

        self.publish_typed(notification_type, recipients, context, data)
            .await
    }

    /// 发布通知（已持有枚举的调用方入口）
    pub async fn publish_typed(
        &self,
        notification_type: NotificationType,
        recipients: &[Recipient],
        context: &serde_json::Value,
        data: &HashMap<String, String>,
    ) -> Result<Vec<RecipientOutcome>> {
        let rendered = template::render(notification_type, context);

        // 渲染数据与调用方数据合并，键冲突时调用方优先
        let mut merged = rendered.data.clone();
        merged.extend(data.clone());

        let mut outcomes = Vec::with_capacity(recipients.len());

        for recipient in recipients {
            // 角色无法识别属于配置不匹配：记录日志并丢弃该接收者，
            // 不计入结果列表，也不创建记录
            let Some(role) = RecipientRole::parse(&recipient.role) else {
                warn!(
                    role = %recipient.role,
                    user_id = %recipient.user_id,
                    "接收者角色无法识别，丢弃该接收者"
                );
                continue;
            };

            match self
                .deliver(notification_type, &rendered, &merged, role, &recipient.user_id)
                .await
            {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => {
                    // 接收者相互隔离：记录创建失败等错误只影响当前接收者
                    error!(
                        user_id = %recipient.user_id,
                        role = %role,
                        error = %e,
                        "单个接收者的投递流程失败，继续处理其余接收者"
                    );
                }
            }
        }

        info!(
            outcome_count = outcomes.len(),
            sent = count_status(&outcomes, DeliveryStatus::Sent),
            partial = count_status(&outcomes, DeliveryStatus::Partial),
            failed = count_status(&outcomes, DeliveryStatus::Failed),
            skipped = count_status(&outcomes, DeliveryStatus::Skipped),
            "通知发布完成"
        );

        Ok(outcomes)
    }

    /// 处理单个接收者：建记录、解析端点、调度、写回终态
    async fn deliver(
        &self,
        notification_type: NotificationType,
        rendered: &RenderedMessage,
        merged: &HashMap<String, String>,
        role: RecipientRole,
        user_id: &str,
    ) -> Result<RecipientOutcome> {
        // 在任何网络调用之前创建 Pending 记录
        let data_json = serde_json::Value::Object(
            merged
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        );
        let record = NotificationRecord::new(
            notification_type,
            &rendered.title,
            &rendered.body,
            data_json,
            role,
            user_id,
        );
        self.records.create(&record).await?;

        // 端点解析是投递时刻的点查；记录创建之后的任何失败都必须
        // 把记录推进到终态，不允许停留在 Pending
        let tokens = match self.devices.list_active(user_id).await {
            Ok(tokens) => tokens,
            Err(e) => {
                let reason = e.to_string();
                self.finish_record(&record.id, DeliveryStatus::Failed, Some(reason.clone()))
                    .await;
                return Ok(RecipientOutcome {
                    role,
                    user_id: user_id.to_string(),
                    status: DeliveryStatus::Failed,
                    reason: Some(reason),
                    send_result: None,
                });
            }
        };

        if tokens.is_empty() {
            self.finish_record(
                &record.id,
                DeliveryStatus::Skipped,
                Some("无活跃设备端点".to_string()),
            )
            .await;
            return Ok(RecipientOutcome {
                role,
                user_id: user_id.to_string(),
                status: DeliveryStatus::Skipped,
                reason: Some(REASON_NO_TOKENS.to_string()),
                send_result: None,
            });
        }

        // 负载中带上记录 ID 与角色，供客户端把推送关联到存储的记录
        let mut payload = merged.clone();
        payload.insert("notificationId".to_string(), record.id.clone());
        payload.insert("role".to_string(), role.as_str().to_string());

        let message = PushMessage {
            title: rendered.title.clone(),
            body: rendered.body.clone(),
            data: payload,
        };

        let send_result = self.dispatcher.send(&message, &tokens).await;
        let status = classify(&send_result);
        // 记录里只留首条错误摘要，完整列表在内存结果中
        let first_error = send_result.errors.first().map(|e| e.message.clone());

        self.finish_record(&record.id, status, first_error).await;

        Ok(RecipientOutcome {
            role,
            user_id: user_id.to_string(),
            status,
            reason: None,
            send_result: Some(send_result),
        })
    }

    /// 把记录推进到终态；写回失败只记录日志，不影响返回的结果
    async fn finish_record(&self, id: &str, status: DeliveryStatus, error: Option<String>) {
        if let Err(e) = self.records.update_delivery(id, status, error).await {
            error!(record_id = %id, status = %status, error = %e, "写回投递状态失败");
        }
    }
}

/// 把调度聚合结果分类为终态
///
/// skipped 优先于计数判断：网关未配置时 failure_count 非零但仍是 Skipped
fn classify(result: &DispatchResult) -> DeliveryStatus {
    if result.skipped {
        DeliveryStatus::Skipped
    } else if result.success_count > 0 && result.failure_count == 0 {
        DeliveryStatus::Sent
    } else if result.success_count > 0 {
        DeliveryStatus::Partial
    } else {
        DeliveryStatus::Failed
    }
}

fn count_status(outcomes: &[RecipientOutcome], status: DeliveryStatus) -> usize {
    outcomes.iter().filter(|o| o.status == status).count()
}
