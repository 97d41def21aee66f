//! 通知领域模型
//!
//! 定义设备端点注册与通知记录两类实体。端点以 token 值为全局唯一键；
//! 通知记录按接收者逐条创建，投递状态从 Pending 恰好一次地更新为终态。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use medilink_shared::events::{DeliveryStatus, NotificationType, RecipientRole};

/// 推送投递渠道标识
///
/// 当前子系统只有推送一种渠道；邮件等渠道由外部协作方负责
pub const PUSH_CHANNEL: &str = "push";

// ---------------------------------------------------------------------------
// DeviceToken — 设备端点注册
// ---------------------------------------------------------------------------

/// 设备端点注册行
///
/// token 值全系统唯一：重复注册同一 token 是按键覆盖（upsert）而非新增。
/// 平台与设备类型仅作信息记录，不参与投递决策。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceToken {
    /// 端点值（推送网关颁发的不透明 token）
    pub token: String,
    /// 所属用户 ID
    pub user_id: String,
    /// 所属用户角色（原始系统中对应独立的用户存储集合）
    pub role: RecipientRole,
    /// 平台标识（android/ios/web），仅信息记录
    pub platform: Option<String>,
    /// 设备类型，仅信息记录
    pub device_type: Option<String>,
    /// 活跃标志；网关报告 token 永久失效时由调度器置为 false
    pub active: bool,
    /// 最近一次注册/使用时间
    pub last_used_at: DateTime<Utc>,
    /// 任意元数据（如 App 版本、设备型号）
    pub metadata: serde_json::Value,
    /// 首次注册时间
    pub created_at: DateTime<Utc>,
}

impl DeviceToken {
    /// 创建新的端点注册行，active 默认为 true
    pub fn new(
        token: impl Into<String>,
        user_id: impl Into<String>,
        role: RecipientRole,
    ) -> Self {
        let now = Utc::now();
        Self {
            token: token.into(),
            user_id: user_id.into(),
            role,
            platform: None,
            device_type: None,
            active: true,
            last_used_at: now,
            metadata: serde_json::Value::Null,
            created_at: now,
        }
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform;
        self
    }

    pub fn with_device_type(mut self, device_type: Option<String>) -> Self {
        self.device_type = device_type;
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

// ---------------------------------------------------------------------------
// NotificationRecord — 通知记录
// ---------------------------------------------------------------------------

/// 通知记录中的接收者标识
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordRecipient {
    pub user_id: String,
    pub role: RecipientRole,
}

/// 投递状态子记录
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryState {
    /// 投递渠道（当前固定为 push）
    pub channel: String,
    pub status: DeliveryStatus,
    /// 失败时的首条错误摘要（完整错误列表在内存结果中）
    pub error: Option<String>,
}

/// 通知记录
///
/// 每个接收者一条记录，在任何网络调用之前创建（status = Pending），
/// 调度完成后恰好更新一次为终态。记录不持有端点：端点解析是投递时刻的
/// 点查，两者之间端点的增删不会反映到记录上。本子系统不删除记录。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    /// 记录唯一标识（UUID v7，时间有序便于索引）
    pub id: String,
    /// 所属事件类型
    pub event_type: NotificationType,
    /// 渲染后的标题
    pub title: String,
    /// 渲染后的正文
    pub body: String,
    /// 结构化数据负载（渲染数据与调用方数据合并后的结果）
    pub data: serde_json::Value,
    pub recipient: RecordRecipient,
    pub delivery: DeliveryState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NotificationRecord {
    /// 创建投递状态为 Pending 的新记录
    pub fn new(
        event_type: NotificationType,
        title: impl Into<String>,
        body: impl Into<String>,
        data: serde_json::Value,
        role: RecipientRole,
        user_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7().to_string(),
            event_type,
            title: title.into(),
            body: body.into(),
            data,
            recipient: RecordRecipient {
                user_id: user_id.into(),
                role,
            },
            delivery: DeliveryState {
                channel: PUSH_CHANNEL.to_string(),
                status: DeliveryStatus::Pending,
                error: None,
            },
            created_at: now,
            updated_at: now,
        }
    }

    /// 将投递状态更新为终态
    pub fn mark(&mut self, status: DeliveryStatus, error: Option<String>) {
        self.delivery.status = status;
        self.delivery.error = error;
        self.updated_at = Utc::now();
    }
}
