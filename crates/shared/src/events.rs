//! 领域事件词汇
//!
//! 定义通知子系统使用的封闭枚举词汇：通知类型、接收者角色与投递状态。
//! 枚举均为封闭集合，新增类型属于发版变更而非运行时扩展；
//! 字符串标签在日志、存储记录与推送数据负载中统一引用。

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// NotificationType — 通知类型枚举
// ---------------------------------------------------------------------------

/// 通知类型枚举
///
/// 按业务域划分：预约、排队叫号、账号审核、工单、检验/处方。
/// 每种类型在模板注册表中对应唯一的渲染函数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    // 预约类 — 医生与患者双方都可能是接收者
    AppointmentConfirmed,
    AppointmentCancelled,

    // 排队叫号类 — 对时效敏感，错过即失效
    TokenCalled,
    TokenSkipped,
    TokenCompleted,

    // 账号审核类 — 医生/检验所/药房入驻审核结果
    AccountApproved,
    AccountRejected,

    // 工单类
    TicketCreated,
    TicketReplied,

    // 检验报告与处方类
    ReportReady,
    PrescriptionReady,
}

impl NotificationType {
    /// 从字符串标签解析通知类型
    ///
    /// 调用方（工单/预约/叫号等工作流）以字符串传入事件类型，
    /// 未知标签返回 None，由服务层转换为「未知通知类型」错误。
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "APPOINTMENT_CONFIRMED" => Some(Self::AppointmentConfirmed),
            "APPOINTMENT_CANCELLED" => Some(Self::AppointmentCancelled),
            "TOKEN_CALLED" => Some(Self::TokenCalled),
            "TOKEN_SKIPPED" => Some(Self::TokenSkipped),
            "TOKEN_COMPLETED" => Some(Self::TokenCompleted),
            "ACCOUNT_APPROVED" => Some(Self::AccountApproved),
            "ACCOUNT_REJECTED" => Some(Self::AccountRejected),
            "TICKET_CREATED" => Some(Self::TicketCreated),
            "TICKET_REPLIED" => Some(Self::TicketReplied),
            "REPORT_READY" => Some(Self::ReportReady),
            "PRESCRIPTION_READY" => Some(Self::PrescriptionReady),
            _ => None,
        }
    }

    /// 字符串标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppointmentConfirmed => "APPOINTMENT_CONFIRMED",
            Self::AppointmentCancelled => "APPOINTMENT_CANCELLED",
            Self::TokenCalled => "TOKEN_CALLED",
            Self::TokenSkipped => "TOKEN_SKIPPED",
            Self::TokenCompleted => "TOKEN_COMPLETED",
            Self::AccountApproved => "ACCOUNT_APPROVED",
            Self::AccountRejected => "ACCOUNT_REJECTED",
            Self::TicketCreated => "TICKET_CREATED",
            Self::TicketReplied => "TICKET_REPLIED",
            Self::ReportReady => "REPORT_READY",
            Self::PrescriptionReady => "PRESCRIPTION_READY",
        }
    }
}

impl std::fmt::Display for NotificationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 与 serde 的 SCREAMING_SNAKE_CASE 保持一致，
        // 便于在日志、存储记录和推送负载中统一引用
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// RecipientRole — 接收者角色枚举
// ---------------------------------------------------------------------------

/// 接收者角色
///
/// 平台的五类用户角色，原始系统中每个角色对应独立的用户存储集合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientRole {
    Patient,
    Doctor,
    Laboratory,
    Pharmacy,
    Admin,
}

impl RecipientRole {
    /// 从字符串标签解析角色
    ///
    /// 未知角色返回 None，由调用方决定日志与丢弃策略。
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "patient" => Some(Self::Patient),
            "doctor" => Some(Self::Doctor),
            "laboratory" => Some(Self::Laboratory),
            "pharmacy" => Some(Self::Pharmacy),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// 字符串标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor => "doctor",
            Self::Laboratory => "laboratory",
            Self::Pharmacy => "pharmacy",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for RecipientRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Recipient — 通知接收者
// ---------------------------------------------------------------------------

/// 通知接收者
///
/// 角色保持字符串形式，因为调用工作流传入的是未校验的标签；
/// 编排器在处理每个接收者时解析为 [`RecipientRole`]。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipient {
    /// 角色标签（patient/doctor/laboratory/pharmacy/admin）
    pub role: String,
    /// 用户 ID
    pub user_id: String,
}

impl Recipient {
    pub fn new(role: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            user_id: user_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// DeliveryStatus — 投递状态
// ---------------------------------------------------------------------------

/// 投递状态
///
/// 通知记录创建时为 Pending，调度完成后恰好更新一次为终态，
/// 不允许停留在 Pending。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// 记录已创建，尚未尝试投递
    Pending,
    /// 全部端点投递成功
    Sent,
    /// 部分端点成功、部分失败
    Partial,
    /// 全部端点投递失败
    Failed,
    /// 未尝试投递（无可用端点或网关未配置）
    Skipped,
}

impl DeliveryStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// 字符串标签
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Sent => "SENT",
            Self::Partial => "PARTIAL",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
