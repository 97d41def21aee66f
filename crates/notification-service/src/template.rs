//! 通知模板注册表
//!
//! 按通知类型渲染标题、正文与结构化数据三元组。类型到渲染函数的映射是
//! 封闭的 match 而非插件机制：新增类型属于发版变更。渲染是纯函数，
//! 无 I/O 无副作用；上下文字段缺失时降级为中性占位文本，不会渲染失败。

use std::collections::HashMap;

use medilink_shared::events::NotificationType;

/// 渲染结果三元组
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub title: String,
    pub body: String,
    /// 上下文中实际出现的字段回显（字符串化），供客户端深链使用
    pub data: HashMap<String, String>,
}

/// 根据通知类型和上下文渲染消息
///
/// 上下文为类型特定形状的 JSON 对象；每种类型使用的字段见各分支。
pub fn render(notification_type: NotificationType, context: &serde_json::Value) -> RenderedMessage {
    match notification_type {
        NotificationType::AppointmentConfirmed => {
            let doctor = extract_str(context, "doctorName", "医生");
            let date = extract_str(context, "appointmentDate", "指定时间");
            RenderedMessage {
                title: "预约已确认".to_string(),
                body: format!("您与 {doctor} 的预约已确认，就诊时间：{date}"),
                data: collect(context, &["doctorName", "appointmentDate", "appointmentId"]),
            }
        }
        NotificationType::AppointmentCancelled => {
            let doctor = extract_str(context, "doctorName", "医生");
            let reason = extract_str(context, "reason", "未说明原因");
            RenderedMessage {
                title: "预约已取消".to_string(),
                body: format!("您与 {doctor} 的预约已取消，原因：{reason}"),
                data: collect(context, &["doctorName", "reason", "appointmentId"]),
            }
        }
        NotificationType::TokenCalled => {
            let doctor = extract_str(context, "doctorName", "医生");
            let token = token_phrase(context);
            RenderedMessage {
                title: "就诊叫号提醒".to_string(),
                body: format!("{doctor} 正在呼叫{token}，请尽快前往诊室"),
                data: collect(context, &["doctorName", "tokenNumber", "queueId"]),
            }
        }
        NotificationType::TokenSkipped => {
            let token = token_phrase(context);
            RenderedMessage {
                title: "排队号已过号".to_string(),
                body: format!("{token}已被跳过，请到分诊台重新排队"),
                data: collect(context, &["doctorName", "tokenNumber", "queueId"]),
            }
        }
        NotificationType::TokenCompleted => {
            let doctor = extract_str(context, "doctorName", "医生");
            RenderedMessage {
                title: "就诊已完成".to_string(),
                body: format!("您在 {doctor} 处的本次就诊已完成，感谢使用"),
                data: collect(context, &["doctorName", "tokenNumber", "queueId"]),
            }
        }
        NotificationType::AccountApproved => RenderedMessage {
            title: "账号审核通过".to_string(),
            body: "您的入驻申请已审核通过，现在可以开始接诊/接单了".to_string(),
            data: collect(context, &["accountId"]),
        },
        NotificationType::AccountRejected => {
            let reason = extract_str(context, "reason", "未说明原因");
            RenderedMessage {
                title: "账号审核未通过".to_string(),
                body: format!("很抱歉，您的入驻申请未通过审核，原因：{reason}"),
                data: collect(context, &["accountId", "reason"]),
            }
        }
        NotificationType::TicketCreated => {
            let subject = extract_str(context, "ticketSubject", "新工单");
            RenderedMessage {
                title: "收到新工单".to_string(),
                body: format!("「{subject}」已创建，请及时处理"),
                data: collect(context, &["ticketId", "ticketSubject"]),
            }
        }
        NotificationType::TicketReplied => {
            let subject = extract_str(context, "ticketSubject", "您的工单");
            RenderedMessage {
                title: "工单有新回复".to_string(),
                body: format!("「{subject}」有新回复，请查看"),
                data: collect(context, &["ticketId", "ticketSubject"]),
            }
        }
        NotificationType::ReportReady => {
            let lab = extract_str(context, "labName", "检验机构");
            RenderedMessage {
                title: "检验报告已出".to_string(),
                body: format!("{lab} 已出具您的检验报告，请在报告页查看"),
                data: collect(context, &["labName", "reportId"]),
            }
        }
        NotificationType::PrescriptionReady => {
            let pharmacy = extract_str(context, "pharmacyName", "药房");
            RenderedMessage {
                title: "处方药品已备好".to_string(),
                body: format!("{pharmacy} 已备好您的处方药品，请及时取药"),
                data: collect(context, &["pharmacyName", "prescriptionId"]),
            }
        }
    }
}

/// 排队号短语
///
/// 有号码时为「您的 N 号」，缺失时降级为中性的「您的排队号」
fn token_phrase(context: &serde_json::Value) -> String {
    match context.get("tokenNumber") {
        Some(v) => format!("您的 {} 号", stringify(v)),
        None => "您的排队号".to_string(),
    }
}

/// 从 JSON 对象中安全提取字符串值
///
/// 对数值等非字符串类型自动转换为字符串表示，确保模板渲染不会
/// 因上游数据类型不匹配而失败。
fn extract_str(data: &serde_json::Value, key: &str, default: &str) -> String {
    data.get(key)
        .map(stringify)
        .unwrap_or_else(|| default.to_string())
}

/// 回显上下文中实际出现的字段，值统一字符串化
fn collect(context: &serde_json::Value, keys: &[&str]) -> HashMap<String, String> {
    let mut data = HashMap::new();
    for key in keys {
        if let Some(v) = context.get(*key) {
            data.insert((*key).to_string(), stringify(v));
        }
    }
    data
}

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
