//! 通知服务进程入口
//!
//! 加载配置、初始化日志，并组装扇出管道。网关凭证缺失时以模拟网关
//! 启动（开发环境），调度器走跳过路径不会报错。

use std::sync::Arc;

use tracing::{info, warn};

use medilink_shared::config::AppConfig;
use medilink_shared::events::{Recipient, RecipientRole};
use medilink_shared::observability;
use notification_service::device::DeviceRegistry;
use notification_service::dispatcher::PushDispatcher;
use notification_service::gateway::{PushGateway, SimulatedPushGateway};
use notification_service::repository::{
    InMemoryDeviceTokenRepository, InMemoryNotificationRepository,
};
use notification_service::service::NotificationService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("notification-service")?;
    observability::init(&config.observability)?;

    info!(
        environment = %config.environment,
        "notification-service 启动中"
    );

    let gateway: Option<Arc<dyn PushGateway>> = if config.push.is_configured() {
        // TODO: 接入真实推送服务 SDK 后在此处构造生产网关
        info!("推送网关凭证已配置，使用模拟网关占位");
        Some(Arc::new(SimulatedPushGateway))
    } else if config.is_production() {
        warn!("生产环境缺少推送网关凭证，所有投递将被跳过");
        None
    } else {
        info!("推送网关未配置，使用模拟网关");
        Some(Arc::new(SimulatedPushGateway))
    };

    let devices = DeviceRegistry::new(Arc::new(InMemoryDeviceTokenRepository::new()));
    let dispatcher = PushDispatcher::new(gateway, devices.clone());
    let service = NotificationService::new(
        Arc::new(InMemoryNotificationRepository::new()),
        devices.clone(),
        dispatcher,
    );

    info!("notification-service 就绪");

    // 开发环境跑一次冒烟扇出，验证模板渲染到网关调用的完整链路
    if !config.is_production() {
        smoke_publish(&service, &devices).await?;
    }

    Ok(())
}

/// 冒烟验证：注册一个示例端点并发布一条叫号通知
async fn smoke_publish(
    service: &NotificationService,
    devices: &DeviceRegistry,
) -> anyhow::Result<()> {
    devices
        .register(
            "smoke-patient",
            RecipientRole::Patient,
            "smoke-token-001",
            Some("android".to_string()),
            None,
            serde_json::Value::Null,
        )
        .await?;

    let outcomes = service
        .publish(
            "TOKEN_CALLED",
            &[Recipient::new("patient", "smoke-patient")],
            &serde_json::json!({ "doctorName": "示例医生", "tokenNumber": 1 }),
            &std::collections::HashMap::new(),
        )
        .await?;

    for outcome in &outcomes {
        info!(
            user_id = %outcome.user_id,
            status = %outcome.status,
            "冒烟扇出结果"
        );
    }

    Ok(())
}
