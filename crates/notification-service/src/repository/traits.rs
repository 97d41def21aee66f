//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试。
//! 底层文档存储只需提供按键 upsert、点查与索引查询能力。

use async_trait::async_trait;

use medilink_shared::events::DeliveryStatus;

use crate::error::Result;
use crate::models::{DeviceToken, NotificationRecord};

/// 设备端点仓储接口
///
/// 端点以 token 值为唯一键；活跃标志的写入是按键独立的点更新，
/// 后写覆盖先写（注册与停用都是同键幂等操作）。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    /// 按 token 值插入或覆盖端点行
    async fn upsert(&self, token: &DeviceToken) -> Result<()>;

    /// 按 token 值点查
    async fn find_by_value(&self, token_value: &str) -> Result<Option<DeviceToken>>;

    /// 按 token 值删除；不存在时为空操作
    async fn delete_by_value(&self, token_value: &str) -> Result<()>;

    /// 列出用户的全部活跃端点
    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<DeviceToken>>;

    /// 将端点标记为不活跃；幂等，不存在时为空操作
    async fn deactivate(&self, token_value: &str) -> Result<()>;
}

/// 通知记录仓储接口
///
/// 记录只在创建后更新一次投递状态，本子系统不删除记录。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// 创建通知记录
    async fn create(&self, record: &NotificationRecord) -> Result<()>;

    /// 更新记录的投递状态为终态
    async fn update_delivery(
        &self,
        id: &str,
        status: DeliveryStatus,
        error: Option<String>,
    ) -> Result<()>;

    /// 按记录 ID 点查
    async fn find_by_id(&self, id: &str) -> Result<Option<NotificationRecord>>;
}
