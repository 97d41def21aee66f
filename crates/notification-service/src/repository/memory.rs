//! 内存仓储实现
//!
//! 基于共享库的 `MemoryStore` 实现仓储接口，提供与文档存储一致的
//! 按键 upsert 与点更新语义。用于测试与开发环境。

use async_trait::async_trait;
use chrono::Utc;

use medilink_shared::events::DeliveryStatus;
use medilink_shared::store::MemoryStore;

use crate::error::{NotificationError, Result};
use crate::models::{DeviceToken, NotificationRecord};

use super::traits::{DeviceTokenRepository, NotificationRepository};

/// 内存设备端点仓储
///
/// 以 token 值为键，保证同一端点值全系统至多一行。
#[derive(Debug, Clone, Default)]
pub struct InMemoryDeviceTokenRepository {
    store: MemoryStore<DeviceToken>,
}

impl InMemoryDeviceTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceTokenRepository for InMemoryDeviceTokenRepository {
    async fn upsert(&self, token: &DeviceToken) -> Result<()> {
        self.store.insert(&token.token, token.clone());
        Ok(())
    }

    async fn find_by_value(&self, token_value: &str) -> Result<Option<DeviceToken>> {
        Ok(self.store.get(token_value))
    }

    async fn delete_by_value(&self, token_value: &str) -> Result<()> {
        self.store.remove(token_value);
        Ok(())
    }

    async fn list_active_by_user(&self, user_id: &str) -> Result<Vec<DeviceToken>> {
        Ok(self
            .store
            .list_by(|token| token.active && token.user_id == user_id))
    }

    async fn deactivate(&self, token_value: &str) -> Result<()> {
        // 不存在的端点视为已停用，保持幂等
        self.store.update(token_value, |token| {
            token.active = false;
            token.last_used_at = Utc::now();
        });
        Ok(())
    }
}

/// 内存通知记录仓储
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationRepository {
    store: MemoryStore<NotificationRecord>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前记录总数（测试断言用）
    pub fn count(&self) -> usize {
        self.store.count()
    }

    /// 列出全部记录（测试断言用）
    pub fn list(&self) -> Vec<NotificationRecord> {
        self.store.list_by(|_| true)
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, record: &NotificationRecord) -> Result<()> {
        self.store.insert(&record.id, record.clone());
        Ok(())
    }

    async fn update_delivery(
        &self,
        id: &str,
        status: DeliveryStatus,
        error: Option<String>,
    ) -> Result<()> {
        let updated = self.store.update(id, |record| {
            record.mark(status, error.clone());
        });

        if updated {
            Ok(())
        } else {
            Err(NotificationError::Storage(format!("通知记录不存在: {id}")))
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<NotificationRecord>> {
        Ok(self.store.get(id))
    }
}
