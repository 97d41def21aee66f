//! 设备端点注册表
//!
//! 管理用户的推送端点（设备 token）注册：客户端设备直接调用注册/注销，
//! 编排器在投递时通过它解析接收者的活跃端点。注册以 token 值为键做
//! upsert，同一端点值全系统至多一行。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use medilink_shared::events::RecipientRole;

use crate::error::Result;
use crate::models::DeviceToken;
use crate::repository::DeviceTokenRepository;

/// 设备端点注册表
#[derive(Clone)]
pub struct DeviceRegistry {
    repo: Arc<dyn DeviceTokenRepository>,
}

impl DeviceRegistry {
    pub fn new(repo: Arc<dyn DeviceTokenRepository>) -> Self {
        Self { repo }
    }

    /// 注册设备端点（upsert 语义）
    ///
    /// token 值已存在时覆盖其归属/平台/元数据，重置活跃标志并刷新
    /// 最近使用时间；不存在时新建活跃行。用户 ID 或 token 值为空时
    /// 记录日志并返回 None，不视为错误。
    #[instrument(skip(self, metadata), fields(user_id = %user_id, role = %role))]
    pub async fn register(
        &self,
        user_id: &str,
        role: RecipientRole,
        token_value: &str,
        platform: Option<String>,
        device_type: Option<String>,
        metadata: serde_json::Value,
    ) -> Result<Option<DeviceToken>> {
        if user_id.trim().is_empty() || token_value.trim().is_empty() {
            warn!("注册请求缺少用户 ID 或端点值，忽略");
            return Ok(None);
        }

        // 保留首次注册时间，其余字段整体覆盖
        let created_at = self
            .repo
            .find_by_value(token_value)
            .await?
            .map(|existing| existing.created_at);

        let mut token = DeviceToken::new(token_value, user_id, role)
            .with_platform(platform)
            .with_device_type(device_type)
            .with_metadata(metadata);
        if let Some(created_at) = created_at {
            token.created_at = created_at;
        }

        self.repo.upsert(&token).await?;

        info!(
            platform = token.platform.as_deref().unwrap_or("unknown"),
            renewed = created_at.is_some(),
            "设备端点已注册"
        );

        Ok(Some(token))
    }

    /// 注销设备端点；端点不存在时为空操作
    pub async fn unregister(&self, token_value: &str) -> Result<()> {
        if token_value.trim().is_empty() {
            return Ok(());
        }
        self.repo.delete_by_value(token_value).await?;
        info!(token = %token_value, "设备端点已注销");
        Ok(())
    }

    /// 列出用户当前的活跃端点值（去重）
    pub async fn list_active(&self, user_id: &str) -> Result<Vec<String>> {
        let tokens = self.repo.list_active_by_user(user_id).await?;

        let mut seen = std::collections::HashSet::new();
        Ok(tokens
            .into_iter()
            .map(|t| t.token)
            .filter(|value| seen.insert(value.clone()))
            .collect())
    }

    /// 批量列出多个用户的活跃端点值，按用户分组
    ///
    /// 供一次性向大量接收者扇出的调用方使用
    pub async fn list_active_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        let mut grouped = HashMap::new();
        for user_id in user_ids {
            let tokens = self.list_active(user_id).await?;
            grouped.insert(user_id.clone(), tokens);
        }
        Ok(grouped)
    }

    /// 将端点标记为不活跃（尽力而为）
    ///
    /// 停用是投递后的清理动作，失败只记录日志，绝不让它影响
    /// 包含它的调度流程。
    pub async fn deactivate(&self, token_value: &str) {
        if let Err(e) = self.repo.deactivate(token_value).await {
            warn!(token = %token_value, error = %e, "端点停用失败，忽略");
        } else {
            info!(token = %token_value, "端点已停用");
        }
    }
}
