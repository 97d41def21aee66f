//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// 推送网关配置
///
/// 凭证缺失是合法配置：调度器会降级为「网关未配置」的跳过路径，
/// 进程启动不受影响。
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PushGatewayConfig {
    /// 网关项目标识
    pub project_id: Option<String>,
    /// 服务账号凭证文件路径
    pub credentials_path: Option<String>,
    /// 单次调用超时（毫秒）
    pub timeout_ms: Option<u64>,
}

impl PushGatewayConfig {
    /// 凭证齐全时才视为已配置
    pub fn is_configured(&self) -> bool {
        self.project_id.is_some() && self.credentials_path.is_some()
    }
}

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// 日志输出格式：json（结构化）或 pretty（人类可读）
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

/// 应用配置
///
/// push 与 observability 小节在配置文件中可整体缺省：
/// 无任何配置文件的裸环境下加载仍然成功，网关走未配置的降级路径。
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    #[serde(default)]
    pub push: PushGatewayConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（MEDILINK_ 前缀，如 MEDILINK_PUSH_PROJECT_ID -> push.project_id）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("MEDILINK_ENV").unwrap_or_else(|_| "development".to_string());

        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        let builder = Config::builder()
            // 默认配置
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            // 加载默认配置文件
            .add_source(File::from(Path::new(&config_dir).join("default.toml")).required(false))
            // 加载环境特定配置
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", env))).required(false),
            )
            // 加载服务特定配置（如 notification-service.toml）
            .add_source(
                File::from(Path::new(&config_dir).join(format!("{}.toml", service_name)))
                    .required(false),
            )
            // 环境变量覆盖
            .add_source(
                Environment::with_prefix("MEDILINK")
                    .separator("_")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
