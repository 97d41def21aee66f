//! 可观测性初始化
//!
//! 提供结构化日志的统一初始化入口。按配置在 json（结构化，便于采集）
//! 与 pretty（人类可读，本地开发）两种输出格式之间切换。

use anyhow::Result;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::config::ObservabilityConfig;

/// 初始化 tracing 日志
///
/// 环境变量 RUST_LOG 优先于配置文件中的 log_level。
/// 重复初始化返回错误而非 panic，便于在测试中安全调用。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = if config.log_format == "json" {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_returns_error() {
        let config = ObservabilityConfig::default();
        // 第一次初始化可能因其他测试已注册全局 subscriber 而失败，
        // 但第二次一定失败，且不应 panic
        let _ = init(&config);
        assert!(init(&config).is_err());
    }
}
