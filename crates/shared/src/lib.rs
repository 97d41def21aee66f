//! 共享库
//!
//! 包含平台各服务共用的配置、领域事件词汇、可观测性初始化与内存存储等基础设施代码。

pub mod config;
pub mod events;
pub mod observability;
pub mod store;
