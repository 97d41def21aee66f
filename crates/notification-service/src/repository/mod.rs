//! 仓储层
//!
//! 持久化是外部协作方：此处只定义文档存储语义的仓储接口，
//! 并提供基于共享内存存储的实现，用于测试与开发环境。

mod memory;
mod traits;

pub use memory::{InMemoryDeviceTokenRepository, InMemoryNotificationRepository};
pub use traits::{DeviceTokenRepository, NotificationRepository};

#[cfg(test)]
pub use traits::{MockDeviceTokenRepository, MockNotificationRepository};
