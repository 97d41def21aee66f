//! 通知服务
//!
//! 医疗市场平台的通知扇出与推送投递管道：将领域事件（工单创建、叫号等）
//! 渲染为用户可读的消息，为每个接收者持久化通知记录，解析其活跃推送端点，
//! 分批调用推送网关，并按端点核对部分成功/失败的投递结果。
//!
//! 通知投递始终是尽力而为：任何投递失败都不回滚或阻塞触发它的业务操作。

pub mod device;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod models;
pub mod repository;
pub mod service;
pub mod template;
