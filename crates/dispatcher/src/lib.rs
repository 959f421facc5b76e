//! # Dispatcher
//!
//! 事件分发模块。
//!
//! 负责：
//! - 缓存已接受的事件，延迟到调用栈之外批量发送
//! - 单次 flush 内失败事件重试一次，再失败则丢弃
//! - 传输库加载前缓存命令 (`QueuedTransport`)

pub mod error;
pub mod metrics;
pub mod queue;
pub mod scheduler;
pub mod transports;

pub use contracts::{DispatchItem, Transport, TransportCommand};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use queue::{DispatchQueue, DispatchQueueBuilder, FlushReport, SEND_TO_PARAM};
pub use scheduler::{DeferredTask, IdleScheduler, ManualScheduler, Scheduler};
pub use transports::{FailurePlan, LogTransport, QueuedTransport, RecordingTransport};
