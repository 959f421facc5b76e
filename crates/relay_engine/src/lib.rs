//! # Relay Engine
//!
//! 事件处理核心：过滤、上下文持久化、参数整形。
//!
//! 每个被观察到的对象按固定顺序经过：
//! 1. 上下文更新 (`ContextStore::update`)
//! 2. 事件名存在性检查
//! 3. 屏蔽前缀 / 空名称拒绝
//! 4. 允许前缀拒绝 (启用时)
//! 5. 上下文合并
//! 6. 参数整形 (`PayloadShaper::shape`)
//!
//! 被接受的事件以 `DispatchItem` 形式返回，由调用方送入分发队列。

pub mod context;
pub mod filter;
pub mod processor;
pub mod serialize;
pub mod shaper;

pub use context::{ContextStore, ContextUpdate};
pub use filter::{EventFilter, ParamFilter, Rejection};
pub use processor::{EventProcessor, ProcessOutcome};
pub use serialize::{safe_stringify, safe_stringify_map, CIRCULAR_MARKER};
pub use shaper::{normalize, PayloadShaper};
