//! Event bus 错误类型

use thiserror::Error;

/// Event bus 错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventBusError {
    /// 数据层已被拦截
    #[error("data layer {name} is already intercepted")]
    AlreadyIntercepted {
        /// 数据层名称
        name: String,
    },
}

/// Event bus Result 类型别名
pub type Result<T> = std::result::Result<T, EventBusError>;
