//! Transport implementations
//!
//! Contains LogTransport, QueuedTransport, and RecordingTransport.

mod log;
mod queued;
mod recording;

pub use self::log::LogTransport;
pub use self::queued::QueuedTransport;
pub use self::recording::{FailurePlan, RecordingTransport};
