//! RecordingTransport - in-memory transport for tests and dry runs

use std::sync::Arc;

use contracts::{ContractError, Transport, TransportCommand};
use parking_lot::Mutex;

/// Which sends should fail
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FailurePlan {
    /// Every send succeeds
    #[default]
    Never,
    /// The next `n` sends fail, then everything succeeds
    Next(usize),
    /// Every send fails
    Always,
    /// Every event with this name fails
    Event(String),
}

#[derive(Debug, Default)]
struct Recorded {
    delivered: Vec<TransportCommand>,
    attempts: u64,
    plan: FailurePlan,
}

/// Records delivered commands
///
/// Clones share the same record, so a test can keep one clone while the
/// dispatch queue owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    name: String,
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_plan(name, FailurePlan::Never)
    }

    pub fn with_plan(name: impl Into<String>, plan: FailurePlan) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(Recorded {
                plan,
                ..Recorded::default()
            })),
        }
    }

    /// Replace the failure plan
    pub fn set_plan(&self, plan: FailurePlan) {
        self.inner.lock().plan = plan;
    }

    /// Successfully delivered commands, in order
    pub fn delivered(&self) -> Vec<TransportCommand> {
        self.inner.lock().delivered.clone()
    }

    /// Names of delivered events, in order
    pub fn event_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .delivered
            .iter()
            .filter_map(|command| match command {
                TransportCommand::Event { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect()
    }

    /// Send calls made, failed ones included
    pub fn attempts(&self) -> u64 {
        self.inner.lock().attempts
    }
}

impl Transport for RecordingTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, command: TransportCommand) -> Result<(), ContractError> {
        let mut recorded = self.inner.lock();
        recorded.attempts += 1;

        let fail = match &mut recorded.plan {
            FailurePlan::Never => false,
            FailurePlan::Always => true,
            FailurePlan::Next(0) => false,
            FailurePlan::Next(n) => {
                *n -= 1;
                true
            }
            FailurePlan::Event(target) => {
                matches!(&command, TransportCommand::Event { name, .. } if name == target)
            }
        };

        if fail {
            return Err(ContractError::transport(&self.name, "simulated failure"));
        }
        recorded.delivered.push(command);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ShapedPayload;

    fn event(name: &str) -> TransportCommand {
        TransportCommand::Event {
            name: name.into(),
            params: ShapedPayload::new(),
        }
    }

    #[tokio::test]
    async fn test_next_n_failures() {
        let mut transport = RecordingTransport::with_plan("rec", FailurePlan::Next(1));
        assert!(transport.send(event("a")).await.is_err());
        assert!(transport.send(event("a")).await.is_ok());
        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.event_names(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_named_event_failure_and_shared_record() {
        let observer = RecordingTransport::with_plan("rec", FailurePlan::Event("bad".into()));
        let mut transport = observer.clone();

        assert!(transport.send(event("bad")).await.is_err());
        assert!(transport.send(event("good")).await.is_ok());
        assert_eq!(observer.event_names(), vec!["good"]);
    }

    #[tokio::test]
    async fn test_set_plan_switches_behavior() {
        let mut transport = RecordingTransport::with_plan("rec", FailurePlan::Always);
        assert!(transport.send(event("a")).await.is_err());

        transport.set_plan(FailurePlan::Never);
        assert!(transport.send(event("a")).await.is_ok());
        assert_eq!(transport.attempts(), 2);
        assert_eq!(transport.event_names(), vec!["a"]);
    }
}
