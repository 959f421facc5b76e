//! LogTransport - logs every command via tracing

use contracts::{ContractError, Transport, TransportCommand};
use tracing::{info, instrument};

/// Transport that logs commands, used when no real library is loaded
pub struct LogTransport {
    name: String,
    sent: u64,
}

impl LogTransport {
    /// Create a new LogTransport with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: 0,
        }
    }

    /// Commands logged so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    fn log_command(&self, command: &TransportCommand) {
        match command {
            TransportCommand::Js { at } => {
                info!(transport = %self.name, at = %at, "js");
            }
            TransportCommand::Config { id, options } => {
                info!(
                    transport = %self.name,
                    id = %id,
                    send_page_view = options.send_page_view,
                    transport_url = ?options.transport_url,
                    "config"
                );
            }
            TransportCommand::Event { name, params } => {
                let params = serde_json::to_string(params).unwrap_or_default();
                info!(transport = %self.name, event = %name, params = %params, "event");
            }
        }
    }
}

impl Transport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_transport_send",
        skip(self, command),
        fields(transport = %self.name, command = command.kind())
    )]
    async fn send(&mut self, command: TransportCommand) -> Result<(), ContractError> {
        self.log_command(&command);
        self.sent += 1;
        Ok(())
    }
}
