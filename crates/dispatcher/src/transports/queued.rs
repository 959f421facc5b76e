//! QueuedTransport - buffers commands until the library backend is attached

use std::collections::VecDeque;

use contracts::{ContractError, Transport, TransportCommand};
use tracing::{debug, info, instrument, warn};

/// Command queue standing in for a library that is still loading
///
/// Commands sent before `attach` are buffered (oldest dropped past
/// `capacity`) and replayed in order once a backend is attached. After
/// that every command goes straight to the backend.
pub struct QueuedTransport<B> {
    name: String,
    capacity: usize,
    buffer: VecDeque<TransportCommand>,
    backend: Option<B>,
    overflowed: u64,
}

impl<B: Transport + Send> QueuedTransport<B> {
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            buffer: VecDeque::new(),
            backend: None,
            overflowed: 0,
        }
    }

    /// Commands waiting for a backend
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Commands dropped because the buffer was full
    pub fn overflowed(&self) -> u64 {
        self.overflowed
    }

    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Attach the backend and replay buffered commands in order
    ///
    /// Returns how many buffered commands the backend accepted. A command
    /// the backend rejects during replay is logged and discarded.
    #[instrument(name = "queued_transport_attach", skip(self, backend), fields(transport = %self.name))]
    pub async fn attach(&mut self, mut backend: B) -> usize {
        let buffered = std::mem::take(&mut self.buffer);
        let total = buffered.len();
        let mut replayed = 0;

        for command in buffered {
            let kind = command.kind();
            match backend.send(command).await {
                Ok(()) => replayed += 1,
                Err(e) => warn!(command = kind, error = %e, "Replay failed, command discarded"),
            }
        }

        info!(
            backend = backend.name(),
            replayed,
            discarded = total - replayed,
            "Transport backend attached"
        );
        self.backend = Some(backend);
        replayed
    }

    fn buffer_command(&mut self, command: TransportCommand) {
        if self.buffer.len() >= self.capacity {
            if let Some(oldest) = self.buffer.pop_front() {
                self.overflowed += 1;
                warn!(
                    transport = %self.name,
                    dropped = oldest.kind(),
                    capacity = self.capacity,
                    "Command buffer full, oldest command dropped"
                );
            }
        }
        debug!(transport = %self.name, command = command.kind(), "Command buffered");
        self.buffer.push_back(command);
    }
}

impl<B: Transport + Send> Transport for QueuedTransport<B> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&mut self, command: TransportCommand) -> Result<(), ContractError> {
        match self.backend.as_mut() {
            Some(backend) => backend.send(command).await,
            None => {
                self.buffer_command(command);
                Ok(())
            }
        }
    }
}
