//! Background transport worker
//!
//! Runs chat service requests on a small tokio runtime so the UI thread never
//! blocks. Every request is its own task; completions are reported over a
//! channel in the order they finish, not the order they were issued.

use super::{ChatApi, ChatReply, HistoryEntry, NewSessionReply};
use crate::{MurmurError, Result};
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Requests the UI can issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    /// Send a chat message; `seq` is echoed back in the reply event
    SendMessage { seq: u64, text: String },

    /// Load the server-side conversation history
    FetchHistory,

    /// Ask the service to start a new conversation
    StartNewSession,

    /// Download an audio attachment; `seq` orders downloads by request
    FetchAudio { seq: u64, reference: String },
}

/// Completions reported back to the UI
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Reply { seq: u64, result: Result<ChatReply> },
    History(Result<Vec<HistoryEntry>>),
    NewSession(Result<NewSessionReply>),
    Audio {
        seq: u64,
        reference: String,
        result: Result<Vec<u8>>,
    },
}

/// Owns the runtime that executes [`TransportCommand`]s against a [`ChatApi`]
pub struct TransportWorker {
    api: Arc<dyn ChatApi>,
    runtime: Option<Runtime>,
    event_tx: Sender<TransportEvent>,
    event_rx: Receiver<TransportEvent>,
    in_flight: Arc<AtomicUsize>,
}

impl TransportWorker {
    /// Create a worker with its own runtime
    pub fn new(api: Arc<dyn ChatApi>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("murmur-transport")
            .enable_all()
            .build()
            .map_err(|e| MurmurError::Io(format!("Failed to start transport runtime: {}", e)))?;

        let (event_tx, event_rx) = unbounded();

        info!("Transport worker started");

        Ok(Self {
            api,
            runtime: Some(runtime),
            event_tx,
            event_rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Issue a request. Returns immediately; the outcome arrives as an event.
    pub fn dispatch(&self, command: TransportCommand) -> Result<()> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| MurmurError::Channel("Transport worker has shut down".into()))?;

        let api = Arc::clone(&self.api);
        let event_tx = self.event_tx.clone();
        let in_flight = Arc::clone(&self.in_flight);

        in_flight.fetch_add(1, Ordering::SeqCst);
        debug!("Dispatching {:?}", command);

        runtime.spawn(async move {
            let event = match command {
                TransportCommand::SendMessage { seq, text } => TransportEvent::Reply {
                    seq,
                    result: api.send_message(&text).await,
                },
                TransportCommand::FetchHistory => {
                    TransportEvent::History(api.fetch_history().await)
                }
                TransportCommand::StartNewSession => {
                    TransportEvent::NewSession(api.start_new_session().await)
                }
                TransportCommand::FetchAudio { seq, reference } => {
                    let result = api.fetch_audio(&reference).await;
                    TransportEvent::Audio {
                        seq,
                        reference,
                        result,
                    }
                }
            };

            // Outstanding work stays visible through in_flight or the channel
            if event_tx.send(event).is_err() {
                debug!("Transport event dropped; receiver gone");
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }

    /// Next completed request, if any
    pub fn try_recv(&self) -> Option<TransportEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next completed request
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TransportEvent> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Number of requests issued but not yet completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Whether completed requests are waiting to be received
    pub fn has_pending_events(&self) -> bool {
        !self.event_rx.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.runtime.is_some()
    }

    /// Stop the runtime. Outstanding requests are abandoned, not awaited.
    pub fn shutdown(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            info!("Transport worker stopped");
        }
    }
}

impl Drop for TransportWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}
