//! Reload broadcaster.
//!
//! Fans `reload` and `build-error` messages out to every connected browser.
//! Each client owns a small bounded queue; publishing never waits on a
//! client, so one stalled tab cannot hold up the others. A message that
//! does not fit is dropped for that client only.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::CliError;

/// Queue depth per client.
pub const CLIENT_CHANNEL_CAPACITY: usize = 10;

/// First frame written to every event stream.
pub const CONNECTED_FRAME: &str = "data: connected\n\n";

/// Message delivered to browsers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServeMessage {
    /// A new artefact is being served.
    Reload,
    /// The last build failed; the payload is the compiler's diagnostics.
    BuildError(String),
}

impl ServeMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ServeMessage::Reload => "reload",
            ServeMessage::BuildError(_) => "build-error",
        }
    }

    pub fn payload(&self) -> &str {
        match self {
            ServeMessage::Reload => "build succeeded",
            ServeMessage::BuildError(payload) => payload,
        }
    }

    /// Server-sent event framing.
    ///
    /// Errors use the `compileerror` event name with one `data:` line per
    /// payload line so multi-line diagnostics survive intact.
    pub fn to_frame(&self) -> String {
        match self {
            ServeMessage::Reload => "data: reload\n\n".to_string(),
            ServeMessage::BuildError(payload) => {
                let mut frame = String::from("event: compileerror\n");
                for line in payload.replace('\r', "").split('\n') {
                    frame.push_str("data: ");
                    frame.push_str(line);
                    frame.push('\n');
                }
                frame.push('\n');
                frame
            }
        }
    }
}

pub type ClientId = u64;

/// Receiving half handed to an event stream.
#[derive(Debug)]
pub struct ClientChannel {
    pub id: ClientId,
    pub receiver: mpsc::Receiver<ServeMessage>,
}

/// Outcome of one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
}

#[derive(Debug, Default)]
struct Registry {
    clients: HashMap<ClientId, mpsc::Sender<ServeMessage>>,
    last_error: Option<String>,
    closed: usize,
    shut_down: bool,
}

impl Registry {
    /// Deliver `message` to every client without waiting.
    fn publish(&mut self, message: ServeMessage) -> Delivery {
        let mut delivery = Delivery::default();
        let mut gone = Vec::new();

        for (id, sender) in &self.clients {
            match sender.try_send(message.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    delivery.dropped += 1;
                    tracing::debug!(client = id, kind = message.kind(), "Client queue full, dropping message");
                }
                Err(TrySendError::Closed(_)) => gone.push(*id),
            }
        }

        for id in gone {
            self.clients.remove(&id);
            self.closed += 1;
        }

        delivery
    }
}

/// Registry of connected clients.
#[derive(Debug, Default)]
pub struct Broadcaster {
    registry: Mutex<Registry>,
    next_id: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client.
    ///
    /// If the most recent build failed, the error is already queued so late
    /// joiners see it. After [`Broadcaster::shutdown`] the returned channel
    /// is closed immediately.
    pub fn register(&self) -> ClientChannel {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(CLIENT_CHANNEL_CAPACITY);

        let mut registry = self.registry.lock();
        if registry.shut_down {
            registry.closed += 1;
            return ClientChannel { id, receiver };
        }
        if let Some(error) = &registry.last_error {
            let _ = sender.try_send(ServeMessage::BuildError(error.clone()));
        }
        registry.clients.insert(id, sender);
        tracing::debug!(client = id, clients = registry.clients.len(), "Client connected");

        ClientChannel { id, receiver }
    }

    /// Remove a client, closing its channel. Returns false if it was
    /// already gone.
    pub fn unregister(&self, id: ClientId) -> bool {
        let mut registry = self.registry.lock();
        let removed = registry.clients.remove(&id).is_some();
        if removed {
            registry.closed += 1;
            tracing::debug!(client = id, clients = registry.clients.len(), "Client disconnected");
        }
        removed
    }

    /// Tell every client to reload.
    pub fn reload(&self) -> Delivery {
        let mut registry = self.registry.lock();
        registry.last_error = None;
        registry.publish(ServeMessage::Reload)
    }

    /// Send a failure description to every client.
    pub fn error(&self, err: &CliError) -> Delivery {
        self.build_error(err.describe())
    }

    /// Record `payload` as the last error and send it to every client.
    ///
    /// Both happen under one lock, so a client registering concurrently gets
    /// the error exactly once: queued by [`Broadcaster::register`] or by this
    /// publish, never both.
    pub fn build_error(&self, payload: impl Into<String>) -> Delivery {
        let payload = payload.into();
        let mut registry = self.registry.lock();
        registry.last_error = Some(payload.clone());
        registry.publish(ServeMessage::BuildError(payload))
    }

    /// Close every channel and refuse further registrations. Returns the
    /// number of channels closed.
    pub fn shutdown(&self) -> usize {
        let mut registry = self.registry.lock();
        registry.shut_down = true;
        let count = registry.clients.len();
        registry.clients.clear();
        registry.closed += count;
        count
    }

    pub fn client_count(&self) -> usize {
        self.registry.lock().clients.len()
    }

    /// Channels closed so far, by unregistration, disconnection or shutdown.
    pub fn closed_count(&self) -> usize {
        self.registry.lock().closed
    }

    /// Payload of the most recent build failure, cleared by a reload.
    pub fn last_error(&self) -> Option<String> {
        self.registry.lock().last_error.clone()
    }
}
