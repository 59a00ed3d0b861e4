use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::WorldError;

/// Cross-instance message envelope. `data` is free-form JSON owned by the
/// message kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub kind: String,
    pub data: Value,
    pub source_id: String,
    /// Empty means broadcast; otherwise only the listed instances react.
    pub target_ids: Vec<String>,
}

type Handler = Arc<dyn Fn(&Message) + Send + Sync>;

/// In-process pub/sub bus with the cross-instance contract: publishing
/// fans out per channel, handlers dispatch by message kind, and messages
/// originating from this instance are ignored on receipt.
///
/// Each `subscribe` spawns one long-lived consumer task that exits cleanly
/// when the bus shuts down. Bus failures (operating on a shut-down bus, a
/// poisoned lock) surface as messaging errors and never alter the
/// caller's state.
pub struct MessageBus {
    instance_id: String,
    channels: RwLock<HashMap<String, broadcast::Sender<Message>>>,
    handlers: Arc<RwLock<HashMap<String, Vec<Handler>>>>,
    shutdown: watch::Sender<bool>,
}

impl MessageBus {
    pub fn new(instance_id: impl Into<String>) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            instance_id: instance_id.into(),
            channels: RwLock::new(HashMap::new()),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            shutdown,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn is_shut_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    fn ensure_running(&self) -> Result<(), WorldError> {
        if self.is_shut_down() {
            Err(WorldError::Messaging("bus is shut down".to_string()))
        } else {
            Ok(())
        }
    }

    /// Register a handler for a message kind. All handlers for a kind run
    /// in registration order.
    pub fn register_handler(
        &self,
        kind: impl Into<String>,
        handler: impl Fn(&Message) + Send + Sync + 'static,
    ) -> Result<(), WorldError> {
        self.handlers
            .write()
            .map_err(|_| WorldError::Messaging("handler registry lock poisoned".to_string()))?
            .entry(kind.into())
            .or_default()
            .push(Arc::new(handler));
        Ok(())
    }

    fn sender_for(&self, channel: &str) -> Result<broadcast::Sender<Message>, WorldError> {
        let poisoned = || WorldError::Messaging("channel registry lock poisoned".to_string());
        if let Some(sender) = self.channels.read().map_err(|_| poisoned())?.get(channel) {
            return Ok(sender.clone());
        }
        let mut channels = self.channels.write().map_err(|_| poisoned())?;
        Ok(channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(256).0)
            .clone())
    }

    /// Publish a message to a channel. Returns the number of subscribers
    /// that will see it; zero subscribers is not an error, but publishing
    /// on a shut-down bus is.
    pub fn publish(&self, channel: &str, message: Message) -> Result<usize, WorldError> {
        self.ensure_running()?;
        let sender = self.sender_for(channel)?;
        Ok(sender.send(message).unwrap_or(0))
    }

    /// Start a consumer for a channel. The task dispatches each foreign
    /// message to the handlers registered for its kind and exits when the
    /// bus shuts down. Must be called from within a tokio runtime.
    pub fn subscribe(&self, channel: &str) -> Result<JoinHandle<()>, WorldError> {
        self.ensure_running()?;
        let mut rx = self.sender_for(channel)?.subscribe();
        let mut shutdown = self.shutdown.subscribe();
        let handlers = Arc::clone(&self.handlers);
        let instance_id = self.instance_id.clone();
        let channel = channel.to_string();

        Ok(tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            debug!(%channel, "Consumer shutting down");
                            break;
                        }
                    }
                    received = rx.recv() => match received {
                        Ok(message) => {
                            // Never react to our own publishes.
                            if message.source_id == instance_id {
                                continue;
                            }
                            if !message.target_ids.is_empty()
                                && !message.target_ids.iter().any(|t| t == &instance_id)
                            {
                                continue;
                            }
                            let to_run: Vec<Handler> = match handlers.read() {
                                Ok(registry) => registry
                                    .get(&message.kind)
                                    .map(|list| list.to_vec())
                                    .unwrap_or_default(),
                                Err(_) => {
                                    warn!(%channel, "Handler registry poisoned; consumer exiting");
                                    break;
                                }
                            };
                            for handler in to_run {
                                handler(&message);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(%channel, skipped, "Consumer lagged; messages dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        }))
    }

    /// Signal every consumer task to exit. Subsequent publishes and
    /// subscriptions fail with a messaging error.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
