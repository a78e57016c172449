//! Message transport: the primary broker path and the append-only
//! fallback log, combined behind one `send`/`receive` contract.

pub mod broker;
pub mod config;
pub mod fallback;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tracing::{instrument, warn};

pub use broker::{AgentChannel, BrokerTransport};
pub use config::TransportConfig;
pub use fallback::FallbackTransport;

use crate::domain_types::AgentId;
use crate::error::TransportError;
use crate::message::Message;

/// Caches the broker's last-observed reachability for `status_cache_ttl`
/// so hot-path sends do not re-probe on every call.
struct StatusCache {
    reachable: AtomicBool,
    checked_at_ms: AtomicU64,
    ttl: Duration,
}

impl StatusCache {
    fn new(ttl: Duration) -> Self {
        Self {
            reachable: AtomicBool::new(true),
            checked_at_ms: AtomicU64::new(0),
            ttl,
        }
    }

    fn is_stale(&self, now_ms: u64) -> bool {
        let checked_at = self.checked_at_ms.load(Ordering::Relaxed);
        now_ms.saturating_sub(checked_at) >= self.ttl.as_millis() as u64
    }

    fn record(&self, now_ms: u64, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
        self.checked_at_ms.store(now_ms, Ordering::Relaxed);
    }
}

fn now_millis() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Message transport combining the broker and fallback-log paths behind a
/// single interface.
pub struct Transport {
    broker: Arc<BrokerTransport>,
    fallback: FallbackTransport,
    status: StatusCache,
}

impl Transport {
    /// Builds a transport over a fresh in-memory broker and the fallback
    /// log rooted at `config.shared_dir`.
    #[must_use]
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            broker: Arc::new(BrokerTransport::new()),
            fallback: FallbackTransport::new(&config.shared_dir),
            status: StatusCache::new(config.status_cache_ttl.as_duration()),
        }
    }

    /// Builds a transport sharing an existing broker instance, for callers
    /// (such as the orchestrator and agent runtimes in the same process)
    /// that must see one another's direct channels.
    #[must_use]
    pub fn with_broker(broker: Arc<BrokerTransport>, config: &TransportConfig) -> Self {
        Self {
            broker,
            fallback: FallbackTransport::new(&config.shared_dir),
            status: StatusCache::new(config.status_cache_ttl.as_duration()),
        }
    }

    /// Registers `agent_id` with the broker, returning the channel it
    /// should hold for the lifetime of its event loop.
    pub fn register(&self, agent_id: AgentId) -> AgentChannel {
        self.broker.register(agent_id)
    }

    /// Removes `agent_id`'s broker registration.
    pub fn deregister(&self, agent_id: AgentId) {
        self.broker.deregister(agent_id);
    }

    /// Sends a message via the broker, falling back to the append-only log
    /// if the broker path fails.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidMessage`] if `message` fails
    /// structural validation, or [`TransportError::Unavailable`] if both
    /// paths fail.
    #[instrument(skip(self, message), fields(message_id = %message.id, intent = ?message.intent))]
    pub async fn send(&self, message: Message) -> Result<(), TransportError> {
        message.validate()?;

        if self.broker_likely_reachable() {
            match self.broker.send(message.clone()) {
                Ok(()) => return Ok(()),
                Err(broker_err) => {
                    self.status.record(now_millis(), false);
                    warn!(error = %broker_err, "broker send failed, falling back to log");
                    return self.fallback.send(&message).await.map_err(|fallback_err| {
                        TransportError::Unavailable {
                            broker: broker_err.to_string(),
                            fallback: fallback_err.to_string(),
                        }
                    });
                }
            }
        }

        self.fallback.send(&message).await
    }

    /// Waits up to `timeout` for the next message addressed to `agent_id`,
    /// preferring the broker's channel and falling back to the log path
    /// if the broker is not reachable.
    ///
    /// Returns `Ok(None)` on timeout; this is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] only if both paths fail
    /// outright (not merely time out).
    pub async fn receive(
        &self,
        channel: &mut AgentChannel,
        agent_id: AgentId,
        timeout: Duration,
    ) -> Result<Option<Message>, TransportError> {
        match BrokerTransport::receive(channel, timeout).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => self.fallback.receive(agent_id, Duration::ZERO).await,
            Err(broker_err) => {
                self.status.record(now_millis(), false);
                self.fallback.receive(agent_id, timeout).await.map_err(|fallback_err| {
                    TransportError::Unavailable {
                        broker: broker_err.to_string(),
                        fallback: fallback_err.to_string(),
                    }
                })
            }
        }
    }

    fn broker_likely_reachable(&self) -> bool {
        let now = now_millis();
        if self.status.is_stale(now) {
            let reachable = self.broker.is_reachable();
            self.status.record(now, reachable);
            reachable
        } else {
            self.status.reachable.load(Ordering::Relaxed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Intent, PayloadKind};
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_should_deliver_via_broker_when_agent_registered() {
        let dir = tempdir().unwrap();
        let config = TransportConfig::testing(dir.path());
        let transport = Transport::new(&config);

        let agent = AgentId::generate();
        let mut channel = transport.register(agent);

        let message = Message::new(
            Intent::Request,
            AgentId::generate(),
            agent,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );
        transport.send(message.clone()).await.unwrap();

        let received = transport
            .receive(&mut channel, agent, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(received.unwrap().id, message.id);
    }

    #[tokio::test]
    async fn test_should_fall_back_to_log_when_recipient_unregistered() {
        let dir = tempdir().unwrap();
        let config = TransportConfig::testing(dir.path());
        let transport = Transport::new(&config);

        let agent = AgentId::generate();
        let message = Message::new(
            Intent::Request,
            AgentId::generate(),
            agent,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );

        // No broker registration for `agent`: broker send fails, fallback
        // should still succeed.
        transport.send(message.clone()).await.unwrap();

        let received = transport
            .fallback
            .receive(agent, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(received.unwrap().id, message.id);
    }
}
