//! Agent runtime: the event loop every agent process drives.
//!
//! One [`AgentRuntime`] per agent. Construction wires a transport, a
//! [`HandlerTable`], and [`AgentLifecycleHooks`] together; [`AgentRuntime::run`]
//! then drives `initialize -> loop { receive, dedup, dispatch } -> cleanup`
//! exactly as the original system's `AgentRuntime.start()` does.

pub mod config;
pub mod handlers;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use tracing::{info, instrument, warn};

pub use config::RuntimeConfig;
pub use handlers::{AgentLifecycleHooks, HandlerContext, HandlerTable, MessageHandler, NoopLifecycleHooks};

use crate::domain_types::{AgentId, MessageId, TaskId};
use crate::error::RuntimeError;
use crate::message::{Intent, Message, PayloadKind};
use crate::transport::Transport;

/// A fixed-capacity set used to recognize messages already handled, so a
/// redelivered message (broker retry, or a reread of the fallback log)
/// is not dispatched twice. Oldest entries are evicted once capacity is
/// reached.
struct DedupSet {
    capacity: usize,
    order: VecDeque<MessageId>,
    seen: HashSet<MessageId>,
}

impl DedupSet {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            seen: HashSet::with_capacity(capacity),
        }
    }

    /// Returns `true` if `id` had not been seen before, recording it.
    fn insert_if_new(&mut self, id: MessageId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }
}

/// Drives one agent's receive/dispatch/idle loop against a [`Transport`].
pub struct AgentRuntime {
    agent_id: AgentId,
    transport: Arc<Transport>,
    handlers: HandlerTable,
    hooks: Box<dyn AgentLifecycleHooks>,
    config: RuntimeConfig,
}

impl AgentRuntime {
    /// Builds a runtime for `agent_id`. The caller is responsible for
    /// having registered `agent_id` with the transport's broker beforehand
    /// if broker delivery is desired (see [`Transport::register`]).
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        transport: Arc<Transport>,
        handlers: HandlerTable,
        hooks: Box<dyn AgentLifecycleHooks>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            agent_id,
            transport,
            handlers,
            hooks,
            config,
        }
    }

    /// Runs the event loop to completion: `initialize`, then receive/dispatch
    /// until `shutdown` resolves, then `cleanup`. `cleanup` always runs,
    /// even if `initialize` or the loop body returned an error.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Transport`] if the transport fails in a way
    /// that is not recoverable by falling back (both paths failing);
    /// handler errors never propagate out of this function, they are
    /// reported to the sender and logged instead.
    #[instrument(skip(self, shutdown), fields(agent_id = %self.agent_id))]
    pub async fn run(&self, mut shutdown: tokio::sync::oneshot::Receiver<()>) -> Result<(), RuntimeError> {
        self.hooks.initialize().await.map_err(|e| RuntimeError::Handler {
            message_id: MessageId::generate(),
            source: e,
        })?;

        let result = self.event_loop(&mut shutdown).await;

        if let Err(e) = self.hooks.cleanup().await {
            warn!(error = %e, "cleanup hook returned an error");
        }

        result
    }

    async fn event_loop(
        &self,
        shutdown: &mut tokio::sync::oneshot::Receiver<()>,
    ) -> Result<(), RuntimeError> {
        let mut channel = self.transport.register(self.agent_id);
        let mut dedup = DedupSet::new(self.config.dedup_capacity.as_usize());
        let mut idle_count: u32 = 0;
        let timeout = self.config.receive_timeout.as_duration();

        loop {
            if shutdown.try_recv().is_ok() {
                info!("shutdown signal received, exiting event loop");
                break;
            }

            match self
                .transport
                .receive(&mut channel, self.agent_id, timeout)
                .await?
            {
                Some(message) => {
                    idle_count = 0;
                    if dedup.insert_if_new(message.id) {
                        self.dispatch(message).await;
                    } else {
                        warn!(message_id = %message.id, "dropping duplicate message delivery");
                    }
                }
                None => {
                    idle_count += 1;
                    if idle_count >= self.config.idle_threshold.as_u32() {
                        idle_count = 0;
                        if let Err(e) = self.hooks.on_idle().await {
                            warn!(error = %e, "on_idle hook returned an error");
                        }
                    }
                }
            }
        }

        self.transport.deregister(self.agent_id);
        Ok(())
    }

    async fn dispatch(&self, message: Message) {
        let ctx = HandlerContext {
            agent_id: self.agent_id,
            transport: Arc::clone(&self.transport),
        };
        let handler = self.handlers.resolve(message.intent);
        let is_broadcast = message.is_broadcast();

        match handler.handle(&message, &ctx).await {
            Ok(()) => {
                if !is_broadcast && !matches!(message.intent, Intent::Ack | Intent::Error) {
                    let ack = message.ack();
                    if let Err(e) = self.transport.send(ack).await {
                        warn!(error = %e, "failed to send ack");
                    }
                }
            }
            Err(e) => {
                warn!(message_id = %message.id, error = %e, "handler failed");
                if !is_broadcast {
                    let error_reply = message.error_reply(e.to_string());
                    if let Err(send_err) = self.transport.send(error_reply).await {
                        warn!(error = %send_err, "failed to send error reply");
                    }
                }
            }
        }
    }

    /// Sends a `ReportStatus` broadcast about `task_id`, mirroring the
    /// original system's `broadcast_status` helper.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError::Transport`] if the send fails outright.
    pub async fn broadcast_status(
        &self,
        task_id: TaskId,
        state: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) -> Result<(), RuntimeError> {
        let mut extra = std::collections::HashMap::new();
        if let Some(detail) = detail {
            extra.insert("detail".to_string(), detail);
        }
        let message = Message::new(
            Intent::ReportStatus,
            self.agent_id,
            AgentId::broadcast(),
            PayloadKind::TaskStatus {
                task_id,
                state: state.into(),
                extra,
            },
        );
        self.transport.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_reject_duplicate_message_ids() {
        let mut dedup = DedupSet::new(10);
        let id = MessageId::generate();
        assert!(dedup.insert_if_new(id));
        assert!(!dedup.insert_if_new(id));
    }

    #[test]
    fn test_should_evict_oldest_entry_once_capacity_exceeded() {
        let mut dedup = DedupSet::new(2);
        let a = MessageId::generate();
        let b = MessageId::generate();
        let c = MessageId::generate();

        assert!(dedup.insert_if_new(a));
        assert!(dedup.insert_if_new(b));
        assert!(dedup.insert_if_new(c)); // evicts `a`

        // `b` is still within the window.
        assert!(!dedup.insert_if_new(b));
        // `a` was evicted, so it is treated as new again.
        assert!(dedup.insert_if_new(a));
    }
}
