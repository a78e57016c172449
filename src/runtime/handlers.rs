//! Handler registration for an agent's event loop.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain_types::AgentId;
use crate::message::{Intent, Message};
use crate::transport::Transport;

/// Context handed to every handler invocation: the agent's own id and its
/// transport handle, so handlers never need direct access to the runtime
/// that owns them.
pub struct HandlerContext {
    /// The id of the agent running this handler.
    pub agent_id: AgentId,
    /// Transport used to send replies or follow-up messages.
    pub transport: Arc<Transport>,
}

/// A handler for one [`Intent`].
///
/// Matches the original system's per-intent handler registration
/// (`register_handler`): a runtime is built with one `MessageHandler` per
/// intent it cares about, and unregistered intents fall through to the
/// runtime's default log-and-drop behavior.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Handles one message. Errors here never crash the event loop; the
    /// runtime reports them to the sender as an `Error` message.
    async fn handle(&self, message: &Message, ctx: &HandlerContext) -> anyhow::Result<()>;
}

/// Lifecycle hooks an agent's runtime invokes outside of message handling.
#[async_trait]
pub trait AgentLifecycleHooks: Send + Sync {
    /// Runs once before the event loop starts.
    async fn initialize(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs once after the event loop exits, success or failure.
    async fn cleanup(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs when the idle-cycle threshold is reached. Receives the task
    /// registry id, if any, the agent is currently polling about, purely
    /// as a convenience hook point; most implementations ignore it.
    async fn on_idle(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A no-op set of lifecycle hooks, for agents that only need message
/// handlers.
pub struct NoopLifecycleHooks;

#[async_trait]
impl AgentLifecycleHooks for NoopLifecycleHooks {}

/// Default handler applied to any intent without a registered
/// [`MessageHandler`]: logs at `info` and returns `Ok(())`, mirroring the
/// original system's base-class handler bodies before a role subclass
/// overrides them.
pub struct LogAndDropHandler;

#[async_trait]
impl MessageHandler for LogAndDropHandler {
    async fn handle(&self, message: &Message, ctx: &HandlerContext) -> anyhow::Result<()> {
        tracing::info!(
            agent_id = %ctx.agent_id,
            message_id = %message.id,
            intent = ?message.intent,
            "no handler registered for intent; logging and dropping"
        );
        Ok(())
    }
}

/// A resolved handler catalogue: one [`MessageHandler`] per [`Intent`],
/// falling back to [`LogAndDropHandler`] for anything unregistered.
pub struct HandlerTable {
    handlers: std::collections::HashMap<Intent, Box<dyn MessageHandler>>,
    default: LogAndDropHandler,
}

impl HandlerTable {
    /// Creates an empty table; every intent falls through to
    /// [`LogAndDropHandler`] until registered.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: std::collections::HashMap::new(),
            default: LogAndDropHandler,
        }
    }

    /// Registers `handler` for `intent`, replacing any previous handler.
    #[must_use]
    pub fn with_handler(mut self, intent: Intent, handler: Box<dyn MessageHandler>) -> Self {
        self.handlers.insert(intent, handler);
        self
    }

    /// Returns the handler for `intent`, or the default log-and-drop
    /// handler if none is registered.
    #[must_use]
    pub fn resolve(&self, intent: Intent) -> &dyn MessageHandler {
        self.handlers
            .get(&intent)
            .map_or(&self.default as &dyn MessageHandler, |h| h.as_ref())
    }
}

impl Default for HandlerTable {
    fn default() -> Self {
        Self::new()
    }
}
