//! Error taxonomy for the coordination core.
//!
//! Each component owns a `thiserror`-derived error enum; [`CoreError`]
//! composes them for binaries that need a single error type to propagate
//! out of `main`.

use thiserror::Error;

use crate::domain_types::{AgentId, TaskId};

/// Errors from the message transport (broker path and fallback log path).
#[derive(Error, Debug)]
pub enum TransportError {
    /// A message failed validation before it could be handed to a transport.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Both the broker path and the fallback log path failed to deliver.
    #[error("transport unavailable: broker failed ({broker}), fallback failed ({fallback})")]
    Unavailable {
        /// Error observed on the broker path.
        broker: String,
        /// Error observed on the fallback log path.
        fallback: String,
    },

    /// The fallback log's cursor file could not be read or written.
    #[error("cursor I/O error for agent {agent_id}: {source}")]
    Cursor {
        /// The agent whose cursor failed.
        agent_id: AgentId,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line in the fallback log could not be parsed; the caller should
    /// log it and advance past it rather than treat it as fatal.
    #[error("malformed log line at offset {offset}: {reason}")]
    MalformedLogLine {
        /// Byte offset of the malformed line.
        offset: u64,
        /// Why it failed to parse.
        reason: String,
    },

    /// Generic I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from an agent runtime's event loop.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// No handler is registered for the intent and no default handler
    /// applies.
    #[error("no handler registered for intent {0:?}")]
    NoHandler(crate::message::Intent),

    /// A handler returned an error while processing a message.
    #[error("handler error for message {message_id}: {source}")]
    Handler {
        /// The message whose handler failed.
        message_id: crate::domain_types::MessageId,
        /// The underlying handler error.
        #[source]
        source: anyhow::Error,
    },

    /// The transport layer failed in a way the runtime cannot recover from.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors from the task registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The referenced task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The requested state transition is not valid from the task's current
    /// state.
    #[error("invalid transition for task {task_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        /// The task being transitioned.
        task_id: TaskId,
        /// The state it was in.
        from: crate::registry::domain::TaskState,
        /// The state the caller attempted to move it to.
        to: crate::registry::domain::TaskState,
    },

    /// `assign` was called on a task whose dependencies have not all
    /// completed.
    #[error("task {task_id} has unmet dependencies: {unmet:?}")]
    UnmetDependencies {
        /// The task whose dependencies are unmet.
        task_id: TaskId,
        /// The dependency ids that have not reached `Completed`.
        unmet: Vec<TaskId>,
    },

    /// A dependency cycle was detected while registering dependencies.
    #[error("dependency cycle detected involving task {0}")]
    DependencyCycle(TaskId),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Errors from the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// No agent of the requested role is registered.
    #[error("no agent available for role {0}")]
    NoAgentForRole(String),

    /// The referenced agent is not known to the orchestrator's registry.
    #[error("unknown agent: {0}")]
    UnknownAgent(AgentId),

    /// A registry operation failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A transport operation failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors from the service bridge HTTP client.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The call exhausted its retry budget.
    #[error("service call to {endpoint} failed after {attempts} attempts: {source}")]
    ExhaustedRetries {
        /// The endpoint that was called.
        endpoint: String,
        /// How many attempts were made, including the first.
        attempts: u8,
        /// The last observed error.
        #[source]
        source: reqwest::Error,
    },

    /// The remote service returned a non-success status with a decodable
    /// `{detail: string}` body.
    #[error("service {endpoint} returned {status}: {detail}")]
    ServiceError {
        /// The endpoint that was called.
        endpoint: String,
        /// HTTP status code returned.
        status: u16,
        /// The `detail` field from the error body.
        detail: String,
    },

    /// The response body could not be decoded as the expected type.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// The endpoint that was called.
        endpoint: String,
        /// The underlying decode error.
        #[source]
        source: reqwest::Error,
    },
}

/// Top-level error composing every component's error type, for use in
/// binaries where a single `Result<(), CoreError>` return from `main` is
/// convenient.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Transport-layer failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Agent runtime failure.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// Task registry failure.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Orchestrator failure.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// Service bridge failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Database initialization/connection failure.
    #[error(transparent)]
    Database(#[from] crate::database::DatabaseError),

    /// Generic I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
