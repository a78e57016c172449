//! Agor: a multi-agent coordination core.
//!
//! Agor provides the messaging, task-lifecycle, and service-access layer
//! shared by a small fleet of cooperating agents (an architect, one or
//! more builders, a validator) and the orchestrator that routes work
//! between them. It is deliberately agent-implementation-agnostic: this
//! crate never decides *what* an agent does with a task, only how tasks,
//! messages, and agent liveness are tracked and delivered.
//!
//! ## Components
//!
//! - [`domain_types`] — validated identifiers and configuration primitives
//!   used throughout the crate in place of bare `Uuid`/`String`/`usize`.
//! - [`message`] — the `Intent`/`PayloadKind` speech-act protocol exchanged
//!   between agents.
//! - [`transport`] — message delivery: an in-memory broker with an
//!   append-only fallback log.
//! - [`registry`] — the durable task lifecycle store.
//! - [`runtime`] — the per-agent receive/dispatch/idle event loop.
//! - [`orchestrator`] — role-based task routing and pipeline advancement.
//! - [`bridge`] — a typed HTTP client for the three reference services.
//! - [`services`] — `axum`-based reference implementations of those
//!   services, for local development and testing.
//! - [`database`] — `SQLite` connection management shared by the registry.
//! - [`error`] — the crate's composed error taxonomy.

pub mod bridge;
pub mod database;
pub mod domain_types;
pub mod error;
pub mod message;
pub mod orchestrator;
pub mod registry;
pub mod runtime;
pub mod services;
pub mod transport;

pub use domain_types::{AgentId, AgentName, ConversationId, MessageId, Priority, TaskId};
pub use error::CoreError;
pub use message::{Artifact, Intent, Message, PayloadKind};
pub use orchestrator::Orchestrator;
pub use registry::{Task, TaskRegistry, TaskState, TaskType};
pub use runtime::AgentRuntime;
pub use transport::Transport;
