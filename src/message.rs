//! Speech-act message protocol for inter-agent communication.
//!
//! A `Message` is the unit of exchange carried by the transport layer
//! (`crate::transport`). Every message names an `Intent` (the speech act
//! being performed) and a `PayloadKind` (the tagged content of the act);
//! unrecognized payload fields survive a round trip in `extra`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain_types::{AgentId, ArtifactLabel, ArtifactUri, ConversationId, MessageId, TaskId};
use crate::error::TransportError;

/// Speech act a message performs.
///
/// This is the closed vocabulary described in the design notes: routing
/// dispatches on `Intent` alone, never on ad-hoc string fields in the
/// payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    /// Asks the recipient to perform an action or answer a question.
    Request,
    /// Informs the recipient of a fact.
    Inform,
    /// Proposes a course of action for the recipient's consideration.
    Propose,
    /// Accepts a previously proposed course of action.
    AcceptProposal,
    /// Rejects a previously proposed course of action.
    RejectProposal,
    /// Reports the sender's current status.
    ReportStatus,
    /// Reports that a request or handler failed.
    Error,
    /// Acknowledges successful receipt of a non-broadcast message.
    Ack,
}

/// An opaque artifact reference attached to a message or task.
///
/// The core never opens or interprets the artifact; it only stores and
/// forwards the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// What kind of artifact this is (e.g. `"diff"`, `"report"`).
    pub label: ArtifactLabel,
    /// Where the artifact can be found.
    pub uri: ArtifactUri,
}

/// The tagged content carried by a message.
///
/// Closed for the variants the core interprets; `extra` carries whatever
/// additional fields a sender included so forward-compatible data is never
/// silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadKind {
    /// REQUEST: submit a new task for execution.
    SubmitTask {
        /// The role-specific task description. Opaque to the transport and
        /// runtime; interpreted by the orchestrator and assignee.
        description: serde_json::Value,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// REQUEST: ask for the current status of a task.
    GetStatus {
        /// The task being queried.
        task_id: TaskId,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// REQUEST: list tasks, optionally filtered by the recipient.
    ListTasks {
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// REQUEST: a liveness check; expects an `Ack` in reply.
    Ping {
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// REQUEST: asks an architect agent to produce a specification.
    CreateSpecification {
        /// The task this request originates from.
        task_id: TaskId,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// REQUEST: asks a builder agent to implement a specification.
    BuildFromSpec {
        /// The task this request originates from.
        task_id: TaskId,
        /// Artifacts produced by the specification step.
        artifacts: Vec<Artifact>,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// REQUEST: asks a validator agent to validate a build.
    ValidateBuild {
        /// The task this request originates from.
        task_id: TaskId,
        /// Artifacts produced by the build step.
        artifacts: Vec<Artifact>,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// INFORM: an agent registers itself as available for work.
    AgentOnline {
        /// The role the agent is advertising.
        role: String,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// INFORM: a specification task has completed.
    SpecificationReady {
        /// The task that produced the specification.
        task_id: TaskId,
        /// Artifacts describing the specification.
        artifacts: Vec<Artifact>,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// INFORM: a build task has completed.
    BuildComplete {
        /// The task that produced the build.
        task_id: TaskId,
        /// Artifacts describing the build.
        artifacts: Vec<Artifact>,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// INFORM: a validation task has completed.
    ValidationComplete {
        /// The task that was validated.
        task_id: TaskId,
        /// Whether validation passed.
        passed: bool,
        /// Artifacts describing the validation outcome.
        artifacts: Vec<Artifact>,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// INFORM: reply to `SubmitTask`, carrying the assigned task id.
    TaskSubmitted {
        /// The newly created task id.
        task_id: TaskId,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// INFORM: reply to `GetStatus`.
    TaskStatus {
        /// The task being reported on.
        task_id: TaskId,
        /// The task's current state, as a string (mirrors `TaskState`'s
        /// `Display` so this payload stays decoupled from the registry
        /// module).
        state: String,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// ERROR: a human-readable failure report.
    Error {
        /// What went wrong.
        message: String,
        /// Extra fields not interpreted by the core.
        #[serde(flatten)]
        extra: HashMap<String, serde_json::Value>,
    },
    /// ACK: a content-free acknowledgement.
    Ack {},
}

/// An immutable message exchanged between agents.
///
/// Messages are created once via [`Message::new`] and never mutated
/// afterward; replies are new `Message` values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for this message; used for transport-level dedup.
    pub id: MessageId,
    /// The speech act being performed.
    pub intent: Intent,
    /// Who sent the message.
    pub sender: AgentId,
    /// Who should receive the message. `AgentId::broadcast()` marks a
    /// broadcast message.
    pub recipient: AgentId,
    /// The message's tagged content.
    pub payload: PayloadKind,
    /// Optional correlation id spanning a multi-message exchange.
    pub conversation_id: Option<ConversationId>,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// How many times transport-level delivery has been retried.
    pub retry_count: u32,
}

impl Message {
    /// Builds a new message with a freshly generated id and the current
    /// timestamp.
    #[must_use]
    pub fn new(intent: Intent, sender: AgentId, recipient: AgentId, payload: PayloadKind) -> Self {
        Self {
            id: MessageId::generate(),
            intent,
            sender,
            recipient,
            payload,
            conversation_id: None,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }

    /// Attaches a conversation id, returning the modified message.
    #[must_use]
    pub fn with_conversation(mut self, conversation_id: ConversationId) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    /// Whether this message targets every agent rather than a single
    /// recipient.
    #[must_use]
    pub fn is_broadcast(&self) -> bool {
        self.recipient == AgentId::broadcast()
    }

    /// Builds the `Ack` reply to this message.
    #[must_use]
    pub fn ack(&self) -> Self {
        Message::new(Intent::Ack, self.recipient, self.sender, PayloadKind::Ack {})
            .with_conversation_opt(self.conversation_id)
    }

    /// Builds the `Error` reply to this message.
    #[must_use]
    pub fn error_reply(&self, message: impl Into<String>) -> Self {
        Message::new(
            Intent::Error,
            self.recipient,
            self.sender,
            PayloadKind::Error {
                message: message.into(),
                extra: HashMap::new(),
            },
        )
        .with_conversation_opt(self.conversation_id)
    }

    fn with_conversation_opt(mut self, conversation_id: Option<ConversationId>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    /// Validates structural invariants that must hold for any message
    /// accepted by the transport.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidMessage`] if the message is
    /// malformed (e.g. an `Ack` somehow targeting a broadcast recipient,
    /// which would have no single sender to acknowledge to).
    pub fn validate(&self) -> Result<(), TransportError> {
        if matches!(self.intent, Intent::Ack) && self.is_broadcast() {
            return Err(TransportError::InvalidMessage(
                "ACK may not target a broadcast recipient".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_round_trip_message_through_json() {
        let sender = AgentId::generate();
        let recipient = AgentId::generate();
        let message = Message::new(
            Intent::Request,
            sender,
            recipient,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );

        let json = serde_json::to_string(&message).expect("serializes");
        let round_tripped: Message = serde_json::from_str(&json).expect("deserializes");

        assert_eq!(round_tripped.id, message.id);
        assert_eq!(round_tripped.sender, sender);
        assert_eq!(round_tripped.recipient, recipient);
    }

    #[test]
    fn test_should_preserve_unknown_payload_fields_in_extra() {
        let json = serde_json::json!({
            "id": MessageId::generate(),
            "intent": "REQUEST",
            "sender": AgentId::generate(),
            "recipient": AgentId::generate(),
            "payload": {"type": "ping", "future_field": "kept"},
            "conversation_id": null,
            "timestamp": Utc::now(),
            "retry_count": 0,
        });

        let message: Message = serde_json::from_value(json).expect("deserializes");
        match message.payload {
            PayloadKind::Ping { extra } => {
                assert_eq!(
                    extra.get("future_field").and_then(|v| v.as_str()),
                    Some("kept")
                );
            }
            other => panic!("expected Ping payload, got {other:?}"),
        }
    }

    #[test]
    fn test_should_reject_ack_targeting_broadcast() {
        let message = Message::new(
            Intent::Ack,
            AgentId::generate(),
            AgentId::broadcast(),
            PayloadKind::Ack {},
        );
        assert!(message.validate().is_err());
    }

    #[test]
    fn test_should_build_ack_reply_swapping_sender_and_recipient() {
        let sender = AgentId::generate();
        let recipient = AgentId::generate();
        let request = Message::new(
            Intent::Request,
            sender,
            recipient,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );

        let ack = request.ack();
        assert_eq!(ack.sender, recipient);
        assert_eq!(ack.recipient, sender);
        assert!(matches!(ack.intent, Intent::Ack));
    }
}
