//! Fallback transport path: an append-only JSON-lines log with per-agent
//! cursor files.
//!
//! Used when the broker path is unavailable. The log is a single
//! `messages.log` file under the shared directory; every agent tracks how
//! far it has read via a `cursors/{agent_id}.cursor` file holding
//! `{"position": N}`, the index of the next line to read, updated
//! atomically (write to a temp file, then rename) so a crash mid-write
//! never leaves a half-written cursor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain_types::AgentId;
use crate::error::TransportError;
use crate::message::Message;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// On-disk cursor shape: the index of the next log line this agent has
/// not yet read.
#[derive(Serialize, Deserialize)]
struct Cursor {
    position: u64,
}

/// Fallback transport backed by a shared append-only log file.
pub struct FallbackTransport {
    shared_dir: PathBuf,
}

impl FallbackTransport {
    /// Creates a fallback transport rooted at `shared_dir`, creating the
    /// directory (and its `cursors` subdirectory) if necessary.
    #[must_use]
    pub fn new(shared_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared_dir: shared_dir.into(),
        }
    }

    fn log_path(&self) -> PathBuf {
        self.shared_dir.join("messages.log")
    }

    fn cursor_path(&self, agent_id: AgentId) -> PathBuf {
        self.shared_dir.join("cursors").join(format!("{agent_id}.cursor"))
    }

    /// Appends a message as one UTF-8 JSON line.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Io`] or [`TransportError::Serialization`]
    /// if the directory cannot be created, the file cannot be opened, or
    /// encoding fails.
    pub async fn send(&self, message: &Message) -> Result<(), TransportError> {
        fs::create_dir_all(&self.shared_dir).await?;

        let mut line = serde_json::to_string(message)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_path())
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Reads forward from `agent_id`'s saved cursor, looking for the next
    /// message addressed to it (directly or via broadcast), polling the
    /// log until `timeout` elapses.
    ///
    /// Malformed lines are logged and skipped; the cursor advances past
    /// them regardless, per the no-silent-retry-on-garbage policy.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Cursor`] if the cursor file cannot be
    /// read or written, or [`TransportError::Io`] for other I/O failures.
    pub async fn receive(
        &self,
        agent_id: AgentId,
        timeout: Duration,
    ) -> Result<Option<Message>, TransportError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(message) = self.read_next(agent_id).await? {
                return Ok(Some(message));
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            tokio::time::sleep(POLL_INTERVAL.min(timeout)).await;
        }
    }

    async fn read_next(&self, agent_id: AgentId) -> Result<Option<Message>, TransportError> {
        let cursor = self.load_cursor(agent_id).await?;

        let Ok(file) = File::open(self.log_path()).await else {
            return Ok(None);
        };
        let mut reader = BufReader::new(file);

        // Skip every line already accounted for by the cursor. If the log
        // was truncated or rotated out from under the cursor, `read_line`
        // simply hits EOF early and the loop below starts fresh.
        let mut position = 0u64;
        while position < cursor {
            let mut skipped = String::new();
            if reader.read_line(&mut skipped).await? == 0 {
                break;
            }
            position += 1;
        }

        loop {
            let mut line = String::new();
            let bytes_read = reader.read_line(&mut line).await?;
            if bytes_read == 0 {
                break;
            }
            position += 1;

            let trimmed = line.trim_end();
            if trimmed.is_empty() {
                continue;
            }

            match serde_json::from_str::<Message>(trimmed) {
                Ok(message) => {
                    if message.recipient == agent_id || message.is_broadcast() {
                        self.save_cursor(agent_id, position).await?;
                        return Ok(Some(message));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        agent_id = %agent_id,
                        position,
                        error = %e,
                        "skipping malformed fallback log line"
                    );
                }
            }
        }

        self.save_cursor(agent_id, position).await?;
        Ok(None)
    }

    async fn load_cursor(&self, agent_id: AgentId) -> Result<u64, TransportError> {
        let path = self.cursor_path(agent_id);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(serde_json::from_str::<Cursor>(&contents)
                .map(|cursor| cursor.position)
                .unwrap_or(0)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(TransportError::Cursor { agent_id, source }),
        }
    }

    async fn save_cursor(&self, agent_id: AgentId, position: u64) -> Result<(), TransportError> {
        let path = self.cursor_path(agent_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp_path = tmp_path_for(&path);
        let contents = serde_json::to_string(&Cursor { position })?;
        fs::write(&tmp_path, contents).await?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|source| TransportError::Cursor { agent_id, source })
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Intent, PayloadKind};
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_should_deliver_message_written_before_receive() {
        let dir = tempdir().unwrap();
        let transport = FallbackTransport::new(dir.path());
        let agent = AgentId::generate();

        let message = Message::new(
            Intent::Request,
            AgentId::generate(),
            agent,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );
        transport.send(&message).await.unwrap();

        let received = transport
            .receive(agent, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(received.unwrap().id, message.id);
    }

    #[tokio::test]
    async fn test_should_not_redeliver_after_cursor_advances() {
        let dir = tempdir().unwrap();
        let transport = FallbackTransport::new(dir.path());
        let agent = AgentId::generate();

        let message = Message::new(
            Intent::Request,
            AgentId::generate(),
            agent,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );
        transport.send(&message).await.unwrap();
        transport
            .receive(agent, Duration::from_millis(200))
            .await
            .unwrap();

        let second = transport
            .receive(agent, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn test_should_skip_malformed_line_and_advance_cursor() {
        let dir = tempdir().unwrap();
        let transport = FallbackTransport::new(dir.path());
        let agent = AgentId::generate();

        fs::create_dir_all(dir.path()).await.unwrap();
        fs::write(dir.path().join("messages.log"), "not json\n")
            .await
            .unwrap();

        let message = Message::new(
            Intent::Request,
            AgentId::generate(),
            agent,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );
        transport.send(&message).await.unwrap();

        let received = transport
            .receive(agent, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(received.unwrap().id, message.id);
    }

    #[tokio::test]
    async fn test_should_persist_cursor_as_json_position_object() {
        let dir = tempdir().unwrap();
        let transport = FallbackTransport::new(dir.path());
        let agent = AgentId::generate();

        let message = Message::new(
            Intent::Request,
            AgentId::generate(),
            agent,
            PayloadKind::Ping {
                extra: HashMap::new(),
            },
        );
        transport.send(&message).await.unwrap();
        transport
            .receive(agent, Duration::from_millis(200))
            .await
            .unwrap();

        let cursor_path = dir.path().join("cursors").join(format!("{agent}.cursor"));
        let contents = fs::read_to_string(&cursor_path).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed, serde_json::json!({ "position": 1 }));
    }

    #[tokio::test]
    async fn test_should_timeout_when_no_matching_message_present() {
        let dir = tempdir().unwrap();
        let transport = FallbackTransport::new(dir.path());
        let agent = AgentId::generate();

        let received = transport
            .receive(agent, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(received.is_none());
    }
}
