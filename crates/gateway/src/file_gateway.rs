//! FileGateway - sessions and outboxes stored per destination directory
//!
//! Layout under `root`:
//!
//! ```text
//! <root>/<destination>/session.json   {"recipients": ["alice", "bob"]}
//! <root>/<destination>/outbox.jsonl   one OutboxEntry per delivered payload
//! ```

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use contracts::{ContractError, DestinationId, SenderGateway};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Session state file name
pub const SESSION_FILE: &str = "session.json";

/// Delivered payload log file name
pub const OUTBOX_FILE: &str = "outbox.jsonl";

/// Persisted session of one destination
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Active recipients of the destination
    #[serde(default)]
    pub recipients: Vec<String>,
}

/// One delivered payload as written to the outbox
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub destination: DestinationId,
    pub payload: String,
    pub recipients: usize,
}

/// Sender handle resolved from a session file
#[derive(Debug, Clone)]
pub struct FileSender {
    destination: DestinationId,
    dir: PathBuf,
    session: Session,
}

impl FileSender {
    /// Destination this sender transmits to
    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }

    /// Resolved session
    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// Gateway backed by a directory of per-destination session state
#[derive(Debug, Clone)]
pub struct FileGateway {
    root: PathBuf,
}

impl FileGateway {
    /// Create a gateway rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create or replace the session of a destination
    pub async fn register(
        &self,
        destination: &DestinationId,
        session: &Session,
    ) -> Result<(), ContractError> {
        let dir = self.root.join(destination.as_str());
        fs::create_dir_all(&dir).await?;
        let content = serde_json::to_vec_pretty(session)
            .map_err(|e| ContractError::session_lookup(destination.as_str(), e.to_string()))?;
        fs::write(dir.join(SESSION_FILE), content).await?;
        Ok(())
    }

    /// Read back the outbox of a destination
    pub async fn read_outbox(
        &self,
        destination: &DestinationId,
    ) -> Result<Vec<OutboxEntry>, ContractError> {
        let path = self.root.join(destination.as_str()).join(OUTBOX_FILE);
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line)
                    .map_err(|e| ContractError::Other(format!("corrupt outbox line: {e}")))
            })
            .collect()
    }

    /// Ids that would escape the root are never resolvable
    fn is_addressable(destination: &DestinationId) -> bool {
        let id = destination.as_str();
        !id.is_empty() && id != "." && id != ".." && !id.contains(['/', '\\'])
    }
}

impl SenderGateway for FileGateway {
    type Sender = FileSender;

    #[instrument(name = "file_gateway_resolve", skip(self), fields(destination = %destination))]
    async fn resolve(
        &self,
        destination: &DestinationId,
    ) -> Result<Option<FileSender>, ContractError> {
        if !Self::is_addressable(destination) {
            return Ok(None);
        }

        let dir = self.root.join(destination.as_str());
        let content = match fs::read(dir.join(SESSION_FILE)).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(destination = %destination, "No session file");
                return Ok(None);
            }
            Err(e) => {
                return Err(ContractError::session_lookup(
                    destination.as_str(),
                    e.to_string(),
                ))
            }
        };

        let session: Session = serde_json::from_slice(&content).map_err(|e| {
            ContractError::session_lookup(destination.as_str(), format!("malformed session: {e}"))
        })?;

        Ok(Some(FileSender {
            destination: destination.clone(),
            dir,
            session,
        }))
    }

    async fn has_recipients(&self, sender: &FileSender) -> Result<bool, ContractError> {
        Ok(!sender.session.recipients.is_empty())
    }

    #[instrument(
        name = "file_gateway_deliver",
        skip(self, sender, payload),
        fields(destination = %sender.destination)
    )]
    async fn deliver(&self, sender: &FileSender, payload: &str) -> Result<(), ContractError> {
        let entry = OutboxEntry {
            destination: sender.destination.clone(),
            payload: payload.to_string(),
            recipients: sender.session.recipients.len(),
        };
        let mut line = serde_json::to_vec(&entry)
            .map_err(|e| ContractError::delivery(sender.destination.as_str(), e.to_string()))?;
        line.push(b'\n');

        let append = async {
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(sender.dir.join(OUTBOX_FILE))
                .await?;
            file.write_all(&line).await?;
            file.flush().await
        };

        append
            .await
            .map_err(|e| ContractError::delivery(sender.destination.as_str(), e.to_string()))
    }
}
