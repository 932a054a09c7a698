use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Processing state of an uploaded document.
///
/// Transitions are monotonic: `Processing` moves to exactly one of
/// `Completed` or `Failed` and never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }

    /// Terminal states cannot be left again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, DocumentStatus::Completed | DocumentStatus::Failed)
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processing" => Ok(DocumentStatus::Processing),
            "completed" => Ok(DocumentStatus::Completed),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(format!("unknown document status: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One uploaded source file and its processing state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub status: DocumentStatus,
    /// Set once a durable raw copy exists; stays empty otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_location: Option<String>,
    pub size_bytes: i64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a `Document` row at upload acceptance.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: String,
    pub title: String,
    pub size_bytes: i64,
    pub content_type: String,
}

/// One contiguous, trimmed slice of a document's extracted text, as
/// persisted in the relational store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub document_id: Uuid,
    /// Zero-based, gapless per document.
    pub chunk_index: i32,
    pub content: String,
    /// Informational chars/4 estimate.
    pub token_count: i32,
}

impl StoredChunk {
    pub fn new(document_id: Uuid, chunk_index: i32, content: String) -> Self {
        let token_count = (content.len() / 4) as i32;
        Self {
            document_id,
            chunk_index,
            content,
            token_count,
        }
    }
}

/// A ranked chunk returned by the retrieval service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub text: String,
    pub document_id: Uuid,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            DocumentStatus::Processing,
            DocumentStatus::Completed,
            DocumentStatus::Failed,
        ] {
            let parsed: DocumentStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("pending".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DocumentStatus::Processing.is_terminal());
        assert!(DocumentStatus::Completed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_stored_chunk_token_estimate() {
        let chunk = StoredChunk::new(Uuid::new_v4(), 0, "abcdefgh".to_string());
        assert_eq!(chunk.token_count, 2);
    }
}
