//! Source traits describing where snapshots and raw post bodies come from.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::error::SnapshotError;
use crate::domain::posts::PostRecord;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read `{location}`: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request to `{location}` failed: {message}")]
    Http { location: String, message: String },
    #[error("`{location}` responded with status {status}")]
    Status { location: String, status: u16 },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl SourceError {
    pub fn io(location: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            location: location.into(),
            source,
        }
    }

    pub fn http(location: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Http {
            location: location.into(),
            message: err.to_string(),
        }
    }
}

/// Supplies the full post snapshot.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn load_snapshot(&self) -> Result<Vec<PostRecord>, SourceError>;

    /// Human-readable location used in logs.
    fn describe(&self) -> String;
}

/// Supplies the raw markdown body of a post by slug.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn fetch_content(&self, slug: &str) -> Result<String, SourceError>;
}
