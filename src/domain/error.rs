use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed post snapshot: {0}")]
    Malformed(#[from] serde_json::Error),
}
