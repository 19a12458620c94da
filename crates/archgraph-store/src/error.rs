//! Store error types

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Some records of an insert were already present. Every other record
    /// of the batch has been written.
    #[error("{collection}: {} record(s) already exist", .ids.len())]
    AlreadyExists { collection: String, ids: Vec<String> },

    #[error("cache key not found: {0}")]
    MissingKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StoreError::AlreadyExists { .. })
    }
}
