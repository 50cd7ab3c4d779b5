use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrellisError>;

#[derive(Debug, Error)]
pub enum TrellisError {
    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Title must not be blank")]
    BlankTitle,

    #[error("Column {0} is protected and cannot be deleted")]
    ProtectedColumn(String),

    #[error("Cannot delete root node")]
    RootNodeProtected,

    #[error("Cannot move node {source_id} under its own subtree ({target_id})")]
    CycleDetected { source_id: String, target_id: String },

    #[error("Node {0} is at the terminal level and cannot have children")]
    TerminalLevel(String),

    #[error("Index {index} is out of range for {container}")]
    IndexOutOfRange { container: String, index: usize },

    #[error("Duplicate identity: {0}")]
    DuplicateId(String),

    #[error("Failed to load children of {node_id}: {reason}")]
    FetchFailed { node_id: String, reason: String },

    #[error("Loading children of {0} timed out")]
    FetchTimeout(String),

    #[error("Invalid import: {0}")]
    InvalidImport(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}
