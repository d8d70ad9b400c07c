use thiserror::Error;

/// Errors that can occur while opening, reading or writing tables
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Cannot access {path}: {reason}")]
    Access { path: String, reason: String },

    #[error("Cannot parse {path}: {reason}")]
    Format { path: String, reason: String },

    #[error("{message}, cause: {cause}")]
    IoWithCause { message: String, cause: String },

    #[error("Sheet not found: {name}")]
    SheetNotFound { name: String },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Writer for sheet '{sheet}' is no longer attached to its document")]
    WriterDetached { sheet: String },

    #[error("Document already closed: {path}")]
    DocumentClosed { path: String },

    #[error("Invalid row group: first row {first} is after last row {last}")]
    InvalidGroup { first: u32, last: u32 },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TableError {
    pub(crate) fn io_with_cause(message: impl Into<String>, cause: impl ToString) -> Self {
        TableError::IoWithCause {
            message: message.into(),
            cause: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, TableError>;
