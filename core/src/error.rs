use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unrecognized file '{file_name}': no filename or header rule matched")]
    UnrecognizedFile { file_name: String },

    #[error("Ambiguous file '{file_name}': headers match {candidates:?}")]
    AmbiguousFile {
        file_name:  String,
        candidates: Vec<String>,
    },

    #[error("File '{file_name}' has a header but no data rows")]
    EmptyFile { file_name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type IngestResult<T> = Result<T, IngestError>;
