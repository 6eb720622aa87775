use super::*;

pub type Result<T> = std::result::Result<T, IoError>;

/// Every failure of a read or write. None of them is retried.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("no stream to read or write")]
    NoStream,

    #[error("no bioassay to write")]
    NoTable,

    /// A field the operation needs is absent from the stream
    #[error("missing field `{0}`")]
    NoField(String),

    #[error("invalid field type for `{0}`, location fields must be integers")]
    InvalidFieldType(String),

    /// The header of the stream does not follow the format
    #[error("invalid header: {0}")]
    Header(String),

    #[error("unknown format `{0}`")]
    UnknownFormat(String),

    #[error("error while setting data in bioassay: {0}")]
    Table(#[from] BioAssayError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
