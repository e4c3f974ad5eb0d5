use std::path::PathBuf;

use thiserror::Error;

/// Error raised by the decoding collaborator when it cannot open a file.
pub type DecoderError = Box<dyn std::error::Error + Send + Sync>;

/// Construction-time failures of a sampling reader.
///
/// Each variant is fatal to the construction attempt only. End of stream is
/// not an error and never appears here.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("unsupported file extension: {extension:?} ({path})")]
    UnsupportedFormat { path: PathBuf, extension: String },
    #[error("error opening video file {path}: {source}")]
    OpenFailure {
        path: PathBuf,
        #[source]
        source: DecoderError,
    },
}

impl ReaderError {
    /// Whether a batch caller may skip this input and continue with the next.
    ///
    /// Configuration errors apply to every input, so they are not skippable.
    pub fn is_input_specific(&self) -> bool {
        !matches!(self, ReaderError::InvalidConfiguration(_))
    }
}
