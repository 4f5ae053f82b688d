//! Error types for page-configuration resolution

use thiserror::Error;

/// Result type alias for resolution operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving a page configuration
#[derive(Error, Debug)]
pub enum Error {
    /// The document finished parsing and none of the extraction strategies
    /// produced a configuration. This is the only terminal failure of the
    /// resolution protocol; malformed embedded metadata is treated as a
    /// non-match, not an error.
    #[error("no page configuration could be discovered in the document")]
    ConfigNotFound,

    /// Failed to read the document source (CLI input)
    #[error("failed to read document source: {0}")]
    Io(#[from] std::io::Error),
}
