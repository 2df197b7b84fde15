//! Error types for the clinpdf library.

use std::io;
use thiserror::Error;

/// Result type alias for clinpdf operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during extraction.
///
/// "No tables found" is never an error: backends report it by returning an
/// empty candidate list, and the orchestrator treats emptiness as the signal
/// to fall back to the next backend.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error parsing PDF structure.
    #[error("PDF parsing error: {0}")]
    PdfParse(String),

    /// The PDF document is encrypted and cannot be opened.
    #[error("Document is encrypted")]
    Encrypted,

    /// Page index is out of range.
    #[error("Page {0} is out of range (document has {1} pages)")]
    PageOutOfRange(usize, usize),

    /// A backend is registered but cannot run (missing credentials or a
    /// missing collaborator such as the rasterizer).
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A network-backed backend timed out after exhausting its retries.
    #[error("Backend timeout: {0}")]
    BackendTimeout(String),

    /// A network-backed backend was rate limited past its retry ceiling.
    #[error("Backend rate limited: {0}")]
    BackendRateLimited(String),

    /// Authentication with a network-backed backend failed. Not retried.
    #[error("Backend authentication failed: {0}")]
    BackendAuthFailed(String),

    /// The caller requested a backend name that is not registered.
    #[error("Unknown extraction method: {0}")]
    UnknownMethod(String),

    /// The page rasterizer collaborator reported a failure.
    #[error("Rasterization error: {0}")]
    Raster(String),

    /// Transport-level error talking to a vision endpoint.
    #[error("Vision request error: {0}")]
    VisionRequest(String),

    /// A collaborator backend reported a failure.
    #[error("{0}")]
    Backend(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        match err {
            lopdf::Error::IO(e) => Error::Io(e),
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::PdfParse(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Encrypted;
        assert_eq!(err.to_string(), "Document is encrypted");

        let err = Error::PageOutOfRange(10, 5);
        assert_eq!(
            err.to_string(),
            "Page 10 is out of range (document has 5 pages)"
        );

        let err = Error::UnknownMethod("ocr".to_string());
        assert_eq!(err.to_string(), "Unknown extraction method: ocr");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
