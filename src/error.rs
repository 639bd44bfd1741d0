//! Error types for page compilation and serialization.
//!
//! Geometry that falls outside the writable area is never an error: it is
//! clamped or skipped. Everything else that can go wrong surfaces here.

use crate::object::ObjectRef;
use crate::writer::ImageError;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while building or writing pages.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A caller-supplied argument is unusable (empty text, bad constant, mismatched lengths)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A single glyph is wider than the region it must be laid out in
    #[error("Text region too small: '{ch}' needs {needed:.2}pt but only {available:.2}pt is available")]
    TextRegionTooSmall {
        /// The character that could not be placed
        ch: char,
        /// Width the character needs, in points
        needed: f64,
        /// Width available on an empty line, in points
        available: f64,
    },

    /// An operation was called in the wrong serialization state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Numbering or writing failed; the whole document write must restart
    #[error("Serialization fault: {0}")]
    SerializationFault(String),

    /// Malformed page tree or page dictionary in a parsed source
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Circular reference detected in the page tree
    #[error("Circular reference detected: object {0}")]
    CircularReference(ObjectRef),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding or embedding error
    #[error("Image error: {0}")]
    Image(String),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),
}

impl From<ImageError> for Error {
    fn from(err: ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl Error {
    /// Whether this error aborts the current document write.
    ///
    /// Faults during numbering or writing leave the offset table torn, so the
    /// driver has to reset every page and start over.
    pub fn is_fatal_to_write(&self) -> bool {
        matches!(
            self,
            Error::SerializationFault(_) | Error::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_region_too_small_message() {
        let err = Error::TextRegionTooSmall {
            ch: 'W',
            needed: 9.44,
            available: 5.0,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("'W'"));
        assert!(msg.contains("9.44"));
        assert!(msg.contains("5.00"));
    }

    #[test]
    fn test_serialization_fault_is_fatal() {
        let err = Error::SerializationFault(format!("unresolved {}", ObjectRef::new(14, 0)));
        assert!(format!("{}", err).contains("14 0 R"));
        assert!(err.is_fatal_to_write());
    }

    #[test]
    fn test_argument_errors_are_not_fatal() {
        let err = Error::InvalidArgument("empty text".to_string());
        assert!(!err.is_fatal_to_write());
        assert!(format!("{}", err).contains("empty text"));
    }

    #[test]
    fn test_image_error_conversion() {
        let err: Error = ImageError::UnsupportedFormat.into();
        assert!(matches!(err, Error::Image(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
