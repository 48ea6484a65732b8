use std::io;
use thiserror::Error;

/// Error types for animation and skeleton decoding
#[derive(Error, Debug)]
pub enum AnimError {
    /// I/O Error while reading a segment container
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A required key is missing from the structured resource data
    #[error("Missing key: '{0}'")]
    MissingKey(String),

    /// A key exists but holds a value of the wrong shape
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Segment or frame block data points outside the compressed buffer
    #[error(
        "Segment {segment} out of bounds: needs {needed} bytes at offset {offset}, container holds {len}"
    )]
    SegmentOutOfBounds {
        segment: usize,
        offset: usize,
        needed: usize,
        len: usize,
    },

    /// Reference error: an index into another table is out of range
    #[error("Reference error: {0}")]
    ReferenceError(String),

    /// The bone hierarchy is not a tree
    #[error("Invalid skeleton: {0}")]
    InvalidSkeleton(String),
}

/// Result type using AnimError
pub type Result<T> = std::result::Result<T, AnimError>;
