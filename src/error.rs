//! Error types for tessera.
//!
//! This module defines all error types used throughout the library.
//!
//! Only a few of these ever reach an end user. Simplification and merging
//! absorb recoverable conditions (aggressive reduction requests, a missing
//! external service, rejected merge candidates) into a degraded but valid
//! result; what surfaces are load/parse failures and invalid caller input.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`MeshError`].
pub type Result<T> = std::result::Result<T, MeshError>;

/// Errors that can occur during mesh operations.
#[derive(Error, Debug)]
pub enum MeshError {
    /// The mesh has no vertices or no (non-degenerate) triangles.
    #[error("mesh has no usable geometry")]
    EmptyGeometry,

    /// A triangle references an invalid vertex index.
    #[error("triangle {triangle} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The triangle index (or the caller-supplied slot for edge queries).
        triangle: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A flat buffer does not hold whole triplets.
    #[error("{name} buffer length {len} is not a multiple of 3")]
    InvalidBufferLength {
        /// Which buffer was malformed.
        name: &'static str,
        /// The offending length.
        len: usize,
    },

    /// A reduction target outside `[0, 1)`.
    ///
    /// The simplifier never returns this; it clamps and logs instead.
    #[error("reduction target {requested} is outside [0, 1)")]
    InvalidReductionTarget {
        /// The requested fraction.
        requested: f64,
    },

    /// Two faces cannot be merged into a valid polygon.
    #[error("merge candidate rejected: {reason}")]
    DegenerateMergeCandidate {
        /// Why the merged polygon was rejected.
        reason: &'static str,
    },

    /// The external simplification peer could not be used.
    #[error("external simplification service unavailable: {0}")]
    ExternalServiceUnavailable(String),

    /// The external simplification peer returned malformed statistics.
    #[error("invalid service response field {field}: {value:?}")]
    InvalidServiceResponse {
        /// The header or field name.
        field: &'static str,
        /// The raw value received.
        value: String,
    },

    /// A long-running operation was cancelled through its progress handle.
    #[error("operation cancelled after {completed} steps")]
    Cancelled {
        /// Number of steps completed before cancellation.
        completed: usize,
    },

    /// A procedural solid generator failed.
    #[error("solid generator {name} failed: {message}")]
    GeneratorFailed {
        /// Catalogue name of the solid.
        name: String,
        /// Error message.
        message: String,
    },

    /// Invalid mesh state for the requested operation.
    #[error("invalid mesh state: {0}")]
    InvalidState(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },
}

impl MeshError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        MeshError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Create a rejected merge candidate error.
    pub(crate) fn degenerate(reason: &'static str) -> Self {
        MeshError::DegenerateMergeCandidate { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MeshError::EmptyGeometry;
        assert_eq!(err.to_string(), "mesh has no usable geometry");

        let err = MeshError::InvalidVertexIndex { triangle: 2, vertex: 9 };
        assert_eq!(err.to_string(), "triangle 2 references invalid vertex index 9");

        let err = MeshError::InvalidReductionTarget { requested: 1.5 };
        assert!(err.to_string().contains("1.5"));
    }

    #[test]
    fn test_invalid_param() {
        let err = MeshError::invalid_param("distance", -1.0, "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid parameter: distance = -1 (must be positive)"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MeshError = io.into();
        assert!(matches!(err, MeshError::Io(_)));
    }
}
