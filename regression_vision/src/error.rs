// THEORY:
// Every way a comparison can go wrong is one variant of `DiffError`. The engine
// never returns a half-built result: a stage either hands its output to the next
// stage or the whole comparison stops with one of these.
//
// Errors are distinct from warnings. An automatic resize of the candidate is a
// `ComparisonWarning` carried on a successful result (see `pipeline`), never an
// error.

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, DiffError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiffError {
    /// The two buffers still disagree in shape after normalization.
    #[error("dimension mismatch: baseline is {}x{}, candidate is {}x{}", .baseline.0, .baseline.1, .candidate.0, .candidate.1)]
    Dimension {
        baseline: (u32, u32),
        candidate: (u32, u32),
    },

    /// Zero-size, wrongly sized, or undecodable input.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// Threshold configuration that cannot be classified against.
    #[error("degenerate configuration: {0}")]
    DegenerateConfig(String),

    #[error("encoding failed: {0}")]
    Encode(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The cooperative cancellation flag was raised between two stages.
    #[error("comparison cancelled")]
    Cancelled,

    #[error("worker pool error: {0}")]
    Worker(String),
}

impl From<image::ImageError> for DiffError {
    fn from(error: image::ImageError) -> Self {
        match error {
            image::ImageError::Decoding(_) | image::ImageError::Unsupported(_) => {
                DiffError::InvalidImage(error.to_string())
            }
            other => DiffError::Encode(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for DiffError {
    fn from(error: serde_json::Error) -> Self {
        DiffError::Serialization(error.to_string())
    }
}

impl From<base64::DecodeError> for DiffError {
    fn from(error: base64::DecodeError) -> Self {
        DiffError::InvalidImage(format!("bad base64 snapshot: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_error_names_both_sizes() {
        let err = DiffError::Dimension {
            baseline: (100, 50),
            candidate: (99, 50),
        };
        assert_eq!(
            err.to_string(),
            "dimension mismatch: baseline is 100x50, candidate is 99x50"
        );
    }

    #[test]
    fn bad_base64_maps_to_invalid_image() {
        use base64::Engine;
        let err: DiffError = base64::engine::general_purpose::STANDARD
            .decode("***")
            .unwrap_err()
            .into();
        assert!(matches!(err, DiffError::InvalidImage(_)));
    }
}
