//! Error types for the lane dispatch core.
//!
//! Every failure surfaced by the relay engine or a lane operation is a
//! [`LaneError`]. The engine routes errors by *classification*, not by point
//! of origin: recoverable errors are attributed to the view whose step raised
//! them, fatal errors go to the lane model's top-level failure hook.

use thiserror::Error;

/// Errors raised by lane operations and observer callbacks.
#[derive(Debug, Clone, Error)]
pub enum LaneError {
    /// An observer callback rejected or failed the operation.
    #[error("observer failure: {message}")]
    Observer { message: String },

    /// A value could not be molded or cast through the lane's form.
    #[error("codec mismatch: {message}")]
    Codec { message: String },

    /// A caller-supplied index fell outside the sequence bounds.
    #[error("index {index} out of bounds (len {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    /// The view is not (or no longer) bound to a lane model.
    #[error("lane view is not bound to a lane model")]
    Unbound,

    /// The lane ran out of a required resource.
    #[error("lane resources exhausted: {message}")]
    ResourceExhausted { message: String },

    /// The relay engine detected a broken internal invariant.
    #[error("relay invariant violated: {message}")]
    Invariant { message: String },
}

impl LaneError {
    /// Shorthand for an observer-attributed failure.
    pub fn observer(message: impl Into<String>) -> Self {
        LaneError::Observer {
            message: message.into(),
        }
    }

    /// Shorthand for a form codec failure.
    pub fn codec(message: impl Into<String>) -> Self {
        LaneError::Codec {
            message: message.into(),
        }
    }

    /// Shorthand for a resource exhaustion failure.
    pub fn resource_exhausted(message: impl Into<String>) -> Self {
        LaneError::ResourceExhausted {
            message: message.into(),
        }
    }

    /// Shorthand for an engine invariant violation.
    pub fn invariant(message: impl Into<String>) -> Self {
        LaneError::Invariant {
            message: message.into(),
        }
    }

    /// Whether this error is fatal to the lane.
    ///
    /// Fatal errors are never attributed to an individual view; the relay
    /// engine reports them to the lane model's failure hook instead.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            LaneError::ResourceExhausted { .. } | LaneError::Invariant { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(!LaneError::observer("bad callback").is_fatal());
        assert!(!LaneError::codec("wrong shape").is_fatal());
        assert!(!LaneError::IndexOutOfBounds { index: 3, len: 1 }.is_fatal());
        assert!(!LaneError::Unbound.is_fatal());
        assert!(LaneError::resource_exhausted("no stage threads").is_fatal());
        assert!(LaneError::invariant("phase cursor went backwards").is_fatal());
    }

    #[test]
    fn test_display() {
        let err = LaneError::IndexOutOfBounds { index: 5, len: 2 };
        assert_eq!(err.to_string(), "index 5 out of bounds (len 2)");
    }
}
