//! Error types for identifier reconciliation.

use thiserror::Error;

/// Errors raised while mapping server identifiers back onto a batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    /// The store returned a different number of identifiers than
    /// representatives were submitted.
    #[error("expected {expected} server identifiers, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The position map does not describe a batch of the given length.
    #[error("position map covers {actual} positions, batch has {expected}")]
    PositionCountMismatch { expected: usize, actual: usize },
}
