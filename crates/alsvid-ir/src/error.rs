//! Error types for the IR crate.

use crate::graph::OpId;
use thiserror::Error;

/// Errors that can occur when mutating the operation graph.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// An operation id referred to an erased or unknown operation.
    #[error("Operation {0:?} is erased or unknown")]
    InvalidOp(OpId),

    /// An insertion point referred to an operation that is no longer in
    /// a block.
    #[error("Insertion point {0:?} is not attached to a block")]
    InvalidInsertPoint(OpId),

    /// Replacement value count does not match the result count of the
    /// replaced operation.
    #[error("Replacing {expected} results with {got} values")]
    ResultCountMismatch {
        /// Number of results on the replaced operation.
        expected: usize,
        /// Number of replacement values supplied.
        got: usize,
    },
}

/// Result type for IR operations.
pub type IrResult<T> = Result<T, IrError>;
