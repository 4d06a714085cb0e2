//! Runtime errors
//!
//! Every failure the runtime reports is a [`HandleError`]. Values thrown by
//! user code travel as [`HandleError::Thrown`] so that `catch_exception`
//! adapters can intercept them while every other kind propagates unchanged.

use invoke_types::TypeError;

use crate::value::Value;

/// Errors raised by resolution, composition and invocation
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandleError {
    /// Resolution target does not exist
    #[error("No such member: {0}")]
    NoSuchMember(String),

    /// Resolution violates the access context's capabilities
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// `invoke_exact` called with a shape that differs from the target type
    #[error("Wrong type: expected {expected}, found {found}")]
    WrongType {
        /// Target type
        expected: String,
        /// Type supplied by the caller
        found: String,
    },

    /// `as_type` cannot bridge the two shapes
    #[error("Cannot adapt {from} to {to}")]
    Adaptation {
        /// Target type
        from: String,
        /// Requested type
        to: String,
    },

    /// A combinator received structurally invalid parameters
    #[error("Illegal adaptation: {0}")]
    IllegalAdaptation(String),

    /// A composition would exceed the argument slot ceiling
    #[error("Arity overflow: {slots} argument slots exceed the limit of {max}")]
    ArityOverflow {
        /// Slots the composed type would need
        slots: usize,
        /// Ceiling that was exceeded
        max: usize,
    },

    /// A value's runtime class cannot be cast or unboxed as required
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Required kind or class
        expected: String,
        /// Actual runtime kind or class
        found: String,
    },

    /// A null reference was unboxed, dereferenced or spread
    #[error("Null dereference: {0}")]
    NullDereference(String),

    /// An argument value is invalid for the operation
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// A value thrown by the callee
    #[error("Uncaught exception: {0}")]
    Thrown(Value),
}

/// Result type for runtime operations
pub type HandleResult<T> = Result<T, HandleError>;

impl From<TypeError> for HandleError {
    fn from(err: TypeError) -> Self {
        match err {
            TypeError::ArityOverflow { slots, max } => HandleError::ArityOverflow { slots, max },
            TypeError::NotAnArray { .. } => HandleError::IllegalArgument(err.to_string()),
            other => HandleError::IllegalAdaptation(other.to_string()),
        }
    }
}

impl HandleError {
    /// Thrown value, if this error carries one
    pub fn thrown(&self) -> Option<&Value> {
        match self {
            HandleError::Thrown(value) => Some(value),
            _ => None,
        }
    }
}
