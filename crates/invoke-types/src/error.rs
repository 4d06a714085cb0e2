//! Type system errors

use thiserror::Error;

/// Errors raised while building or editing method types
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// The parameter list needs more argument slots than the runtime allows
    #[error("Arity overflow: {slots} argument slots exceed the limit of {max}")]
    ArityOverflow {
        /// Slots the descriptor would need
        slots: usize,
        /// Ceiling that was exceeded
        max: usize,
    },

    /// `void` used as a parameter type
    #[error("Parameter {index} cannot have type void")]
    VoidParameter {
        /// Offending parameter position
        index: usize,
    },

    /// Parameter index past the end of the parameter list
    #[error("Parameter index {index} out of range for {len} parameters")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of parameters
        len: usize,
    },

    /// Parameter range is reversed or runs past the end
    #[error("Invalid parameter range {start}..{end} for {len} parameters")]
    InvalidRange {
        /// Range start
        start: usize,
        /// Range end (exclusive)
        end: usize,
        /// Number of parameters
        len: usize,
    },

    /// A class that was expected to be an array type is not one
    #[error("Not an array class: {class}")]
    NotAnArray {
        /// Class name
        class: String,
    },
}
