//! Invoke Type System
//!
//! Value kinds, class identities, interned method types and the pairwise
//! conversion rules shared by every invocation target.

#![warn(missing_docs)]

pub mod class;
pub mod conversion;
pub mod descriptor;
pub mod error;
pub mod kind;

pub use class::{ClassBuilder, ClassRef};
pub use conversion::{can_convert, can_explicit_cast, classify_conversion, ConversionMode, ValueConversion};
pub use descriptor::{method_type, MethodType, MAX_SLOTS, MAX_TARGET_SLOTS};
pub use error::TypeError;
pub use kind::{BasicType, Kind};
