//! Combinator library
//!
//! Pure functions from targets (plus parameters) to new targets. Inputs are
//! never modified. Each combinator validates its parameters up front, derives
//! the result type, checks the slot ceiling and then edits the input's form.

mod arguments;
mod arrays;
mod basic;
mod control;
mod filters;

pub use arguments::{
    bind_leading, drop_arguments, drop_arguments_to_match, explicit_cast_arguments, insert_arguments,
    permute_arguments,
};
pub use arrays::{array_constructor, array_element_getter, array_element_setter, array_length, as_collector, as_spreader};
pub use basic::{constant, drop_return, empty, exact_invoker, identity, invoker, zero};
pub use control::{catch_exception, guard_with_test, throw_exception};
pub use filters::{collect_arguments, filter_arguments, filter_return_value, fold_arguments, fold_arguments_at};

use invoke_types::{MethodType, MAX_TARGET_SLOTS};

use crate::error::{HandleError, HandleResult};

/// Reject composed types that leave no slot for the target itself
pub(crate) fn check_slots(ty: &MethodType) -> HandleResult<()> {
    let slots = ty.parameter_slot_count();
    if slots > MAX_TARGET_SLOTS {
        return Err(HandleError::ArityOverflow {
            slots,
            max: MAX_TARGET_SLOTS,
        });
    }
    Ok(())
}

fn illegal(message: impl Into<String>) -> HandleError {
    HandleError::IllegalAdaptation(message.into())
}
