//! Filters, collectors and folds
//!
//! Each combinator captures its helper target as one more bound value and
//! splices a call to it into the target's form.

use invoke_types::{BasicType, Kind, MethodType};

use super::illegal;
use crate::error::HandleResult;
use crate::form::Transform;
use crate::target::InvocationTarget;
use crate::value::Value;

fn basics(ty: &MethodType) -> Vec<BasicType> {
    ty.parameter_array().iter().map(Kind::basic_type).collect()
}

/// Pass the arguments starting at `pos` through unary `filters`
///
/// `None` leaves the argument untouched. A filter's return type must equal
/// the parameter it feeds; that parameter then takes the filter's parameter
/// type.
pub fn filter_arguments(
    target: &InvocationTarget,
    pos: usize,
    filters: &[Option<InvocationTarget>],
) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let fits = pos.checked_add(filters.len()).is_some_and(|end| end <= ty.parameter_count());
    if !fits {
        return Err(illegal(format!(
            "{} filters at {} do not fit {}",
            filters.len(),
            pos,
            ty
        )));
    }
    let mut new_ty = ty.clone();
    let mut edits = Vec::new();
    for (offset, filter) in filters.iter().enumerate() {
        let Some(filter) = filter else { continue };
        let index = pos + offset;
        let fty = filter.ty();
        if fty.parameter_count() != 1 || fty.return_type() != ty.parameter_type(index) {
            return Err(illegal(format!(
                "filter {} does not produce parameter {} of {}",
                fty, index, ty
            )));
        }
        let input = fty.parameter_type(0);
        new_ty = new_ty.change_parameter_type(index, input.clone())?;
        edits.push((
            Transform::FilterArg {
                pos: index,
                basic: input.basic_type(),
            },
            Some(Value::handle(filter.clone())),
        ));
    }
    if edits.is_empty() {
        return Ok(target.clone());
    }
    target.derive(new_ty, edits)
}

/// Pass the result through `filter`
///
/// The filter takes the target's return value, or nothing if the target
/// returns `void`.
pub fn filter_return_value(target: &InvocationTarget, filter: &InvocationTarget) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let fty = filter.ty();
    let returned = ty.return_type();
    let fits = if returned.is_void() {
        fty.parameter_count() == 0
    } else {
        fty.parameter_count() == 1 && fty.parameter_type(0) == returned
    };
    if !fits {
        return Err(illegal(format!("filter {} does not accept the result of {}", fty, ty)));
    }
    target.derive(
        ty.change_return_type(fty.return_type().clone()),
        vec![(
            Transform::FilterReturn {
                basic: fty.return_type().basic_type(),
            },
            Some(Value::handle(filter.clone())),
        )],
    )
}

/// Replace parameter `pos` by the parameters of `combiner`
///
/// A `void` combiner's parameters are inserted at `pos` without replacing
/// anything; otherwise its result must have the type of parameter `pos`.
pub fn collect_arguments(
    target: &InvocationTarget,
    pos: usize,
    combiner: &InvocationTarget,
) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let cty = combiner.ty();
    let returns_void = cty.return_type().is_void();
    let new_ty = if returns_void {
        if pos > ty.parameter_count() {
            return Err(illegal(format!("cannot collect at {} of {}", pos, ty)));
        }
        ty.insert_parameter_types(pos, cty.parameter_array())?
    } else {
        if pos >= ty.parameter_count() || ty.parameter_type(pos) != cty.return_type() {
            return Err(illegal(format!(
                "combiner {} does not produce parameter {} of {}",
                cty, pos, ty
            )));
        }
        ty.replace_parameter_types(pos, pos + 1, cty.parameter_array())?
    };
    target.derive(
        new_ty,
        vec![(
            Transform::Collect {
                pos,
                params: basics(cty),
                returns_void,
            },
            Some(Value::handle(combiner.clone())),
        )],
    )
}

/// Pre-process the leading arguments with `combiner`
pub fn fold_arguments(target: &InvocationTarget, combiner: &InvocationTarget) -> HandleResult<InvocationTarget> {
    fold_arguments_at(target, 0, combiner)
}

/// Call `combiner` on a copy of the arguments starting at `pos`
///
/// The arguments stay visible to the target. A non-void result is inserted
/// as the target's parameter `pos`, ahead of the arguments it was computed
/// from.
pub fn fold_arguments_at(
    target: &InvocationTarget,
    pos: usize,
    combiner: &InvocationTarget,
) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let cty = combiner.ty();
    let returns_void = cty.return_type().is_void();
    let folded = if returns_void { 0 } else { 1 };
    let count = cty.parameter_count();
    let end = pos.checked_add(folded + count).filter(|&end| end <= ty.parameter_count());
    let Some(end) = end else {
        return Err(illegal(format!("combiner {} does not fit {} at {}", cty, ty, pos)));
    };
    if !returns_void && ty.parameter_type(pos) != cty.return_type() {
        return Err(illegal(format!(
            "combiner {} does not produce parameter {} of {}",
            cty, pos, ty
        )));
    }
    let consumed = &ty.parameter_array()[pos + folded..end];
    if consumed != cty.parameter_array() {
        return Err(illegal(format!(
            "combiner {} does not match the arguments of {} at {}",
            cty, ty, pos
        )));
    }
    let new_ty = if returns_void {
        ty.clone()
    } else {
        ty.drop_parameter_types(pos, pos + 1)?
    };
    target.derive(
        new_ty,
        vec![(
            Transform::Fold {
                pos,
                count,
                returns_void,
            },
            Some(Value::handle(combiner.clone())),
        )],
    )
}
