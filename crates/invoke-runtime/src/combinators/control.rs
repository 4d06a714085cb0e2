//! Guards, exception handlers and throwers

use invoke_types::{method_type, ClassRef, Kind};
use smallvec::smallvec;

use super::{check_slots, illegal};
use crate::error::HandleResult;
use crate::form::cache;
use crate::target::InvocationTarget;
use crate::value::Value;

/// Call `target` when `test` holds for the leading arguments, else `fallback`
///
/// `test` returns boolean and takes a prefix of the parameters; `target` and
/// `fallback` must have the same type. Both branches receive all arguments.
pub fn guard_with_test(
    test: &InvocationTarget,
    target: &InvocationTarget,
    fallback: &InvocationTarget,
) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    if fallback.ty() != ty {
        return Err(illegal(format!(
            "target {} and fallback {} differ",
            ty,
            fallback.ty()
        )));
    }
    let tty = test.ty();
    if tty.return_type() != &Kind::Boolean {
        return Err(illegal(format!("test {} does not return boolean", tty)));
    }
    let params = ty.parameter_array();
    let test_params = tty.parameter_array();
    if test_params.len() > params.len() || &params[..test_params.len()] != test_params {
        return Err(illegal(format!(
            "test {} parameters are not a prefix of {}",
            tty, ty
        )));
    }
    check_slots(ty)?;
    Ok(InvocationTarget::bound(
        ty.clone(),
        cache::guard_form(ty.basic_type(), test_params.len()),
        smallvec![
            Value::handle(test.clone()),
            Value::handle(target.clone()),
            Value::handle(fallback.clone())
        ],
    ))
}

/// Call `target`; if it throws an instance of `exception`, call `handler`
///
/// `handler` takes the exception followed by a prefix of the target's
/// parameters and returns the target's return type. Other failures pass
/// through unchanged.
pub fn catch_exception(
    target: &InvocationTarget,
    exception: &ClassRef,
    handler: &InvocationTarget,
) -> HandleResult<InvocationTarget> {
    if !ClassRef::throwable().is_assignable_from(exception) {
        return Err(illegal(format!("{} is not throwable", exception)));
    }
    let ty = target.ty();
    let hty = handler.ty();
    let accepts = hty
        .parameter_array()
        .first()
        .is_some_and(|first| first.is_assignable_from(&Kind::of(exception)));
    if !accepts {
        return Err(illegal(format!("handler {} does not accept {}", hty, exception)));
    }
    if hty.return_type() != ty.return_type() {
        return Err(illegal(format!(
            "handler {} does not return the result of {}",
            hty, ty
        )));
    }
    let leading = &hty.parameter_array()[1..];
    let params = ty.parameter_array();
    if leading.len() > params.len() || &params[..leading.len()] != leading {
        return Err(illegal(format!(
            "handler {} parameters are not a prefix of {}",
            hty, ty
        )));
    }
    check_slots(ty)?;
    Ok(InvocationTarget::bound(
        ty.clone(),
        cache::catch_form(ty.basic_type(), leading.len()),
        smallvec![
            Value::handle(target.clone()),
            Value::class_object(exception),
            Value::handle(handler.clone())
        ],
    ))
}

/// `(E)R` that throws its argument
pub fn throw_exception(return_kind: Kind, exception: &ClassRef) -> HandleResult<InvocationTarget> {
    if !ClassRef::throwable().is_assignable_from(exception) {
        return Err(illegal(format!("{} is not throwable", exception)));
    }
    let ty = method_type(return_kind, &[Kind::of(exception)])?;
    let form = cache::throw_form(ty.basic_type());
    Ok(InvocationTarget::bound(ty, form, smallvec![]))
}
