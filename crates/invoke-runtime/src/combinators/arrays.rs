//! Spreaders, collectors and array access targets

use invoke_types::{method_type, ClassRef, Kind};

use super::illegal;
use crate::error::{HandleError, HandleResult};
use crate::form::Transform;
use crate::target::InvocationTarget;
use crate::value::Value;

fn component_of(array_class: &ClassRef) -> HandleResult<Kind> {
    Ok(array_class.component_type()?.clone())
}

fn index_arg(value: &Value) -> HandleResult<usize> {
    let index = value.as_i32().ok_or_else(|| HandleError::TypeMismatch {
        expected: "int".to_string(),
        found: value.kind_name(),
    })?;
    usize::try_from(index).map_err(|_| HandleError::IllegalArgument(format!("negative index {}", index)))
}

/// Take the trailing `count` arguments from one array argument
///
/// The array's length is checked on every call; a null array is accepted
/// only when `count` is zero.
pub fn as_spreader(target: &InvocationTarget, array_class: &ClassRef, count: usize) -> HandleResult<InvocationTarget> {
    let component = component_of(array_class)?;
    let ty = target.ty();
    let arity = ty.parameter_count();
    if count > arity {
        return Err(illegal(format!("cannot spread {} arguments of {}", count, ty)));
    }
    let pos = arity - count;
    let elements = vec![component; count];
    let needed = ty.replace_parameter_types(pos, arity, &elements)?;
    let adjusted = target.as_fixed_arity().as_type(&needed)?;
    let spread_ty = needed.replace_parameter_types(pos, arity, &[Kind::of(array_class)])?;
    adjusted.derive(spread_ty, vec![(Transform::Spread { pos, count }, None)])
}

/// Replace the trailing array parameter by `count` element parameters
pub fn as_collector(target: &InvocationTarget, array_class: &ClassRef, count: usize) -> HandleResult<InvocationTarget> {
    let component = component_of(array_class)?;
    let ty = target.ty();
    let last = ty
        .last_parameter_type()
        .ok_or_else(|| illegal(format!("{} has no trailing parameter to collect into", ty)))?;
    if !last.is_assignable_from(&Kind::of(array_class)) {
        return Err(illegal(format!("{} cannot collect into {}", ty, array_class)));
    }
    let pos = ty.parameter_count() - 1;
    let collected_ty = ty.replace_parameter_types(pos, pos + 1, &vec![component.clone(); count])?;
    target.as_fixed_arity().derive(
        collected_ty,
        vec![(
            Transform::CollectArray {
                pos,
                count,
                component,
            },
            None,
        )],
    )
}

/// `(A, int)C`: read one element
pub fn array_element_getter(array_class: &ClassRef) -> HandleResult<InvocationTarget> {
    let component = component_of(array_class)?;
    let ty = method_type(component, &[Kind::of(array_class), Kind::Int])?;
    Ok(InvocationTarget::from_fn(ty, "array_element_getter", |args: &[Value]| {
        args[0].array_get(index_arg(&args[1])?)
    }))
}

/// `(A, int, C)void`: store one element
pub fn array_element_setter(array_class: &ClassRef) -> HandleResult<InvocationTarget> {
    let component = component_of(array_class)?;
    let ty = method_type(Kind::Void, &[Kind::of(array_class), Kind::Int, component])?;
    Ok(InvocationTarget::from_fn(ty, "array_element_setter", |args: &[Value]| {
        args[0].array_set(index_arg(&args[1])?, args[2].clone())?;
        Ok(Value::Void)
    }))
}

/// `(A)int`: array length
pub fn array_length(array_class: &ClassRef) -> HandleResult<InvocationTarget> {
    component_of(array_class)?;
    let ty = method_type(Kind::Int, &[Kind::of(array_class)])?;
    Ok(InvocationTarget::from_fn(ty, "array_length", |args: &[Value]| {
        match (&args[0], args[0].array_len()) {
            (Value::Null, _) => Err(HandleError::NullDereference("array length of null".to_string())),
            (_, Some(len)) => i32::try_from(len)
                .map(Value::Int)
                .map_err(|_| HandleError::IllegalArgument(format!("array length {} exceeds int", len))),
            (other, None) => Err(HandleError::TypeMismatch {
                expected: "array".to_string(),
                found: other.kind_name(),
            }),
        }
    }))
}

/// `(int)A`: new array filled with zero values
pub fn array_constructor(array_class: &ClassRef) -> HandleResult<InvocationTarget> {
    let component = component_of(array_class)?;
    let ty = method_type(Kind::of(array_class), &[Kind::Int])?;
    Ok(InvocationTarget::from_fn(ty, "array_constructor", move |args: &[Value]| {
        let length = index_arg(&args[0])?;
        Ok(Value::array(&component, vec![Value::zero(&component); length]))
    }))
}
