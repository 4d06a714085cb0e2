//! Binding, inserting, dropping, permuting and casting arguments

use invoke_types::{BasicType, ConversionMode, Kind, MethodType};

use super::illegal;
use crate::error::{HandleError, HandleResult};
use crate::form::Transform;
use crate::target::InvocationTarget;
use crate::value::Value;

/// Capture `value` as the leading reference argument
pub fn bind_leading(target: &InvocationTarget, value: Value) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let first = match ty.parameter_array().first() {
        Some(kind) if kind.is_reference() => kind,
        Some(kind) => return Err(illegal(format!("leading parameter of {} is {}, not a reference", ty, kind))),
        None => return Err(illegal(format!("{} has no parameter to bind", ty))),
    };
    let value = value.coerce_to(first)?;
    target.derive(
        ty.drop_parameter_types(0, 1)?,
        vec![(
            Transform::BindArg {
                pos: 0,
                basic: BasicType::Ref,
            },
            Some(value),
        )],
    )
}

/// Capture `values` for the parameters starting at `pos`
///
/// Each value is converted to its parameter's kind as `as_type` would.
pub fn insert_arguments(target: &InvocationTarget, pos: usize, values: &[Value]) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let count = ty.parameter_count();
    if pos > count || values.len() > count - pos {
        return Err(illegal(format!(
            "cannot insert {} values at {} into {}",
            values.len(),
            pos,
            ty
        )));
    }
    if values.is_empty() {
        return Ok(target.clone());
    }
    let mut edits = Vec::with_capacity(values.len());
    for (offset, value) in values.iter().enumerate() {
        let kind = ty.parameter_type(pos + offset);
        edits.push((
            Transform::BindArg {
                pos,
                basic: kind.basic_type(),
            },
            Some(value.clone().coerce_to(kind)?),
        ));
    }
    target.derive(ty.drop_parameter_types(pos, pos + values.len())?, edits)
}

/// Accept and ignore extra parameters of `kinds` at `pos`
pub fn drop_arguments(target: &InvocationTarget, pos: usize, kinds: &[Kind]) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    if pos > ty.parameter_count() {
        return Err(illegal(format!("cannot drop arguments at {} of {}", pos, ty)));
    }
    if kinds.is_empty() {
        return Ok(target.clone());
    }
    let new_ty = ty.insert_parameter_types(pos, kinds)?;
    target.derive(
        new_ty,
        vec![(
            Transform::AddArgs {
                pos,
                basics: kinds.iter().map(Kind::basic_type).collect(),
            },
            None,
        )],
    )
}

/// Pad `target` with ignored parameters so that it takes `new_kinds`
///
/// The target's parameters after the first `skip` must appear in `new_kinds`
/// starting at `pos`. The result keeps the first `skip` parameters, followed
/// by all of `new_kinds`.
pub fn drop_arguments_to_match(
    target: &InvocationTarget,
    skip: usize,
    new_kinds: &[Kind],
    pos: usize,
) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    let params = ty.parameter_array();
    if skip > params.len() {
        return Err(illegal(format!("cannot skip {} parameters of {}", skip, ty)));
    }
    let matched = &params[skip..];
    let end = pos.checked_add(matched.len()).filter(|&end| end <= new_kinds.len());
    let Some(end) = end.filter(|&end| &new_kinds[pos..end] == matched) else {
        return Err(illegal(format!(
            "parameters of {} after {} do not match {:?} at {}",
            ty, skip, new_kinds, pos
        )));
    };
    let leading = drop_arguments(target, skip, &new_kinds[..pos])?;
    drop_arguments(&leading, skip + end, &new_kinds[end..])
}

/// Reorder, duplicate or drop arguments
///
/// Parameter `j` of `target` is fed from parameter `reorder[j]` of `new_ty`.
/// Types must match exactly.
pub fn permute_arguments(
    target: &InvocationTarget,
    new_ty: &MethodType,
    reorder: &[usize],
) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    if reorder.len() != ty.parameter_count() {
        return Err(illegal(format!(
            "reorder array of length {} does not match {}",
            reorder.len(),
            ty
        )));
    }
    if new_ty.return_type() != ty.return_type() {
        return Err(illegal(format!("return types differ: {} vs {}", ty, new_ty)));
    }
    for (j, &source) in reorder.iter().enumerate() {
        if source >= new_ty.parameter_count() {
            return Err(illegal(format!("index {} is out of range for {}", source, new_ty)));
        }
        if new_ty.parameter_type(source) != ty.parameter_type(j) {
            return Err(illegal(format!(
                "parameter {} of {} cannot be fed from parameter {} of {}",
                j, ty, source, new_ty
            )));
        }
    }
    target.derive(
        new_ty.clone(),
        vec![(
            Transform::Permute {
                args: new_ty.parameter_array().iter().map(Kind::basic_type).collect(),
                reorder: reorder.to_vec(),
            },
            None,
        )],
    )
}

/// Like `as_type`, with narrowing primitive conversions, boolean/number
/// conversions and unchecked unboxing of null to zero
pub fn explicit_cast_arguments(target: &InvocationTarget, new_ty: &MethodType) -> HandleResult<InvocationTarget> {
    let ty = target.ty();
    if new_ty == ty {
        return Ok(target.clone());
    }
    if !ty.is_explicit_castable_to(new_ty) {
        return Err(HandleError::Adaptation {
            from: ty.to_string(),
            to: new_ty.to_string(),
        });
    }
    target.as_fixed_arity().adapt(new_ty, ConversionMode::ExplicitCast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoke_types::method_type;

    fn subtract() -> InvocationTarget {
        let ty = method_type(Kind::Int, &[Kind::Int, Kind::Int]).unwrap();
        InvocationTarget::from_fn(ty, "subtract", |args: &[Value]| {
            Ok(Value::Int(args[0].as_i32().unwrap_or(0) - args[1].as_i32().unwrap_or(0)))
        })
    }

    #[test]
    fn test_insert_arguments_shares_forms() {
        let sub = subtract();
        let a = insert_arguments(&sub, 1, &[Value::Int(1)]).unwrap();
        let b = insert_arguments(&sub, 1, &[Value::Int(2)]).unwrap();
        assert!(a.shares_form_with(&b));
        let ty = a.ty().clone();
        assert_eq!(a.invoke_exact(&ty, &[Value::Int(10)]).unwrap(), Value::Int(9));
        assert_eq!(b.invoke_exact(&ty, &[Value::Int(10)]).unwrap(), Value::Int(8));
    }

    #[test]
    fn test_insert_arguments_out_of_range() {
        let sub = subtract();
        assert!(matches!(
            insert_arguments(&sub, 1, &[Value::Int(1), Value::Int(2)]),
            Err(HandleError::IllegalAdaptation(_))
        ));
        assert!(matches!(
            insert_arguments(&sub, 0, &[Value::string("x")]),
            Err(HandleError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bind_leading_requires_reference() {
        assert!(matches!(
            bind_leading(&subtract(), Value::Int(1)),
            Err(HandleError::IllegalAdaptation(_))
        ));
    }

    #[test]
    fn test_permute_validation() {
        let sub = subtract();
        let ty = sub.ty().clone();
        assert!(permute_arguments(&sub, &ty, &[0]).is_err());
        assert!(permute_arguments(&sub, &ty, &[0, 2]).is_err());
        let wrong_return = ty.change_return_type(Kind::Long);
        assert!(permute_arguments(&sub, &wrong_return, &[1, 0]).is_err());
        let wrong_param = method_type(Kind::Int, &[Kind::Long, Kind::Int]).unwrap();
        assert!(permute_arguments(&sub, &wrong_param, &[0, 1]).is_err());
    }

    #[test]
    fn test_permute_duplicates_arguments() {
        let sub = subtract();
        let unary = method_type(Kind::Int, &[Kind::Int]).unwrap();
        let zero = permute_arguments(&sub, &unary, &[0, 0]).unwrap();
        assert_eq!(zero.invoke_exact(&unary, &[Value::Int(17)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_drop_arguments_to_match() {
        let sub = subtract();
        let kinds = [Kind::string(), Kind::Int, Kind::Int, Kind::Boolean];
        let padded = drop_arguments_to_match(&sub, 0, &kinds, 1).unwrap();
        let ty = method_type(Kind::Int, &kinds).unwrap();
        assert_eq!(padded.ty(), &ty);
        let result = padded
            .invoke_exact(&ty, &[Value::string("x"), Value::Int(5), Value::Int(3), Value::Boolean(true)])
            .unwrap();
        assert_eq!(result, Value::Int(2));
        assert!(drop_arguments_to_match(&sub, 0, &kinds, 2).is_err());
    }

    #[test]
    fn test_explicit_cast_narrows_and_tests_low_bit() {
        let sub = subtract();
        let ty = method_type(Kind::Boolean, &[Kind::Long, Kind::Double]).unwrap();
        let cast = explicit_cast_arguments(&sub, &ty).unwrap();
        // 7 - 2 = 5, low bit set
        assert_eq!(cast.invoke_exact(&ty, &[Value::Long(7), Value::Double(2.9)]).unwrap(), Value::Boolean(true));
        assert_eq!(cast.invoke_exact(&ty, &[Value::Long(6), Value::Double(2.0)]).unwrap(), Value::Boolean(false));
    }
}
