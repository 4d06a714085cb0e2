//! Constants, identities and invokers

use invoke_types::{method_type, ClassRef, Kind, MethodType};
use smallvec::smallvec;

use super::{check_slots, drop_arguments};
use crate::error::{HandleError, HandleResult};
use crate::form::cache;
use crate::target::InvocationTarget;
use crate::value::Value;

/// `()kind` returning `value`, converted to `kind`
pub fn constant(kind: &Kind, value: Value) -> HandleResult<InvocationTarget> {
    if kind.is_void() {
        return Err(HandleError::IllegalArgument("constant of type void".to_string()));
    }
    let value = value.coerce_to(kind)?;
    let ty = method_type(kind.clone(), &[])?;
    Ok(InvocationTarget::bound(ty, cache::constant_form(kind.basic_type()), smallvec![value]))
}

/// `(kind)kind` returning its argument
pub fn identity(kind: &Kind) -> HandleResult<InvocationTarget> {
    if kind.is_void() {
        return Err(HandleError::IllegalArgument("identity of type void".to_string()));
    }
    let ty = method_type(kind.clone(), &[kind.clone()])?;
    Ok(InvocationTarget::bound(ty, cache::identity_form(kind.basic_type()), smallvec![]))
}

/// `()kind` returning the zero value (nothing for `void`)
pub fn zero(kind: &Kind) -> HandleResult<InvocationTarget> {
    let ty = method_type(kind.clone(), &[])?;
    Ok(InvocationTarget::bound(ty, cache::zero_form(kind), smallvec![]))
}

/// Target of type `ty` that ignores its arguments and returns zero
pub fn empty(ty: &MethodType) -> HandleResult<InvocationTarget> {
    drop_arguments(&zero(ty.return_type())?, 0, ty.parameter_array())
}

fn invoker_type(ty: &MethodType) -> HandleResult<MethodType> {
    let invoker_ty = ty.insert_parameter_types(0, &[Kind::of(&ClassRef::handle())])?;
    check_slots(&invoker_ty)?;
    Ok(invoker_ty)
}

/// `(Handle, params...)ret` calling its first argument with `invoke_exact`
pub fn exact_invoker(ty: &MethodType) -> HandleResult<InvocationTarget> {
    let invoker_ty = invoker_type(ty)?;
    Ok(InvocationTarget::bound(invoker_ty, cache::invoker_form(ty, true), smallvec![]))
}

/// `(Handle, params...)ret` calling its first argument with `invoke`
pub fn invoker(ty: &MethodType) -> HandleResult<InvocationTarget> {
    let invoker_ty = invoker_type(ty)?;
    Ok(InvocationTarget::bound(invoker_ty, cache::invoker_form(ty, false), smallvec![]))
}

/// Same target with its result discarded
pub fn drop_return(target: &InvocationTarget) -> HandleResult<InvocationTarget> {
    target.as_type(&target.ty().change_return_type(Kind::Void))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_converts_value() {
        let answer = constant(&Kind::Long, Value::Int(42)).unwrap();
        let ty = answer.ty().clone();
        assert_eq!(answer.invoke_exact(&ty, &[]).unwrap(), Value::Long(42));
        assert!(constant(&Kind::Void, Value::Int(1)).is_err());
        assert!(constant(&Kind::Int, Value::string("x")).is_err());
    }

    #[test]
    fn test_empty_returns_zero() {
        let ty = method_type(Kind::Double, &[Kind::string(), Kind::Int]).unwrap();
        let empty = empty(&ty).unwrap();
        assert_eq!(empty.ty(), &ty);
        assert_eq!(
            empty.invoke_exact(&ty, &[Value::string("a"), Value::Int(1)]).unwrap(),
            Value::Double(0.0)
        );
    }

    #[test]
    fn test_invokers() {
        let ty = method_type(Kind::Int, &[Kind::Int]).unwrap();
        let inc = InvocationTarget::from_fn(ty.clone(), "inc", |args: &[Value]| {
            Ok(Value::Int(args[0].as_i32().unwrap_or(0) + 1))
        });
        let exact = exact_invoker(&ty).unwrap();
        let exact_ty = exact.ty().clone();
        assert_eq!(exact_ty.parameter_count(), 2);
        assert_eq!(
            exact.invoke_exact(&exact_ty, &[Value::handle(inc.clone()), Value::Int(1)]).unwrap(),
            Value::Int(2)
        );

        let short_ty = method_type(Kind::Int, &[Kind::Short]).unwrap();
        let generic = invoker(&short_ty).unwrap();
        let generic_ty = generic.ty().clone();
        assert_eq!(
            generic
                .invoke_exact(&generic_ty, &[Value::handle(inc.clone()), Value::Short(4)])
                .unwrap(),
            Value::Int(5)
        );
        let strict = exact_invoker(&short_ty).unwrap();
        let strict_ty = strict.ty().clone();
        assert!(matches!(
            strict.invoke_exact(&strict_ty, &[Value::handle(inc), Value::Short(4)]),
            Err(HandleError::WrongType { .. })
        ));
    }

    #[test]
    fn test_drop_return() {
        let ty = method_type(Kind::Int, &[]).unwrap();
        let seven = InvocationTarget::from_fn(ty, "seven", |_args: &[Value]| Ok(Value::Int(7)));
        let dropped = drop_return(&seven).unwrap();
        let void_ty = dropped.ty().clone();
        assert!(void_ty.return_type().is_void());
        assert_eq!(dropped.invoke_exact(&void_ty, &[]).unwrap(), Value::Void);
    }
}
