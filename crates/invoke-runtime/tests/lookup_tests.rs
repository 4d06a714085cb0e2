use std::sync::Arc;

use invoke_runtime::{
    AccessContext, AccessMode, HandleError, HandleResult, Lookup, MemberReference, MemberRegistry, Modifiers,
    RefKind, TargetVariant, Value, Visibility,
};
use invoke_types::{method_type, ClassRef, Kind, MethodType};

struct World {
    registry: MemberRegistry,
    math: ClassRef,
    helper: ClassRef,
    inner: ClassRef,
    outsider: ClassRef,
    base: ClassRef,
    derived: ClassRef,
    sub: ClassRef,
    mine: ClassRef,
}

fn int(args: &[Value], i: usize) -> i32 {
    args[i].as_i32().unwrap_or(0)
}

fn binary() -> MethodType {
    method_type(Kind::Int, &[Kind::Int, Kind::Int]).unwrap()
}

fn nullary(ret: Kind) -> MethodType {
    method_type(ret, &[]).unwrap()
}

fn greet_type() -> MethodType {
    method_type(Kind::string(), &[Kind::string()]).unwrap()
}

fn greeting(prefix: &'static str) -> impl Fn(&[Value]) -> HandleResult<Value> + Send + Sync + 'static {
    move |args: &[Value]| Ok(Value::string(format!("{} {}", prefix, args[1].as_str().unwrap_or("?"))))
}

fn world() -> World {
    let registry = MemberRegistry::new();
    let math = ClassRef::builder("app.Math").build();
    let helper = ClassRef::builder("app.Helper").build();
    let inner = ClassRef::builder("app.Math$Inner").nested_in(&math).build();
    let outsider = ClassRef::builder("other.Outsider").build();
    let base = ClassRef::builder("lib.Base").build();
    let derived = ClassRef::builder("app.Derived").extends(&base).build();
    let sub = ClassRef::builder("lib.Sub").extends(&base).build();
    let mine = ClassRef::builder("app.Mine").extends(&base).build();

    registry.define_method(&math, "add", &binary(), Modifiers::public_static(), |args: &[Value]| {
        Ok(Value::Int(int(args, 0) + int(args, 1)))
    });
    registry.define_method(
        &math,
        "secret",
        &nullary(Kind::Int),
        Modifiers::new(Visibility::Private).with_static(),
        |_args: &[Value]| Ok(Value::Int(42)),
    );
    registry.define_method(
        &math,
        "internal",
        &nullary(Kind::Int),
        Modifiers::new(Visibility::Package).with_static(),
        |_args: &[Value]| Ok(Value::Int(7)),
    );
    registry.define_method(
        &math,
        "caller",
        &nullary(Kind::string()),
        Modifiers::public_static().with_caller_sensitive(),
        |args: &[Value]| {
            let name = args.last().and_then(Value::as_class).map(|class| class.name().to_string());
            Ok(Value::string(name.unwrap_or_default()))
        },
    );
    let ints = Kind::array_of(&Kind::Int);
    registry.define_method(
        &math,
        "sum",
        &method_type(Kind::Int, &[ints]).unwrap(),
        Modifiers::public_static().with_varargs(),
        |args: &[Value]| {
            let elements = args[0].array_elements().unwrap_or_default();
            Ok(Value::Int(elements.iter().filter_map(Value::as_i32).sum()))
        },
    );

    registry.define_constructor(&base, &nullary(Kind::Void), Modifiers::public(), |args: &[Value]| {
        args[0].set_field("count", Value::Int(1))?;
        Ok(Value::Void)
    });
    registry.define_field(&base, "count", &Kind::Int, Modifiers::public());
    registry.define_field(&base, "total", &Kind::Long, Modifiers::public_static());
    registry.define_method(&base, "greet", &greet_type(), Modifiers::public(), greeting("hello"));
    registry.define_method(&derived, "greet", &greet_type(), Modifiers::public(), greeting("hi"));
    registry.define_method(
        &base,
        "describe",
        &nullary(Kind::string()),
        Modifiers::new(Visibility::Protected),
        |_args: &[Value]| Ok(Value::string("base")),
    );

    World {
        registry,
        math,
        helper,
        inner,
        outsider,
        base,
        derived,
        sub,
        mine,
    }
}

impl World {
    fn lookup(&self, class: &ClassRef, modes: AccessMode) -> Lookup {
        Lookup::with_context(AccessContext::new(class, modes), Arc::new(self.registry.clone()))
    }
}

fn call(target: &invoke_runtime::InvocationTarget, args: &[Value]) -> HandleResult<Value> {
    let ty = target.ty().clone();
    target.invoke_exact(&ty, args)
}

// ============================================================================
// Static methods and basic failures
// ============================================================================

#[test]
fn test_resolve_and_invoke_static() {
    let w = world();
    let add = w.lookup(&w.helper, AccessMode::ALL).resolve_static_invoke(&w.math, "add", &binary()).unwrap();
    assert_eq!(add.ty(), &binary());
    assert_eq!(add.variant(), TargetVariant::Direct);
    assert_eq!(call(&add, &[Value::Int(2), Value::Int(3)]).unwrap(), Value::Int(5));
}

#[test]
fn test_no_capabilities_denied() {
    let w = world();
    let lookup = w.lookup(&w.math, AccessMode::NONE);
    assert!(matches!(
        lookup.resolve_static_invoke(&w.math, "add", &binary()),
        Err(HandleError::AccessDenied(_))
    ));
}

#[test]
fn test_missing_member() {
    let w = world();
    let lookup = w.lookup(&w.math, AccessMode::ALL);
    assert!(matches!(
        lookup.resolve_static_invoke(&w.math, "mul", &binary()),
        Err(HandleError::NoSuchMember(_))
    ));
    let wrong = method_type(Kind::Long, &[Kind::Int, Kind::Int]).unwrap();
    assert!(matches!(
        lookup.resolve_static_invoke(&w.math, "add", &wrong),
        Err(HandleError::NoSuchMember(_))
    ));
}

#[test]
fn test_staticness_mismatch_denied() {
    let w = world();
    let lookup = w.lookup(&w.math, AccessMode::ALL);
    assert!(matches!(
        lookup.resolve_instance_invoke(&w.math, "add", &binary()),
        Err(HandleError::AccessDenied(_))
    ));
    assert!(matches!(
        lookup.resolve_static_invoke(&w.base, "greet", &greet_type()),
        Err(HandleError::AccessDenied(_))
    ));
}

// ============================================================================
// Visibility rules
// ============================================================================

#[test]
fn test_private_access() {
    let w = world();
    let int_ty = nullary(Kind::Int);

    for modes in [AccessMode::ALL, AccessMode::PUBLIC] {
        let own = w.lookup(&w.math, modes).resolve_static_invoke(&w.math, "secret", &int_ty).unwrap();
        assert_eq!(call(&own, &[]).unwrap(), Value::Int(42));
    }

    let nestmate = w.lookup(&w.inner, AccessMode::ALL).resolve_static_invoke(&w.math, "secret", &int_ty);
    assert!(nestmate.is_ok());

    for lookup in [
        w.lookup(&w.helper, AccessMode::ALL),
        w.lookup(&w.inner, AccessMode::PUBLIC.union(AccessMode::PACKAGE)),
    ] {
        assert!(matches!(
            lookup.resolve_static_invoke(&w.math, "secret", &int_ty),
            Err(HandleError::AccessDenied(_))
        ));
    }
}

#[test]
fn test_package_access() {
    let w = world();
    let int_ty = nullary(Kind::Int);
    let ok = w
        .lookup(&w.helper, AccessMode::PUBLIC.union(AccessMode::PACKAGE))
        .resolve_static_invoke(&w.math, "internal", &int_ty)
        .unwrap();
    assert_eq!(call(&ok, &[]).unwrap(), Value::Int(7));

    for lookup in [w.lookup(&w.outsider, AccessMode::ALL), w.lookup(&w.helper, AccessMode::PUBLIC)] {
        assert!(matches!(
            lookup.resolve_static_invoke(&w.math, "internal", &int_ty),
            Err(HandleError::AccessDenied(_))
        ));
    }
}

#[test]
fn test_protected_receiver_is_narrowed() {
    let w = world();
    let describe_ty = nullary(Kind::string());
    let lookup = w.lookup(&w.derived, AccessMode::ALL);
    let describe = lookup.resolve_instance_invoke(&w.base, "describe", &describe_ty).unwrap();

    let narrowed = method_type(Kind::string(), &[Kind::of(&w.derived)]).unwrap();
    assert_eq!(describe.ty(), &narrowed);
    assert_eq!(describe.variant(), TargetVariant::Delegating);
    let result = call(&describe, &[Value::instance(&w.derived)]).unwrap();
    assert_eq!(result.as_str(), Some("base"));

    assert!(matches!(
        w.lookup(&w.outsider, AccessMode::ALL).resolve_instance_invoke(&w.base, "describe", &describe_ty),
        Err(HandleError::AccessDenied(_))
    ));
}

#[test]
fn test_protected_receiver_narrowed_through_sibling_subclass() {
    let w = world();
    let describe_ty = nullary(Kind::string());
    let lookup = w.lookup(&w.mine, AccessMode::ALL);
    let describe = lookup.resolve_instance_invoke(&w.sub, "describe", &describe_ty).unwrap();

    let narrowed = method_type(Kind::string(), &[Kind::of(&w.mine)]).unwrap();
    assert_eq!(describe.ty(), &narrowed);
    assert_eq!(describe.variant(), TargetVariant::Delegating);
    assert_eq!(call(&describe, &[Value::instance(&w.mine)]).unwrap().as_str(), Some("base"));

    assert!(matches!(
        call(&describe, &[Value::instance(&w.sub)]),
        Err(HandleError::TypeMismatch { .. })
    ));
    let through_sub = method_type(Kind::string(), &[Kind::of(&w.sub)]).unwrap();
    assert!(matches!(
        describe.invoke_exact(&through_sub, &[Value::instance(&w.sub)]),
        Err(HandleError::WrongType { .. })
    ));
}

#[test]
fn test_own_class_needs_any_mode() {
    let w = world();
    let lookup = w.lookup(&w.base, AccessMode::PUBLIC);
    let describe = lookup.resolve_instance_invoke(&w.base, "describe", &nullary(Kind::string())).unwrap();
    assert_eq!(describe.variant(), TargetVariant::Direct);
    assert_eq!(call(&describe, &[Value::instance(&w.sub)]).unwrap().as_str(), Some("base"));
}

#[test]
fn test_narrowed_contexts() {
    let w = world();
    let int_ty = nullary(Kind::Int);
    let full = w.lookup(&w.math, AccessMode::ALL);

    let moved = full.in_class(&w.outsider);
    assert_eq!(moved.lookup_class(), &w.outsider);
    assert!(!moved.modes().contains(AccessMode::PRIVATE));
    assert!(matches!(
        moved.resolve_static_invoke(&w.math, "secret", &int_ty),
        Err(HandleError::AccessDenied(_))
    ));

    let dropped = w.lookup(&w.inner, AccessMode::ALL).drop_mode(AccessMode::PRIVATE);
    assert!(dropped.resolve_static_invoke(&w.math, "internal", &int_ty).is_ok());
    assert!(dropped.resolve_static_invoke(&w.math, "secret", &int_ty).is_err());
}

#[test]
fn test_trusted_and_public_lookups() {
    let w = world();
    let engine = Arc::new(w.registry.clone());
    let int_ty = nullary(Kind::Int);

    let trusted = Lookup::trusted(engine.clone());
    assert!(trusted.resolve_static_invoke(&w.math, "secret", &int_ty).is_ok());

    let public = Lookup::public(engine);
    assert!(public.resolve_static_invoke(&w.math, "add", &binary()).is_ok());
    assert!(matches!(
        public.resolve_static_invoke(&w.math, "internal", &int_ty),
        Err(HandleError::AccessDenied(_))
    ));
}

// ============================================================================
// Caller-sensitive and variable-arity members
// ============================================================================

#[test]
fn test_caller_sensitive_sees_lookup_class() {
    let w = world();
    let ty = nullary(Kind::string());
    let caller = w.lookup(&w.helper, AccessMode::ALL).resolve_static_invoke(&w.math, "caller", &ty).unwrap();
    assert_eq!(caller.ty(), &ty);
    assert_eq!(call(&caller, &[]).unwrap().as_str(), Some("app.Helper"));

    assert!(matches!(
        w.lookup(&w.helper, AccessMode::PUBLIC.union(AccessMode::PACKAGE))
            .resolve_static_invoke(&w.math, "caller", &ty),
        Err(HandleError::AccessDenied(_))
    ));
}

#[test]
fn test_varargs_member_collects() {
    let w = world();
    let sum_ty = method_type(Kind::Int, &[Kind::array_of(&Kind::Int)]).unwrap();
    let sum = w.lookup(&w.math, AccessMode::ALL).resolve_static_invoke(&w.math, "sum", &sum_ty).unwrap();
    assert!(sum.is_varargs_collector());

    let spread = method_type(Kind::Int, &[Kind::Int, Kind::Int, Kind::Int]).unwrap();
    assert_eq!(
        sum.invoke(&spread, &[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap(),
        Value::Int(6)
    );
    assert!(!sum.as_fixed_arity().is_varargs_collector());
}

// ============================================================================
// Constructors and fields
// ============================================================================

#[test]
fn test_constructor_and_fields() {
    let w = world();
    let lookup = w.lookup(&w.base, AccessMode::ALL);
    let new = lookup.resolve_constructor(&w.base, &nullary(Kind::Void)).unwrap();
    assert_eq!(new.ty(), &nullary(Kind::of(&w.base)));
    let instance = call(&new, &[]).unwrap();
    assert_eq!(instance.class(), Some(&w.base));

    let get = lookup.resolve_field_get(&w.base, "count", &Kind::Int).unwrap();
    let set = lookup.resolve_field_set(&w.base, "count", &Kind::Int).unwrap();
    assert_eq!(call(&get, &[instance.clone()]).unwrap(), Value::Int(1));
    assert_eq!(call(&set, &[instance.clone(), Value::Int(9)]).unwrap(), Value::Void);
    assert_eq!(call(&get, &[instance]).unwrap(), Value::Int(9));

    assert!(matches!(
        lookup.resolve_constructor(&w.base, &nullary(Kind::Int)),
        Err(HandleError::NoSuchMember(_))
    ));
}

#[test]
fn test_static_fields() {
    let w = world();
    let lookup = w.lookup(&w.base, AccessMode::ALL);
    let get = lookup.resolve_static_field_get(&w.base, "total", &Kind::Long).unwrap();
    let set = lookup.resolve_static_field_set(&w.base, "total", &Kind::Long).unwrap();
    assert_eq!(call(&get, &[]).unwrap(), Value::Long(0));
    call(&set, &[Value::Long(99)]).unwrap();
    assert_eq!(call(&get, &[]).unwrap(), Value::Long(99));
    assert_eq!(w.registry.static_value(&w.base, "total"), Some(Value::Long(99)));

    assert!(matches!(
        lookup.resolve_field_get(&w.base, "total", &Kind::Long),
        Err(HandleError::AccessDenied(_))
    ));
}

// ============================================================================
// Dispatch: virtual, super and bound receivers
// ============================================================================

#[test]
fn test_virtual_dispatch_uses_receiver_class() {
    let w = world();
    let greet = w
        .lookup(&w.derived, AccessMode::ALL)
        .resolve_instance_invoke(&w.base, "greet", &greet_type())
        .unwrap();
    let on_base = call(&greet, &[Value::instance(&w.base), Value::string("x")]).unwrap();
    let on_derived = call(&greet, &[Value::instance(&w.derived), Value::string("x")]).unwrap();
    assert_eq!(on_base.as_str(), Some("hello x"));
    assert_eq!(on_derived.as_str(), Some("hi x"));
}

#[test]
fn test_super_invoke_skips_override() {
    let w = world();
    let lookup = w.lookup(&w.derived, AccessMode::ALL);
    let sup = lookup.resolve_super_invoke(&w.base, "greet", &greet_type(), &w.derived).unwrap();
    let expected = method_type(Kind::string(), &[Kind::of(&w.derived), Kind::string()]).unwrap();
    assert_eq!(sup.ty(), &expected);
    let result = call(&sup, &[Value::instance(&w.derived), Value::string("x")]).unwrap();
    assert_eq!(result.as_str(), Some("hello x"));

    let via_resolve = lookup
        .resolve(&MemberReference::method(&w.base, "greet", &greet_type(), RefKind::InvokeSpecial))
        .unwrap();
    assert_eq!(via_resolve.ty(), &expected);
}

#[test]
fn test_super_invoke_requires_private_caller() {
    let w = world();
    let lookup = w.lookup(&w.derived, AccessMode::ALL);
    assert!(matches!(
        lookup.resolve_super_invoke(&w.base, "greet", &greet_type(), &w.helper),
        Err(HandleError::AccessDenied(_))
    ));
    assert!(matches!(
        lookup
            .drop_mode(AccessMode::PRIVATE)
            .resolve_super_invoke(&w.base, "greet", &greet_type(), &w.derived),
        Err(HandleError::AccessDenied(_))
    ));
}

#[test]
fn test_bind_receiver() {
    let w = world();
    let lookup = w.lookup(&w.derived, AccessMode::ALL);
    let bound = lookup.bind(&Value::instance(&w.derived), "greet", &greet_type()).unwrap();
    assert_eq!(bound.ty(), &method_type(Kind::string(), &[Kind::string()]).unwrap());
    assert_eq!(call(&bound, &[Value::string("y")]).unwrap().as_str(), Some("hi y"));

    assert!(matches!(
        lookup.bind(&Value::Null, "greet", &greet_type()),
        Err(HandleError::NullDereference(_))
    ));
}
