use invoke_runtime::combinators::{as_collector, identity};
use invoke_runtime::{HandleError, InvocationTarget, TargetVariant, Value};
use invoke_types::{method_type, ClassRef, Kind, MethodType};

fn sum_of(args: &[Value]) -> i64 {
    args.iter().filter_map(Value::as_i64).sum()
}

fn adder() -> InvocationTarget {
    let ty = method_type(Kind::Int, &[Kind::Int, Kind::Int]).unwrap();
    InvocationTarget::from_fn(ty, "add", |args: &[Value]| Ok(Value::Int(sum_of(args) as i32)))
}

fn integer() -> Kind {
    Kind::of(&ClassRef::wrapper_for(&Kind::Int).unwrap())
}

// ============================================================================
// identity
// ============================================================================

#[test]
fn test_identity_returns_its_argument() {
    let cases = vec![
        (Kind::Int, Value::Int(-7)),
        (Kind::Long, Value::Long(1 << 40)),
        (Kind::Boolean, Value::Boolean(true)),
        (Kind::Char, Value::Char(65)),
        (Kind::Double, Value::Double(2.5)),
        (Kind::string(), Value::string("hello")),
        (Kind::object(), Value::Null),
    ];
    for (kind, value) in cases {
        let id = identity(&kind).unwrap();
        let ty = id.ty().clone();
        assert_eq!(id.invoke_exact(&ty, &[value.clone()]).unwrap(), value, "identity({})", kind);
    }
}

#[test]
fn test_identity_of_void_rejected() {
    assert!(matches!(identity(&Kind::Void), Err(HandleError::IllegalArgument(_))));
}

// ============================================================================
// invoke and invoke_exact
// ============================================================================

#[test]
fn test_invoke_adapts_boxed_arguments() {
    let add = adder();
    let boxed = method_type(integer(), &[integer(), Kind::Int]).unwrap();
    let result = add.invoke(&boxed, &[Value::Int(2).boxed(), Value::Int(3)]).unwrap();
    assert_eq!(result, Value::Int(5).boxed());
}

#[test]
fn test_invoke_exact_rejects_convertible_type() {
    let add = adder();
    let widened = method_type(Kind::Long, &[Kind::Int, Kind::Int]).unwrap();
    assert!(matches!(
        add.invoke_exact(&widened, &[Value::Int(1), Value::Int(2)]),
        Err(HandleError::WrongType { .. })
    ));
    assert_eq!(add.invoke(&widened, &[Value::Int(1), Value::Int(2)]).unwrap(), Value::Long(3));
}

#[test]
fn test_invoke_with_arguments_boxes() {
    let add = adder();
    let result = add.invoke_with_arguments(&[Value::Int(40), Value::Int(2)]).unwrap();
    assert_eq!(result, Value::Int(42).boxed());
}

#[test]
fn test_unboxing_wrong_wrapper_is_a_type_mismatch() {
    let add = adder();
    let objects = method_type(Kind::Int, &[Kind::object(), Kind::object()]).unwrap();
    let err = add
        .invoke(&objects, &[Value::string("1"), Value::Int(2).boxed()])
        .unwrap_err();
    assert!(matches!(err, HandleError::TypeMismatch { .. }));
}

#[test]
fn test_unboxing_widens() {
    let ty = method_type(Kind::Long, &[Kind::Long]).unwrap();
    let neg = InvocationTarget::from_fn(ty, "neg", |args: &[Value]| Ok(Value::Long(-args[0].as_i64().unwrap_or(0))));
    let boxed = method_type(Kind::Long, &[integer()]).unwrap();
    assert_eq!(neg.invoke(&boxed, &[Value::Int(5).boxed()]).unwrap(), Value::Long(-5));
}

// ============================================================================
// as_type
// ============================================================================

#[test]
fn test_as_type_associativity() {
    let add = adder();
    let t1 = method_type(Kind::Int, &[Kind::Short, Kind::Int]).unwrap();
    let t2 = method_type(Kind::object(), &[Kind::Byte, Kind::Short]).unwrap();
    let chained = add.as_type(&t1).unwrap().as_type(&t2).unwrap();
    let direct = add.as_type(&t2).unwrap();
    for (a, b) in [(1i8, 2i16), (-4, 100), (127, 127)] {
        let args = [Value::Byte(a), Value::Short(b)];
        let expected = direct.invoke_exact(&t2, &args).unwrap();
        assert_eq!(chained.invoke_exact(&t2, &args).unwrap(), expected);
    }
}

#[test]
fn test_as_type_same_type_is_self() {
    let add = adder();
    let ty = add.ty().clone();
    assert!(add.as_type(&ty).unwrap().ptr_eq(&add));
}

#[test]
fn test_as_type_memo_holds_last_request_only() {
    let add = adder();
    let t1 = method_type(Kind::Long, &[Kind::Int, Kind::Int]).unwrap();
    let t2 = method_type(Kind::Double, &[Kind::Int, Kind::Int]).unwrap();
    let first = add.as_type(&t1).unwrap();
    assert!(add.as_type(&t1).unwrap().ptr_eq(&first));
    add.as_type(&t2).unwrap();
    assert!(!add.as_type(&t1).unwrap().ptr_eq(&first));
}

#[test]
fn test_equally_adapted_targets_share_forms() {
    let ty = method_type(Kind::Int, &[Kind::Int, Kind::Int]).unwrap();
    let mul = InvocationTarget::from_fn(ty, "mul", |args: &[Value]| {
        Ok(Value::Int(args[0].as_i32().unwrap_or(0) * args[1].as_i32().unwrap_or(0)))
    });
    let boxed = MethodType::generic(2).unwrap();
    let a = adder().as_type(&boxed).unwrap();
    let b = mul.as_type(&boxed).unwrap();
    assert!(a.shares_form_with(&b));
    assert_eq!(a.variant(), TargetVariant::Bound);
}

#[test]
fn test_void_discarding() {
    let add = adder();
    let void_ty = method_type(Kind::Void, &[Kind::Int, Kind::Int]).unwrap();
    assert_eq!(add.invoke(&void_ty, &[Value::Int(1), Value::Int(1)]).unwrap(), Value::Void);
}

// ============================================================================
// variable arity
// ============================================================================

fn varargs_sum() -> InvocationTarget {
    let ints = ClassRef::array_of(&Kind::Int);
    let ty = method_type(Kind::Int, &[Kind::string(), Kind::of(&ints)]).unwrap();
    InvocationTarget::from_fn(ty, "sum", |args: &[Value]| {
        let elements = args[1].array_elements().unwrap_or_default();
        Ok(Value::Int(sum_of(&elements) as i32))
    })
    .as_varargs_collector(&ints)
    .unwrap()
}

#[test]
fn test_collector_gathers_trailing_arguments() {
    let sum = varargs_sum();
    let spread = method_type(Kind::Int, &[Kind::string(), Kind::Int, Kind::Int, Kind::Int]).unwrap();
    let args = [Value::string("n"), Value::Int(1), Value::Int(2), Value::Int(3)];
    assert_eq!(sum.invoke(&spread, &args).unwrap(), Value::Int(6));

    let none = method_type(Kind::Int, &[Kind::string()]).unwrap();
    assert_eq!(sum.invoke(&none, &[Value::string("n")]).unwrap(), Value::Int(0));
}

#[test]
fn test_collector_passes_arrays_pairwise() {
    let sum = varargs_sum();
    let ty = sum.ty().clone();
    let array = Value::array(&Kind::Int, vec![Value::Int(4), Value::Int(5)]);
    assert_eq!(sum.invoke(&ty, &[Value::string("n"), array.clone()]).unwrap(), Value::Int(9));
    assert_eq!(sum.invoke_exact(&ty, &[Value::string("n"), array]).unwrap(), Value::Int(9));
}

#[test]
fn test_invoke_exact_on_collector_never_gathers() {
    let sum = varargs_sum();
    let spread = method_type(Kind::Int, &[Kind::string(), Kind::Int]).unwrap();
    assert!(matches!(
        sum.invoke_exact(&spread, &[Value::string("n"), Value::Int(1)]),
        Err(HandleError::WrongType { .. })
    ));
}

#[test]
fn test_collector_with_boxed_call_site() {
    let sum = varargs_sum();
    let result = sum
        .invoke_with_arguments(&[Value::string("n"), Value::Int(10), Value::Int(20)])
        .unwrap();
    assert_eq!(result, Value::Int(30).boxed());
}

#[test]
fn test_as_collector_requires_assignable_array() {
    let add = adder();
    let ints = ClassRef::array_of(&Kind::Int);
    assert!(matches!(as_collector(&add, &ints, 2), Err(HandleError::IllegalAdaptation(_))));
}
