//! Base form caches
//!
//! Every base form is built once per key and then shared. The maps are
//! append-only: concurrent first use may build a form twice, but only the
//! first one published is ever handed out.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use invoke_types::{BasicType, Kind, MethodType};
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;

use super::{result_name, Callee, CompositionForm, FormKind, FormOp, Species};
use crate::value::Value;

type FormCache<K> = Lazy<DashMap<K, Arc<CompositionForm>, FxBuildHasher>>;

static DIRECT: FormCache<MethodType> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static DELEGATE: FormCache<MethodType> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static REINVOKER: FormCache<MethodType> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static IDENTITY: FormCache<BasicType> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static CONSTANT: FormCache<BasicType> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static ZERO: FormCache<Kind> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static GUARD: FormCache<(MethodType, usize)> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static CATCH: FormCache<(MethodType, usize)> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static THROW: FormCache<MethodType> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));
static INVOKER: FormCache<(MethodType, bool)> = Lazy::new(|| DashMap::with_hasher(FxBuildHasher));

fn cached<K, F>(cache: &DashMap<K, Arc<CompositionForm>, FxBuildHasher>, key: K, build: F) -> Arc<CompositionForm>
where
    K: Eq + Hash,
    F: FnOnce() -> CompositionForm,
{
    if let Some(found) = cache.get(&key) {
        return found.value().clone();
    }
    let form = Arc::new(build());
    tracing::trace!(form = %form, "form cache: miss");
    cache.entry(key).or_insert(form).value().clone()
}

fn arg_types(basic: &MethodType) -> Vec<BasicType> {
    basic.parameter_array().iter().map(Kind::basic_type).collect()
}

/// Calls the owning direct target's primitive with all arguments
pub fn direct_form(basic: &MethodType) -> Arc<CompositionForm> {
    cached(&DIRECT, basic.clone(), || pass_through(FormKind::Direct, basic, Callee::Member, Species::empty()))
}

/// Forwards all arguments to the owning target's delegate
pub fn delegate_form(basic: &MethodType) -> Arc<CompositionForm> {
    cached(&DELEGATE, basic.clone(), || pass_through(FormKind::Delegate, basic, Callee::Delegate, Species::empty()))
}

/// Calls the target captured in field 0 with all arguments
pub fn reinvoker_form(basic: &MethodType) -> Arc<CompositionForm> {
    cached(&REINVOKER, basic.clone(), || {
        let args = arg_types(basic);
        let n = args.len();
        let ret = basic.return_type().basic_type();
        CompositionForm::new(
            FormKind::Reinvoker,
            &args,
            vec![
                (BasicType::Ref, FormOp::Field(0)),
                (
                    ret,
                    FormOp::Invoke {
                        callee: Callee::Name(n),
                        args: (0..n).collect(),
                    },
                ),
            ],
            result_name(ret, n + 1),
            Species::of(&[BasicType::Ref]),
        )
    })
}

fn pass_through(kind: FormKind, basic: &MethodType, callee: Callee, species: Arc<Species>) -> CompositionForm {
    let args = arg_types(basic);
    let n = args.len();
    let ret = basic.return_type().basic_type();
    CompositionForm::new(
        kind,
        &args,
        vec![(
            ret,
            FormOp::Invoke {
                callee,
                args: (0..n).collect(),
            },
        )],
        result_name(ret, n),
        species,
    )
}

/// Returns its single argument
pub fn identity_form(basic: BasicType) -> Arc<CompositionForm> {
    cached(&IDENTITY, basic, || {
        CompositionForm::new(FormKind::Identity, &[basic], Vec::new(), Some(0), Species::empty())
    })
}

/// Returns the value captured in field 0
pub fn constant_form(basic: BasicType) -> Arc<CompositionForm> {
    cached(&CONSTANT, basic, || {
        CompositionForm::new(
            FormKind::Constant,
            &[],
            vec![(basic, FormOp::Field(0))],
            Some(0),
            Species::of(&[basic]),
        )
    })
}

/// Returns the zero value of a kind (nothing for `void`)
pub fn zero_form(kind: &Kind) -> Arc<CompositionForm> {
    cached(&ZERO, kind.clone(), || {
        if kind.is_void() {
            return CompositionForm::new(FormKind::Zero, &[], Vec::new(), None, Species::empty());
        }
        CompositionForm::new(
            FormKind::Zero,
            &[],
            vec![(kind.basic_type(), FormOp::Constant(Value::zero(kind)))],
            Some(0),
            Species::empty(),
        )
    })
}

/// Fields: test, target, fallback. Calls the test on the leading
/// `test_arity` arguments, then the chosen target on all of them.
pub fn guard_form(basic: &MethodType, test_arity: usize) -> Arc<CompositionForm> {
    cached(&GUARD, (basic.clone(), test_arity), || {
        let args = arg_types(basic);
        let n = args.len();
        let ret = basic.return_type().basic_type();
        CompositionForm::new(
            FormKind::Guard,
            &args,
            vec![
                (BasicType::Ref, FormOp::Field(0)),
                (BasicType::Ref, FormOp::Field(1)),
                (BasicType::Ref, FormOp::Field(2)),
                (
                    BasicType::Int,
                    FormOp::Invoke {
                        callee: Callee::Name(n),
                        args: (0..test_arity).collect(),
                    },
                ),
                (
                    BasicType::Ref,
                    FormOp::Select {
                        test: n + 3,
                        if_true: n + 1,
                        if_false: n + 2,
                    },
                ),
                (
                    ret,
                    FormOp::Invoke {
                        callee: Callee::Name(n + 4),
                        args: (0..n).collect(),
                    },
                ),
            ],
            result_name(ret, n + 5),
            Species::of(&[BasicType::Ref, BasicType::Ref, BasicType::Ref]),
        )
    })
}

/// Fields: target, exception class, handler
pub fn catch_form(basic: &MethodType, handler_args: usize) -> Arc<CompositionForm> {
    cached(&CATCH, (basic.clone(), handler_args), || {
        let args = arg_types(basic);
        let n = args.len();
        let ret = basic.return_type().basic_type();
        CompositionForm::new(
            FormKind::Catch,
            &args,
            vec![
                (BasicType::Ref, FormOp::Field(0)),
                (BasicType::Ref, FormOp::Field(1)),
                (BasicType::Ref, FormOp::Field(2)),
                (
                    ret,
                    FormOp::Catch {
                        target: n,
                        exception: n + 1,
                        handler: n + 2,
                        args: (0..n).collect(),
                        handler_args,
                    },
                ),
            ],
            result_name(ret, n + 3),
            Species::of(&[BasicType::Ref, BasicType::Ref, BasicType::Ref]),
        )
    })
}

/// Throws its single argument
pub fn throw_form(basic: &MethodType) -> Arc<CompositionForm> {
    cached(&THROW, basic.clone(), || {
        CompositionForm::new(
            FormKind::Throw,
            &arg_types(basic),
            vec![(BasicType::Void, FormOp::Throw(0))],
            None,
            Species::empty(),
        )
    })
}

/// Calls the target passed first with the remaining arguments as `ty`
pub fn invoker_form(ty: &MethodType, exact: bool) -> Arc<CompositionForm> {
    cached(&INVOKER, (ty.clone(), exact), || {
        let mut args = vec![BasicType::Ref];
        args.extend(arg_types(ty));
        let n = args.len();
        let ret = ty.return_type().basic_type();
        let callee = if exact {
            Callee::Exact(0, ty.clone())
        } else {
            Callee::Generic(0, ty.clone())
        };
        CompositionForm::new(
            FormKind::Invoker,
            &args,
            vec![(
                ret,
                FormOp::Invoke {
                    callee,
                    args: (1..n).collect(),
                },
            )],
            result_name(ret, n),
            Species::empty(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoke_types::method_type;

    #[test]
    fn test_base_forms_are_shared() {
        let a = method_type(Kind::Int, &[Kind::Boolean, Kind::string()]).unwrap();
        let b = method_type(Kind::Short, &[Kind::Int, Kind::object()]).unwrap();
        assert!(Arc::ptr_eq(
            &direct_form(a.basic_type()),
            &direct_form(b.basic_type())
        ));
        assert!(Arc::ptr_eq(&identity_form(BasicType::Int), &identity_form(BasicType::Int)));
    }

    #[test]
    fn test_reinvoker_layout() {
        let basic = method_type(Kind::Void, &[Kind::Int]).unwrap();
        let form = reinvoker_form(basic.basic_type());
        assert_eq!(form.arity(), 1);
        assert_eq!(form.names().len(), 3);
        assert_eq!(form.result(), None);
        assert_eq!(form.species().key(), "L");
        assert_eq!(form.kind(), FormKind::Reinvoker);
    }

    #[test]
    fn test_guard_layout() {
        let basic = method_type(Kind::object(), &[Kind::object(), Kind::Int]).unwrap();
        let form = guard_form(basic.basic_type(), 1);
        assert_eq!(form.arity(), 2);
        assert_eq!(form.result(), Some(7));
        assert_eq!(form.species().key(), "LLL");
    }
}
