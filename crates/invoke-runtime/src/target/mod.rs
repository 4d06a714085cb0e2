//! Invocation targets
//!
//! An [`InvocationTarget`] is a typed callable value. Every target owns an
//! interned [`MethodType`] and a [`CompositionForm`], and is one of three
//! variants:
//!
//! - **Direct** wraps an engine primitive for a resolved member.
//! - **Bound** carries captured values that its (shared) form reads.
//! - **Delegating** forwards to another target under a different type view.
//!
//! Targets are immutable. Combinators and [`InvocationTarget::as_type`]
//! always return new targets; the only mutable state is the single-slot
//! `as_type` memo, the invocation counter and the customized form, all of
//! which are written idempotently.

mod adapt;

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use invoke_types::{ClassRef, Kind, MethodType};
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use smallvec::{smallvec, SmallVec};

use crate::combinators::check_slots;
use crate::config;
use crate::engine::RawPrimitive;
use crate::error::{HandleError, HandleResult};
use crate::form::{cache, CompositionForm, Transform};
use crate::value::Value;

pub(crate) type BoundValues = SmallVec<[Value; 4]>;

/// A typed callable value
#[derive(Clone)]
pub struct InvocationTarget(Arc<TargetCore>);

struct TargetCore {
    ty: MethodType,
    form: Arc<CompositionForm>,
    repr: TargetRepr,
    /// Array class gathered by a variable-arity collector
    varargs: Option<ClassRef>,
    as_type_cache: Mutex<Option<(MethodType, InvocationTarget)>>,
    customized: OnceCell<Arc<CompositionForm>>,
    invocations: AtomicU32,
}

#[derive(Clone)]
enum TargetRepr {
    Direct {
        member: Arc<str>,
        primitive: Arc<dyn RawPrimitive>,
    },
    Bound {
        values: BoundValues,
    },
    Delegating(InvocationTarget),
}

/// Representation of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetVariant {
    /// Engine primitive
    Direct,
    /// Captured values plus a shared form
    Bound,
    /// Type view over another target
    Delegating,
}

impl InvocationTarget {
    fn from_parts(ty: MethodType, form: Arc<CompositionForm>, repr: TargetRepr, varargs: Option<ClassRef>) -> Self {
        InvocationTarget(Arc::new(TargetCore {
            ty,
            form,
            repr,
            varargs,
            as_type_cache: Mutex::new(None),
            customized: OnceCell::new(),
            invocations: AtomicU32::new(0),
        }))
    }

    /// Direct target over an engine primitive
    pub fn direct(ty: MethodType, member: &str, primitive: Arc<dyn RawPrimitive>) -> Self {
        let form = cache::direct_form(ty.basic_type());
        Self::from_parts(
            ty,
            form,
            TargetRepr::Direct {
                member: Arc::from(member),
                primitive,
            },
            None,
        )
    }

    /// Direct target over a Rust closure
    pub fn from_fn<F>(ty: MethodType, member: &str, body: F) -> Self
    where
        F: Fn(&[Value]) -> HandleResult<Value> + Send + Sync + 'static,
    {
        Self::direct(ty, member, Arc::new(body))
    }

    pub(crate) fn bound(ty: MethodType, form: Arc<CompositionForm>, values: BoundValues) -> Self {
        debug_assert_eq!(form.species().len(), values.len());
        Self::from_parts(ty, form, TargetRepr::Bound { values }, None)
    }

    /// View `target` under `ty`, which must have the same basic shape
    pub(crate) fn delegating(ty: MethodType, target: InvocationTarget) -> Self {
        let inner = match &target.0.repr {
            TargetRepr::Delegating(inner) => inner.clone(),
            _ => target,
        };
        let form = cache::delegate_form(ty.basic_type());
        Self::from_parts(ty, form, TargetRepr::Delegating(inner), None)
    }

    /// Type of this target
    pub fn ty(&self) -> &MethodType {
        &self.0.ty
    }

    /// Representation of this target
    pub fn variant(&self) -> TargetVariant {
        match self.0.repr {
            TargetRepr::Direct { .. } => TargetVariant::Direct,
            TargetRepr::Bound { .. } => TargetVariant::Bound,
            TargetRepr::Delegating(_) => TargetVariant::Delegating,
        }
    }

    /// Shared form this target runs
    pub fn form(&self) -> &Arc<CompositionForm> {
        &self.0.form
    }

    /// Whether both targets run the same shared form
    pub fn shares_form_with(&self, other: &InvocationTarget) -> bool {
        Arc::ptr_eq(&self.0.form, &other.0.form)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &InvocationTarget) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Whether this target gathers trailing arguments under `invoke`
    pub fn is_varargs_collector(&self) -> bool {
        self.0.varargs.is_some()
    }

    /// Invoke with the caller's type equal to [`ty`](Self::ty)
    ///
    /// No conversions are performed. Any other call type fails with
    /// [`HandleError::WrongType`], and argument values must already conform
    /// to the parameter kinds.
    pub fn invoke_exact(&self, call_type: &MethodType, args: &[Value]) -> HandleResult<Value> {
        let ty = &self.0.ty;
        if call_type != ty {
            return Err(HandleError::WrongType {
                expected: ty.to_string(),
                found: call_type.to_string(),
            });
        }
        if args.len() != ty.parameter_count() {
            return Err(HandleError::WrongType {
                expected: ty.to_string(),
                found: format!("{} arguments", args.len()),
            });
        }
        for (arg, kind) in args.iter().zip(ty.parameter_array()) {
            if !arg.conforms_to(kind) {
                return Err(HandleError::TypeMismatch {
                    expected: kind.to_string(),
                    found: arg.kind_name(),
                });
            }
        }
        self.invoke_basic(args)
    }

    /// Invoke with `call_type`, adapting through [`as_type`](Self::as_type) when it differs
    pub fn invoke(&self, call_type: &MethodType, args: &[Value]) -> HandleResult<Value> {
        if call_type == &self.0.ty {
            return self.invoke_exact(call_type, args);
        }
        self.as_type(call_type)?.invoke_exact(call_type, args)
    }

    /// Invoke with boxed arguments through the generic `(Object...)Object` shape
    pub fn invoke_with_arguments(&self, args: &[Value]) -> HandleResult<Value> {
        let generic = MethodType::generic(args.len())?;
        let boxed: Vec<Value> = args.iter().cloned().map(Value::boxed).collect();
        self.invoke(&generic, &boxed)
    }

    /// Bind the leading reference parameter to `receiver`
    pub fn bind_to(&self, receiver: Value) -> HandleResult<InvocationTarget> {
        crate::combinators::bind_leading(self, receiver)
    }

    /// Mark as a collector gathering trailing arguments into `array_class`
    pub fn as_varargs_collector(&self, array_class: &ClassRef) -> HandleResult<InvocationTarget> {
        let last = self.0.ty.last_parameter_type().ok_or_else(|| {
            HandleError::IllegalAdaptation(format!("{} has no trailing parameter to collect", self.0.ty))
        })?;
        if !array_class.is_array() || !last.is_assignable_from(&Kind::of(array_class)) {
            return Err(HandleError::IllegalAdaptation(format!(
                "{} cannot collect into {}",
                self.0.ty, array_class
            )));
        }
        if self.0.varargs.as_ref() == Some(array_class) {
            return Ok(self.clone());
        }
        Ok(self.copy_with(Some(array_class.clone())))
    }

    /// Collector over the trailing array parameter, or fixed arity
    pub fn with_varargs(&self, varargs: bool) -> HandleResult<InvocationTarget> {
        if !varargs {
            return Ok(self.as_fixed_arity());
        }
        match self.0.ty.last_parameter_type().and_then(Kind::class) {
            Some(class) if class.is_array() => self.as_varargs_collector(class),
            _ => Err(HandleError::IllegalAdaptation(format!(
                "{} has no trailing array parameter",
                self.0.ty
            ))),
        }
    }

    /// Same target without collector behavior
    pub fn as_fixed_arity(&self) -> InvocationTarget {
        if self.0.varargs.is_none() {
            return self.clone();
        }
        self.copy_with(None)
    }

    /// Whether a customized form is attached
    pub fn is_customized(&self) -> bool {
        self.0.customized.get().is_some()
    }

    /// Attach a form specialized to this target's captured values
    ///
    /// Only bound targets customize; the customized form is private to this
    /// target and never used as the source of an edit.
    pub fn customize(&self) {
        if let TargetRepr::Bound { values } = &self.0.repr {
            self.0.customized.get_or_init(|| {
                let form = Arc::new(self.0.form.customize(values));
                tracing::debug!(target_type = %self.0.ty, form = %form, "target: customized");
                form
            });
        }
    }

    /// Run the form without type checks
    pub(crate) fn invoke_basic(&self, args: &[Value]) -> HandleResult<Value> {
        self.note_invocation();
        let form = self.0.customized.get().unwrap_or(&self.0.form);
        form.interpret(self, args)
    }

    fn note_invocation(&self) {
        let threshold = config::runtime().handles.customize_threshold;
        if threshold < 0 || self.is_customized() || !matches!(self.0.repr, TargetRepr::Bound { .. }) {
            return;
        }
        let count = self.0.invocations.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if i64::from(count) > i64::from(threshold) {
            self.customize();
        }
    }

    /// Shared form and captured values to edit from
    ///
    /// Non-bound targets are captured whole by a reinvoker form.
    pub(crate) fn rebind(&self) -> (Arc<CompositionForm>, BoundValues) {
        match &self.0.repr {
            TargetRepr::Bound { values } => (self.0.form.clone(), values.clone()),
            _ => (
                cache::reinvoker_form(self.0.ty.basic_type()),
                smallvec![Value::handle(self.detached())],
            ),
        }
    }

    /// Derive a bound target of type `ty` by applying `edits` in order
    ///
    /// Each edit may capture one more value, appended to the captured values.
    pub(crate) fn derive(
        &self,
        ty: MethodType,
        edits: Vec<(Transform, Option<Value>)>,
    ) -> HandleResult<InvocationTarget> {
        check_slots(&ty)?;
        let (mut form, mut values) = self.rebind();
        for (transform, captured) in edits {
            form = form.edit(transform);
            values.extend(captured);
        }
        tracing::trace!(from = %self.0.ty, to = %ty, form = %form, "target: derived");
        Ok(Self::bound(ty, form, values))
    }

    /// Copy that shares nothing mutable with this target
    ///
    /// Adapters that end up in this target's `as_type` memo capture a copy,
    /// never the target itself.
    fn detached(&self) -> InvocationTarget {
        self.copy_with(self.0.varargs.clone())
    }

    fn copy_with(&self, varargs: Option<ClassRef>) -> InvocationTarget {
        Self::from_parts(self.0.ty.clone(), self.0.form.clone(), self.0.repr.clone(), varargs)
    }

    pub(crate) fn bound_value(&self, index: usize) -> HandleResult<Value> {
        match &self.0.repr {
            TargetRepr::Bound { values } => values.get(index).cloned().ok_or_else(|| {
                HandleError::IllegalArgument(format!("no captured value at {}", index))
            }),
            _ => Err(HandleError::IllegalArgument(format!(
                "{:?} target has no captured values",
                self.variant()
            ))),
        }
    }

    pub(crate) fn call_primitive(&self, args: &[Value]) -> HandleResult<Value> {
        match &self.0.repr {
            TargetRepr::Direct { primitive, .. } => primitive.call_raw(args),
            _ => Err(HandleError::IllegalArgument(format!(
                "{:?} target has no engine primitive",
                self.variant()
            ))),
        }
    }

    pub(crate) fn delegate(&self) -> HandleResult<&InvocationTarget> {
        match &self.0.repr {
            TargetRepr::Delegating(inner) => Ok(inner),
            _ => Err(HandleError::IllegalArgument(format!(
                "{:?} target has no delegate",
                self.variant()
            ))),
        }
    }
}

impl fmt::Debug for InvocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("InvocationTarget");
        s.field("type", &self.0.ty).field("variant", &self.variant());
        if let TargetRepr::Direct { member, .. } = &self.0.repr {
            s.field("member", member);
        }
        if let Some(array) = &self.0.varargs {
            s.field("varargs", array);
        }
        s.field("form", &format_args!("{}", self.0.form)).finish()
    }
}

impl fmt::Display for InvocationTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle{}", self.0.ty)
    }
}
