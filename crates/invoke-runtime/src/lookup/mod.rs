//! Resolver
//!
//! A [`Lookup`] turns symbolic member references into direct invocation
//! targets on behalf of one [`AccessContext`]. Every resolution runs the same
//! steps: locate the member through the engine, check kind agreement and
//! access, ask the engine for a raw callable, then derive the target type
//! (receiver, constructed type, field shapes) and apply caller binding,
//! protected receiver narrowing and variable-arity marking.

mod access;

pub use access::{AccessContext, AccessMode};

use std::fmt;
use std::sync::Arc;

use invoke_types::{method_type, ClassRef, Kind, MethodType};

use crate::combinators::{bind_leading, insert_arguments};
use crate::config;
use crate::engine::Engine;
use crate::error::{HandleError, HandleResult};
use crate::member::{MemberDeclaration, MemberReference, MemberType, RefKind, Visibility, CONSTRUCTOR_NAME};
use crate::target::InvocationTarget;
use crate::value::Value;

/// Access-checked factory for direct targets
#[derive(Clone)]
pub struct Lookup {
    context: AccessContext,
    engine: Arc<dyn Engine>,
}

impl Lookup {
    /// Lookup for `lookup_class` with the configured default modes
    pub fn new(lookup_class: &ClassRef, engine: Arc<dyn Engine>) -> Self {
        let modes = config::runtime().default_modes().unwrap_or(AccessMode::ALL);
        Self::with_context(AccessContext::new(lookup_class, modes), engine)
    }

    /// Lookup with an explicit context
    pub fn with_context(context: AccessContext, engine: Arc<dyn Engine>) -> Self {
        Self { context, engine }
    }

    /// Fully trusted lookup for the engine's own bootstrap code
    pub fn trusted(engine: Arc<dyn Engine>) -> Self {
        Self::with_context(AccessContext::new(&ClassRef::object(), AccessMode::TRUSTED), engine)
    }

    /// Lookup limited to public members of public classes
    pub fn public(engine: Arc<dyn Engine>) -> Self {
        Self::with_context(AccessContext::new(&ClassRef::object(), AccessMode::PUBLIC), engine)
    }

    /// Access context
    pub fn context(&self) -> &AccessContext {
        &self.context
    }

    /// Class the lookup resolves as
    pub fn lookup_class(&self) -> &ClassRef {
        self.context.lookup_class()
    }

    /// Capabilities
    pub fn modes(&self) -> AccessMode {
        self.context.modes()
    }

    /// Lookup moved to `other` (see [`AccessContext::in_class`])
    pub fn in_class(&self, other: &ClassRef) -> Lookup {
        Self::with_context(self.context.in_class(other), self.engine.clone())
    }

    /// Lookup with `mode` given up (see [`AccessContext::drop_mode`])
    pub fn drop_mode(&self, mode: AccessMode) -> Lookup {
        Self::with_context(self.context.drop_mode(mode), self.engine.clone())
    }

    /// Static method
    pub fn resolve_static_invoke(&self, refc: &ClassRef, name: &str, ty: &MethodType) -> HandleResult<InvocationTarget> {
        self.resolve(&MemberReference::method(refc, name, ty, RefKind::InvokeStatic))
    }

    /// Instance method with virtual dispatch; the receiver comes first
    pub fn resolve_instance_invoke(&self, refc: &ClassRef, name: &str, ty: &MethodType) -> HandleResult<InvocationTarget> {
        let ref_kind = if refc.is_interface() {
            RefKind::InvokeInterface
        } else {
            RefKind::InvokeVirtual
        };
        self.resolve(&MemberReference::method(refc, name, ty, ref_kind))
    }

    /// Constructor; `ty` returns `void` and the target returns the new instance
    pub fn resolve_constructor(&self, refc: &ClassRef, ty: &MethodType) -> HandleResult<InvocationTarget> {
        if !ty.return_type().is_void() {
            return Err(HandleError::NoSuchMember(format!(
                "{}.{}{}: constructors return void",
                refc, CONSTRUCTOR_NAME, ty
            )));
        }
        self.resolve(&MemberReference::method(refc, CONSTRUCTOR_NAME, ty, RefKind::NewInvokeSpecial))
    }

    /// Instance field getter `(refc)kind`
    pub fn resolve_field_get(&self, refc: &ClassRef, name: &str, kind: &Kind) -> HandleResult<InvocationTarget> {
        self.resolve(&MemberReference::field(refc, name, kind, RefKind::GetField))
    }

    /// Static field getter `()kind`
    pub fn resolve_static_field_get(&self, refc: &ClassRef, name: &str, kind: &Kind) -> HandleResult<InvocationTarget> {
        self.resolve(&MemberReference::field(refc, name, kind, RefKind::GetStatic))
    }

    /// Instance field setter `(refc, kind)void`
    pub fn resolve_field_set(&self, refc: &ClassRef, name: &str, kind: &Kind) -> HandleResult<InvocationTarget> {
        self.resolve(&MemberReference::field(refc, name, kind, RefKind::PutField))
    }

    /// Static field setter `(kind)void`
    pub fn resolve_static_field_set(&self, refc: &ClassRef, name: &str, kind: &Kind) -> HandleResult<InvocationTarget> {
        self.resolve(&MemberReference::field(refc, name, kind, RefKind::PutStatic))
    }

    /// Non-virtual call of `refc`'s method on behalf of `special_caller`
    ///
    /// `special_caller` must be the lookup class, the lookup must have
    /// private access, and `special_caller` must be `refc` or a subclass.
    /// The receiver parameter is typed as `special_caller`.
    pub fn resolve_super_invoke(
        &self,
        refc: &ClassRef,
        name: &str,
        ty: &MethodType,
        special_caller: &ClassRef,
    ) -> HandleResult<InvocationTarget> {
        if name == CONSTRUCTOR_NAME {
            return Err(HandleError::NoSuchMember(format!(
                "{}.{}{} cannot be invoked as a super call",
                refc, name, ty
            )));
        }
        if !self.modes().is_trusted()
            && (special_caller != self.lookup_class() || !self.modes().contains(AccessMode::PRIVATE))
        {
            return Err(HandleError::AccessDenied(format!(
                "{} cannot make super calls for {}",
                self.context, special_caller
            )));
        }
        if !refc.is_interface() && special_caller != refc && !special_caller.is_subclass_of(refc) {
            return Err(HandleError::AccessDenied(format!(
                "{} is not a subclass of {}",
                special_caller, refc
            )));
        }
        let reference = MemberReference::method(refc, name, ty, RefKind::InvokeSpecial);
        self.resolve_with(&reference, special_caller)
    }

    /// Resolve any symbolic reference
    ///
    /// Special invocations act on behalf of the lookup class and go through
    /// the same checks as [`resolve_super_invoke`](Self::resolve_super_invoke).
    pub fn resolve(&self, reference: &MemberReference) -> HandleResult<InvocationTarget> {
        if let (RefKind::InvokeSpecial, MemberType::Method(ty)) = (reference.ref_kind, &reference.ty) {
            return self.resolve_super_invoke(&reference.class, &reference.name, ty, self.lookup_class());
        }
        self.resolve_with(reference, self.lookup_class())
    }

    /// Virtual method of `receiver`'s class with the receiver bound
    pub fn bind(&self, receiver: &Value, name: &str, ty: &MethodType) -> HandleResult<InvocationTarget> {
        let class = receiver
            .class()
            .cloned()
            .ok_or_else(|| HandleError::NullDereference(format!("cannot bind {} to {}", name, receiver)))?;
        let target = self.resolve_instance_invoke(&class, name, ty)?;
        let varargs = target.is_varargs_collector();
        let bound = bind_leading(&target.as_fixed_arity(), receiver.clone())?;
        if varargs {
            bound.with_varargs(true)
        } else {
            Ok(bound)
        }
    }

    fn resolve_with(&self, reference: &MemberReference, special_caller: &ClassRef) -> HandleResult<InvocationTarget> {
        let decl = self
            .engine
            .resolve_member(reference)
            .ok_or_else(|| HandleError::NoSuchMember(reference.to_string()))?;
        self.check_kind(reference, &decl)?;
        self.context
            .check_member(&reference.class, &decl)
            .map_err(HandleError::AccessDenied)?;

        let caller_sensitive = decl.modifiers.is_caller_sensitive;
        if caller_sensitive && !self.modes().contains(AccessMode::PRIVATE) && !self.modes().is_trusted() {
            return Err(HandleError::AccessDenied(format!(
                "{} depends on its caller and {} lacks private access",
                decl, self.context
            )));
        }

        let primitive = self.engine.make_callable(&decl, reference.ref_kind)?;
        let ty = self.target_type(reference, &decl, special_caller)?;
        let mut target = InvocationTarget::direct(ty, &decl.to_string(), primitive);

        if caller_sensitive {
            let last = target.ty().parameter_count() - 1;
            target = insert_arguments(&target, last, &[Value::class_object(self.lookup_class())])?;
        }
        let narrowed = self.restricts_receiver(reference, &decl);
        if narrowed {
            let receiver_ty = target
                .ty()
                .change_parameter_type(0, Kind::of(self.lookup_class()))?;
            target = InvocationTarget::delegating(receiver_ty, target);
        }
        if decl.modifiers.is_varargs {
            target = target.with_varargs(true)?;
        }

        tracing::debug!(
            member = %decl,
            ref_kind = ?reference.ref_kind,
            lookup = %self.context,
            ty = %target.ty(),
            caller_sensitive,
            narrowed,
            "lookup: resolved"
        );
        Ok(target)
    }

    fn check_kind(&self, reference: &MemberReference, decl: &MemberDeclaration) -> HandleResult<()> {
        let ref_kind = reference.ref_kind;
        let wants_constructor = ref_kind == RefKind::NewInvokeSpecial;
        let is_field = matches!(decl.ty, MemberType::Field(_));
        if wants_constructor != decl.is_constructor() || ref_kind.is_field() != is_field {
            return Err(HandleError::NoSuchMember(format!("{} used as {:?}", decl, ref_kind)));
        }
        if !decl.is_constructor() && ref_kind.is_static() != decl.modifiers.is_static {
            return Err(HandleError::AccessDenied(format!(
                "expected {} member, found {}",
                if ref_kind.is_static() { "a static" } else { "an instance" },
                decl
            )));
        }
        Ok(())
    }

    /// Type of the direct target for a resolved member
    ///
    /// Receivers come first, constructors return the class, and
    /// caller-sensitive members take the caller class last.
    fn target_type(
        &self,
        reference: &MemberReference,
        decl: &MemberDeclaration,
        special_caller: &ClassRef,
    ) -> HandleResult<MethodType> {
        let refc = &reference.class;
        let ty = match (&decl.ty, reference.ref_kind) {
            (MemberType::Method(mt), RefKind::NewInvokeSpecial) => mt.change_return_type(Kind::of(refc)),
            (MemberType::Method(mt), RefKind::InvokeStatic) => mt.clone(),
            (MemberType::Method(mt), RefKind::InvokeSpecial) => {
                mt.insert_parameter_types(0, &[Kind::of(special_caller)])?
            }
            (MemberType::Method(mt), _) => mt.insert_parameter_types(0, &[Kind::of(refc)])?,
            (MemberType::Field(kind), RefKind::GetField) => method_type(kind.clone(), &[Kind::of(refc)])?,
            (MemberType::Field(kind), RefKind::GetStatic) => method_type(kind.clone(), &[])?,
            (MemberType::Field(kind), RefKind::PutField) => {
                method_type(Kind::Void, &[Kind::of(refc), kind.clone()])?
            }
            (MemberType::Field(kind), _) => method_type(Kind::Void, &[kind.clone()])?,
        };
        if decl.modifiers.is_caller_sensitive {
            return Ok(ty.append_parameter_types(&[Kind::of(&ClassRef::class())])?);
        }
        Ok(ty)
    }

    /// Protected instance members reached from another package may only be
    /// used on instances of the lookup class
    fn restricts_receiver(&self, reference: &MemberReference, decl: &MemberDeclaration) -> bool {
        let lookup = self.lookup_class();
        let declaring = &decl.declaring_class;
        decl.modifiers.visibility == Visibility::Protected
            && reference.ref_kind.has_receiver()
            && reference.ref_kind != RefKind::InvokeSpecial
            && !decl.is_constructor()
            && !self.modes().is_trusted()
            && lookup != declaring
            && !lookup.is_same_package(declaring)
    }
}

impl fmt::Debug for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lookup").field("context", &self.context).finish()
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.context)
    }
}
