//! Engine boundary
//!
//! The runtime does not execute code itself. An [`Engine`] locates loaded
//! members and hands out [`RawPrimitive`]s that run them given a flat
//! argument list. [`MemberRegistry`] is an in-process engine that dispatches
//! to Rust closures.

mod registry;

pub use registry::MemberRegistry;

use std::sync::Arc;

use crate::error::HandleResult;
use crate::member::{MemberDeclaration, MemberReference, RefKind};
use crate::value::Value;

/// A callable produced by the engine for one resolved member
///
/// Arguments arrive in declaration order with the receiver first for
/// instance members. The argument list has already been checked against the
/// owning target's type.
pub trait RawPrimitive: Send + Sync {
    /// Run the member
    fn call_raw(&self, args: &[Value]) -> HandleResult<Value>;
}

impl<F> RawPrimitive for F
where
    F: Fn(&[Value]) -> HandleResult<Value> + Send + Sync,
{
    fn call_raw(&self, args: &[Value]) -> HandleResult<Value> {
        self(args)
    }
}

/// Execution engine collaborator
pub trait Engine: Send + Sync {
    /// Locate the declaration a symbolic reference names, searching supertypes
    fn resolve_member(&self, reference: &MemberReference) -> Option<MemberDeclaration>;

    /// Produce a raw callable for a resolved member used as `ref_kind`
    fn make_callable(
        &self,
        member: &MemberDeclaration,
        ref_kind: RefKind,
    ) -> HandleResult<Arc<dyn RawPrimitive>>;
}
