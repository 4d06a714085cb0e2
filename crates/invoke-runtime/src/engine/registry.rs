//! In-process member registry

use std::sync::Arc;

use dashmap::DashMap;
use invoke_types::{ClassRef, Kind, MethodType};
use rustc_hash::FxBuildHasher;

use super::{Engine, RawPrimitive};
use crate::error::{HandleError, HandleResult};
use crate::member::{
    MemberDeclaration, MemberReference, MemberType, Modifiers, RefKind, CONSTRUCTOR_NAME,
};
use crate::value::Value;

type MemberKey = (ClassRef, String);

#[derive(Clone)]
struct RegisteredMember {
    decl: MemberDeclaration,
    body: MemberBody,
}

#[derive(Clone)]
enum MemberBody {
    Code(Arc<dyn RawPrimitive>),
    Field,
}

/// Engine backed by Rust closures
///
/// Methods receive their receiver (if any) as the first argument.
/// Constructors receive the freshly allocated instance first and their
/// result is ignored. Instance fields live on the objects themselves; static
/// fields live in the registry. Unset fields read as the zero value.
#[derive(Clone, Default)]
pub struct MemberRegistry {
    members: Arc<DashMap<MemberKey, Vec<RegisteredMember>, FxBuildHasher>>,
    statics: Arc<DashMap<MemberKey, Value, FxBuildHasher>>,
}

impl MemberRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a method implementation
    pub fn define_method<F>(
        &self,
        class: &ClassRef,
        name: &str,
        ty: &MethodType,
        modifiers: Modifiers,
        body: F,
    ) where
        F: Fn(&[Value]) -> HandleResult<Value> + Send + Sync + 'static,
    {
        self.insert(
            class,
            name,
            MemberType::Method(ty.clone()),
            modifiers,
            MemberBody::Code(Arc::new(body)),
        );
    }

    /// Register a constructor; `ty` lists the parameters and returns `void`
    pub fn define_constructor<F>(&self, class: &ClassRef, ty: &MethodType, modifiers: Modifiers, init: F)
    where
        F: Fn(&[Value]) -> HandleResult<Value> + Send + Sync + 'static,
    {
        self.insert(
            class,
            CONSTRUCTOR_NAME,
            MemberType::Method(ty.clone()),
            modifiers,
            MemberBody::Code(Arc::new(init)),
        );
    }

    /// Register a field
    pub fn define_field(&self, class: &ClassRef, name: &str, kind: &Kind, modifiers: Modifiers) {
        self.insert(class, name, MemberType::Field(kind.clone()), modifiers, MemberBody::Field);
    }

    fn insert(
        &self,
        class: &ClassRef,
        name: &str,
        ty: MemberType,
        modifiers: Modifiers,
        body: MemberBody,
    ) {
        let decl = MemberDeclaration {
            declaring_class: class.clone(),
            name: name.to_string(),
            ty,
            modifiers,
        };
        tracing::debug!(member = %decl, "registry: define");
        let mut entry = self.members.entry((class.clone(), name.to_string())).or_default();
        entry.retain(|m| m.decl.ty != decl.ty);
        entry.push(RegisteredMember { decl, body });
    }

    /// Current value of a static field
    pub fn static_value(&self, class: &ClassRef, name: &str) -> Option<Value> {
        self.statics
            .get(&(class.clone(), name.to_string()))
            .map(|entry| entry.value().clone())
    }

    /// Number of registered members
    pub fn len(&self) -> usize {
        self.members.iter().map(|entry| entry.value().len()).sum()
    }

    /// Whether nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find_declared(&self, class: &ClassRef, name: &str, ty: &MemberType) -> Option<RegisteredMember> {
        let entry = self.members.get(&(class.clone(), name.to_string()))?;
        entry.value().iter().find(|m| &m.decl.ty == ty).cloned()
    }

    fn find_in_hierarchy(&self, class: &ClassRef, name: &str, ty: &MemberType) -> Option<RegisteredMember> {
        if let Some(found) = self.find_declared(class, name, ty) {
            return Some(found);
        }
        if let Some(found) = class
            .superclass()
            .and_then(|sup| self.find_in_hierarchy(sup, name, ty))
        {
            return Some(found);
        }
        class
            .interfaces()
            .iter()
            .find_map(|iface| self.find_in_hierarchy(iface, name, ty))
    }

    fn virtual_call(&self, decl: &MemberDeclaration, fallback: Arc<dyn RawPrimitive>) -> Arc<dyn RawPrimitive> {
        let registry = self.clone();
        let name = decl.name.clone();
        let ty = decl.ty.clone();
        Arc::new(move |args: &[Value]| -> HandleResult<Value> {
            let class = match args.first() {
                Some(Value::Object(obj)) => obj.class().clone(),
                _ => {
                    return Err(HandleError::NullDereference(format!(
                        "cannot invoke {} on null",
                        name
                    )))
                }
            };
            let body = match registry.find_in_hierarchy(&class, &name, &ty).map(|m| m.body) {
                Some(MemberBody::Code(body)) => body,
                _ => fallback.clone(),
            };
            body.call_raw(args)
        })
    }

    fn allocating_call(&self, class: &ClassRef, init: Arc<dyn RawPrimitive>) -> Arc<dyn RawPrimitive> {
        let class = class.clone();
        Arc::new(move |args: &[Value]| -> HandleResult<Value> {
            let instance = Value::instance(&class);
            let mut init_args = Vec::with_capacity(args.len() + 1);
            init_args.push(instance.clone());
            init_args.extend_from_slice(args);
            init.call_raw(&init_args)?;
            Ok(instance)
        })
    }

    fn field_access(&self, decl: &MemberDeclaration, kind: Kind, ref_kind: RefKind) -> HandleResult<Arc<dyn RawPrimitive>> {
        let name = decl.name.clone();
        let key: MemberKey = (decl.declaring_class.clone(), decl.name.clone());
        let statics = self.statics.clone();
        let access: Arc<dyn RawPrimitive> = match ref_kind {
            RefKind::GetField => Arc::new(move |args: &[Value]| -> HandleResult<Value> {
                let receiver = args.first().cloned().unwrap_or(Value::Null);
                Ok(receiver.get_field(&name)?.unwrap_or_else(|| Value::zero(&kind)))
            }),
            RefKind::PutField => Arc::new(move |args: &[Value]| -> HandleResult<Value> {
                let receiver = args.first().cloned().unwrap_or(Value::Null);
                let value = args.get(1).cloned().unwrap_or_else(|| Value::zero(&kind));
                receiver.set_field(&name, value)?;
                Ok(Value::Void)
            }),
            RefKind::GetStatic => Arc::new(move |_args: &[Value]| -> HandleResult<Value> {
                Ok(statics
                    .get(&key)
                    .map(|entry| entry.value().clone())
                    .unwrap_or_else(|| Value::zero(&kind)))
            }),
            RefKind::PutStatic => Arc::new(move |args: &[Value]| -> HandleResult<Value> {
                let value = args.first().cloned().unwrap_or_else(|| Value::zero(&kind));
                statics.insert(key.clone(), value);
                Ok(Value::Void)
            }),
            other => {
                return Err(HandleError::IllegalArgument(format!(
                    "field {} cannot be used as {:?}",
                    decl, other
                )))
            }
        };
        Ok(access)
    }
}

impl Engine for MemberRegistry {
    fn resolve_member(&self, reference: &MemberReference) -> Option<MemberDeclaration> {
        let found = if reference.name == CONSTRUCTOR_NAME {
            self.find_declared(&reference.class, &reference.name, &reference.ty)
        } else {
            self.find_in_hierarchy(&reference.class, &reference.name, &reference.ty)
        };
        found.map(|m| m.decl)
    }

    fn make_callable(
        &self,
        member: &MemberDeclaration,
        ref_kind: RefKind,
    ) -> HandleResult<Arc<dyn RawPrimitive>> {
        let registered = self
            .find_declared(&member.declaring_class, &member.name, &member.ty)
            .ok_or_else(|| HandleError::NoSuchMember(member.to_string()))?;
        match (registered.body, &member.ty) {
            (MemberBody::Field, MemberType::Field(kind)) => self.field_access(member, kind.clone(), ref_kind),
            (MemberBody::Code(body), _) => match ref_kind {
                RefKind::InvokeVirtual | RefKind::InvokeInterface => Ok(self.virtual_call(member, body)),
                RefKind::NewInvokeSpecial => Ok(self.allocating_call(&member.declaring_class, body)),
                RefKind::InvokeStatic | RefKind::InvokeSpecial => Ok(body),
                other => Err(HandleError::IllegalArgument(format!(
                    "method {} cannot be used as {:?}",
                    member, other
                ))),
            },
            (MemberBody::Field, MemberType::Method(_)) => {
                Err(HandleError::NoSuchMember(member.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoke_types::method_type;

    fn describe(_args: &[Value]) -> HandleResult<Value> {
        Ok(Value::string("base"))
    }

    #[test]
    fn test_resolve_inherited_member() {
        let registry = MemberRegistry::new();
        let base = ClassRef::builder("app.Base").build();
        let derived = ClassRef::builder("app.Derived").extends(&base).build();
        let ty = method_type(Kind::string(), &[]).unwrap();
        registry.define_method(&base, "describe", &ty, Modifiers::public(), describe);

        let reference = MemberReference::method(&derived, "describe", &ty, RefKind::InvokeVirtual);
        let decl = registry.resolve_member(&reference).unwrap();
        assert_eq!(decl.declaring_class, base);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_constructors_are_not_inherited() {
        let registry = MemberRegistry::new();
        let base = ClassRef::builder("app.Base").build();
        let derived = ClassRef::builder("app.Derived").extends(&base).build();
        let ty = method_type(Kind::Void, &[]).unwrap();
        registry.define_constructor(&base, &ty, Modifiers::public(), |_args: &[Value]| Ok(Value::Void));

        let reference = MemberReference::method(&derived, CONSTRUCTOR_NAME, &ty, RefKind::NewInvokeSpecial);
        assert!(registry.resolve_member(&reference).is_none());
    }

    #[test]
    fn test_virtual_dispatch_uses_receiver_class() {
        let registry = MemberRegistry::new();
        let base = ClassRef::builder("app.Base").build();
        let derived = ClassRef::builder("app.Derived").extends(&base).build();
        let ty = method_type(Kind::string(), &[]).unwrap();
        registry.define_method(&base, "describe", &ty, Modifiers::public(), describe);
        registry.define_method(&derived, "describe", &ty, Modifiers::public(), |_args: &[Value]| {
            Ok(Value::string("derived"))
        });

        let decl = registry
            .resolve_member(&MemberReference::method(&base, "describe", &ty, RefKind::InvokeVirtual))
            .unwrap();
        let virt = registry.make_callable(&decl, RefKind::InvokeVirtual).unwrap();
        let special = registry.make_callable(&decl, RefKind::InvokeSpecial).unwrap();
        let receiver = Value::instance(&derived);

        assert_eq!(virt.call_raw(&[receiver.clone()]).unwrap(), Value::string("derived"));
        assert_eq!(special.call_raw(&[receiver]).unwrap(), Value::string("base"));
        assert!(matches!(
            virt.call_raw(&[Value::Null]),
            Err(HandleError::NullDereference(_))
        ));
    }

    #[test]
    fn test_static_field_storage() {
        let registry = MemberRegistry::new();
        let holder = ClassRef::builder("app.Holder").build();
        registry.define_field(&holder, "count", &Kind::Int, Modifiers::public_static());
        let reference = MemberReference::field(&holder, "count", &Kind::Int, RefKind::GetStatic);
        let decl = registry.resolve_member(&reference).unwrap();

        let get = registry.make_callable(&decl, RefKind::GetStatic).unwrap();
        let put = registry.make_callable(&decl, RefKind::PutStatic).unwrap();
        assert_eq!(get.call_raw(&[]).unwrap(), Value::Int(0));
        put.call_raw(&[Value::Int(12)]).unwrap();
        assert_eq!(get.call_raw(&[]).unwrap(), Value::Int(12));
        assert_eq!(registry.static_value(&holder, "count"), Some(Value::Int(12)));
    }
}
