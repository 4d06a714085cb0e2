//! Invoke Runtime
//!
//! Typed invocation targets and the machinery around them:
//!
//! - [`target`]: invocation targets, `invoke`/`invoke_exact` and `as_type`
//! - [`form`]: shared composition forms, the form editor and form caches
//! - [`combinators`]: pure target-to-target transformations
//! - [`lookup`]: access-checked resolution of member references
//! - [`engine`]: the boundary to the engine that owns members
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use invoke_runtime::{Lookup, MemberRegistry, Modifiers, Value};
//! use invoke_types::{method_type, ClassRef, Kind};
//!
//! let registry = MemberRegistry::new();
//! let math = ClassRef::builder("app.Math").build();
//! let ty = method_type(Kind::Int, &[Kind::Int, Kind::Int])?;
//! registry.define_method(&math, "add", &ty, Modifiers::public_static(), |args: &[Value]| {
//!     Ok(Value::Int(args[0].as_i32().unwrap_or(0) + args[1].as_i32().unwrap_or(0)))
//! });
//!
//! let lookup = Lookup::new(&math, Arc::new(registry));
//! let add = lookup.resolve_static_invoke(&math, "add", &ty)?;
//! assert_eq!(add.invoke_exact(&ty, &[Value::Int(2), Value::Int(3)])?, Value::Int(5));
//! ```

#![warn(missing_docs)]

pub mod combinators;
pub mod config;
pub mod engine;
pub mod error;
pub mod form;
pub mod lookup;
pub mod member;
pub mod target;
pub mod value;

pub use config::{ConfigError, RuntimeConfig};
pub use engine::{Engine, MemberRegistry, RawPrimitive};
pub use error::{HandleError, HandleResult};
pub use form::{CompositionForm, FormKind, Species};
pub use lookup::{AccessContext, AccessMode, Lookup};
pub use member::{MemberDeclaration, MemberReference, MemberType, Modifiers, RefKind, Visibility, CONSTRUCTOR_NAME};
pub use target::{InvocationTarget, TargetVariant};
pub use value::{Object, ObjectBody, Value};
