//! Class identities
//!
//! A [`ClassRef`] names a reference type. Two class references are the same
//! class only if they point at the same definition: identity, not name
//! equality, decides assignability and descriptor interning. Built-in classes
//! live in the `lang` package and are created once per process.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;

use crate::error::TypeError;
use crate::kind::Kind;

/// Shared handle to a class definition, compared by identity
#[derive(Clone)]
pub struct ClassRef(Arc<ClassInfo>);

/// Class definition data
struct ClassInfo {
    name: String,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    is_public: bool,
    is_interface: bool,
    nest_host: Option<ClassRef>,
    /// Element kind for array classes
    component: Option<Kind>,
    /// Primitive kind boxed by a wrapper class
    wrapped: Option<Kind>,
}

struct BuiltinClasses {
    object: ClassRef,
    string: ClassRef,
    number: ClassRef,
    class: ClassRef,
    throwable: ClassRef,
    exception: ClassRef,
    runtime_exception: ClassRef,
    handle: ClassRef,
    boolean: ClassRef,
    byte: ClassRef,
    character: ClassRef,
    short: ClassRef,
    integer: ClassRef,
    long: ClassRef,
    float: ClassRef,
    double: ClassRef,
}

fn builtin(name: &str, superclass: Option<&ClassRef>, wrapped: Option<Kind>) -> ClassRef {
    ClassRef(Arc::new(ClassInfo {
        name: name.to_string(),
        superclass: superclass.cloned(),
        interfaces: Vec::new(),
        is_public: true,
        is_interface: false,
        nest_host: None,
        component: None,
        wrapped,
    }))
}

static BUILTINS: Lazy<BuiltinClasses> = Lazy::new(|| {
    let object = builtin("lang.Object", None, None);
    let number = builtin("lang.Number", Some(&object), None);
    let throwable = builtin("lang.Throwable", Some(&object), None);
    let exception = builtin("lang.Exception", Some(&throwable), None);
    BuiltinClasses {
        string: builtin("lang.String", Some(&object), None),
        class: builtin("lang.Class", Some(&object), None),
        runtime_exception: builtin("lang.RuntimeException", Some(&exception), None),
        handle: builtin("lang.Handle", Some(&object), None),
        boolean: builtin("lang.Boolean", Some(&object), Some(Kind::Boolean)),
        character: builtin("lang.Character", Some(&object), Some(Kind::Char)),
        byte: builtin("lang.Byte", Some(&number), Some(Kind::Byte)),
        short: builtin("lang.Short", Some(&number), Some(Kind::Short)),
        integer: builtin("lang.Integer", Some(&number), Some(Kind::Int)),
        long: builtin("lang.Long", Some(&number), Some(Kind::Long)),
        float: builtin("lang.Float", Some(&number), Some(Kind::Float)),
        double: builtin("lang.Double", Some(&number), Some(Kind::Double)),
        throwable,
        exception,
        number,
        object,
    }
});

/// Array classes, one per component kind
static ARRAY_CLASSES: Lazy<DashMap<Kind, ClassRef, FxBuildHasher>> =
    Lazy::new(|| DashMap::with_hasher(FxBuildHasher));

impl ClassRef {
    /// Start defining a new class
    pub fn builder(name: impl Into<String>) -> ClassBuilder {
        ClassBuilder::new(name.into())
    }

    /// The root reference class
    pub fn object() -> ClassRef {
        BUILTINS.object.clone()
    }

    /// `lang.String`
    pub fn string() -> ClassRef {
        BUILTINS.string.clone()
    }

    /// `lang.Number`, superclass of the numeric wrappers
    pub fn number() -> ClassRef {
        BUILTINS.number.clone()
    }

    /// `lang.Class`, the class of class mirrors
    pub fn class() -> ClassRef {
        BUILTINS.class.clone()
    }

    /// `lang.Throwable`, root of everything that can be thrown
    pub fn throwable() -> ClassRef {
        BUILTINS.throwable.clone()
    }

    /// `lang.Exception`
    pub fn exception() -> ClassRef {
        BUILTINS.exception.clone()
    }

    /// `lang.RuntimeException`
    pub fn runtime_exception() -> ClassRef {
        BUILTINS.runtime_exception.clone()
    }

    /// `lang.Handle`, the class of invocation targets seen as values
    pub fn handle() -> ClassRef {
        BUILTINS.handle.clone()
    }

    /// Wrapper class for a primitive kind
    pub fn wrapper_for(kind: &Kind) -> Option<ClassRef> {
        let b = &*BUILTINS;
        let class = match kind {
            Kind::Boolean => &b.boolean,
            Kind::Byte => &b.byte,
            Kind::Char => &b.character,
            Kind::Short => &b.short,
            Kind::Int => &b.integer,
            Kind::Long => &b.long,
            Kind::Float => &b.float,
            Kind::Double => &b.double,
            Kind::Void | Kind::Ref(_) => return None,
        };
        Some(class.clone())
    }

    /// The array class with the given component kind
    ///
    /// # Panics
    ///
    /// Panics if `component` is `void`.
    pub fn array_of(component: &Kind) -> ClassRef {
        assert!(!component.is_void(), "array component cannot be void");
        if let Some(existing) = ARRAY_CLASSES.get(component) {
            return existing.value().clone();
        }
        let (name, is_public) = match component {
            Kind::Ref(c) => (format!("{}[]", c.name()), c.is_public()),
            other => (format!("{}[]", other), true),
        };
        let class = ClassRef(Arc::new(ClassInfo {
            name,
            superclass: Some(ClassRef::object()),
            interfaces: Vec::new(),
            is_public,
            is_interface: false,
            nest_host: None,
            component: Some(component.clone()),
            wrapped: None,
        }));
        ARRAY_CLASSES
            .entry(component.clone())
            .or_insert(class)
            .value()
            .clone()
    }

    /// Fully qualified name (`pkg.Name`)
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Simple name without the package prefix
    pub fn simple_name(&self) -> &str {
        match self.0.name.rsplit_once('.') {
            Some((_, simple)) => simple,
            None => &self.0.name,
        }
    }

    /// Package name; arrays live in their component's package
    pub fn package(&self) -> &str {
        if let Some(Kind::Ref(component)) = &self.0.component {
            return component.package();
        }
        if self.0.component.is_some() {
            return "lang";
        }
        match self.0.name.rsplit_once('.') {
            Some((package, _)) => package,
            None => "",
        }
    }

    /// Direct superclass, `None` for the root class and interfaces
    pub fn superclass(&self) -> Option<&ClassRef> {
        self.0.superclass.as_ref()
    }

    /// Directly implemented (or extended, for interfaces) interfaces
    pub fn interfaces(&self) -> &[ClassRef] {
        &self.0.interfaces
    }

    /// Whether the class is visible outside its package
    pub fn is_public(&self) -> bool {
        self.0.is_public
    }

    /// Whether this is an interface
    pub fn is_interface(&self) -> bool {
        self.0.is_interface
    }

    /// Whether this is the root reference class
    pub fn is_object(&self) -> bool {
        Arc::ptr_eq(&self.0, &BUILTINS.object.0)
    }

    /// Whether this is an array class
    pub fn is_array(&self) -> bool {
        self.0.component.is_some()
    }

    /// Element kind of an array class
    pub fn component(&self) -> Option<&Kind> {
        self.0.component.as_ref()
    }

    /// Element kind, failing for non-array classes
    pub fn component_type(&self) -> Result<&Kind, TypeError> {
        self.component().ok_or_else(|| TypeError::NotAnArray {
            class: self.name().to_string(),
        })
    }

    /// Primitive kind wrapped by this class, if it is a wrapper
    pub fn wrapped_primitive(&self) -> Option<&Kind> {
        self.0.wrapped.as_ref()
    }

    /// Nest host: the class that owns private access for a group of nested classes
    pub fn nest_host(&self) -> &ClassRef {
        self.0.nest_host.as_ref().unwrap_or(self)
    }

    /// Whether both classes share a nest host
    pub fn is_nestmate_of(&self, other: &ClassRef) -> bool {
        self.nest_host() == other.nest_host()
    }

    /// Whether both classes live in the same package
    pub fn is_same_package(&self, other: &ClassRef) -> bool {
        self.package() == other.package()
    }

    /// Whether `self` is `other` or one of its supertypes
    pub fn is_assignable_from(&self, other: &ClassRef) -> bool {
        if self == other || self.is_object() {
            return true;
        }
        if let (Some(mine), Some(theirs)) = (self.component(), other.component()) {
            return match (mine, theirs) {
                (Kind::Ref(mine), Kind::Ref(theirs)) => mine.is_assignable_from(theirs),
                _ => false,
            };
        }
        other.has_supertype(self)
    }

    /// Whether `self` equals or inherits from `other` (classes and interfaces)
    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        other.is_assignable_from(self)
    }

    fn has_supertype(&self, target: &ClassRef) -> bool {
        if let Some(superclass) = &self.0.superclass {
            if superclass == target || superclass.has_supertype(target) {
                return true;
            }
        }
        self.0
            .interfaces
            .iter()
            .any(|i| i == target || i.has_supertype(target))
    }

    /// Pointer identity, usable as a stable key
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class {}", self.0.name)
    }
}

/// Builder for user-defined classes
#[derive(Debug)]
pub struct ClassBuilder {
    name: String,
    superclass: Option<ClassRef>,
    interfaces: Vec<ClassRef>,
    is_public: bool,
    is_interface: bool,
    nest_host: Option<ClassRef>,
}

impl ClassBuilder {
    fn new(name: String) -> Self {
        Self {
            name,
            superclass: None,
            interfaces: Vec::new(),
            is_public: true,
            is_interface: false,
            nest_host: None,
        }
    }

    /// Set the superclass (defaults to the root class)
    pub fn extends(mut self, superclass: &ClassRef) -> Self {
        self.superclass = Some(superclass.clone());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: &ClassRef) -> Self {
        self.interfaces.push(interface.clone());
        self
    }

    /// Make the class package-private
    pub fn package_private(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// Define an interface instead of a class
    pub fn interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    /// Nest this class inside `host` for private access purposes
    pub fn nested_in(mut self, host: &ClassRef) -> Self {
        self.nest_host = Some(host.nest_host().clone());
        self
    }

    /// Finish the definition
    pub fn build(self) -> ClassRef {
        let superclass = match (self.superclass, self.is_interface) {
            (Some(sup), _) => Some(sup),
            (None, true) => None,
            (None, false) => Some(ClassRef::object()),
        };
        ClassRef(Arc::new(ClassInfo {
            name: self.name,
            superclass,
            interfaces: self.interfaces,
            is_public: self.is_public,
            is_interface: self.is_interface,
            nest_host: self.nest_host,
            component: None,
            wrapped: None,
        }))
    }
}
