//! Symbolic member references and resolved declarations

use std::fmt;

use invoke_types::{ClassRef, Kind, MethodType};

/// Name under which constructors are declared
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// How a symbolic reference intends to use its member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    /// Read an instance field
    GetField,
    /// Read a static field
    GetStatic,
    /// Write an instance field
    PutField,
    /// Write a static field
    PutStatic,
    /// Call an instance method with virtual dispatch
    InvokeVirtual,
    /// Call a static method
    InvokeStatic,
    /// Call an instance method without virtual dispatch
    InvokeSpecial,
    /// Allocate and initialize a new instance
    NewInvokeSpecial,
    /// Call an interface method
    InvokeInterface,
}

impl RefKind {
    /// Whether the reference expects a static member
    pub fn is_static(self) -> bool {
        matches!(self, RefKind::GetStatic | RefKind::PutStatic | RefKind::InvokeStatic)
    }

    /// Whether the reference targets a field
    pub fn is_field(self) -> bool {
        matches!(
            self,
            RefKind::GetField | RefKind::GetStatic | RefKind::PutField | RefKind::PutStatic
        )
    }

    /// Whether the produced target takes a receiver as its first argument
    pub fn has_receiver(self) -> bool {
        matches!(
            self,
            RefKind::GetField
                | RefKind::PutField
                | RefKind::InvokeVirtual
                | RefKind::InvokeSpecial
                | RefKind::InvokeInterface
        )
    }
}

/// Declared signature of a member
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberType {
    /// Method or constructor signature (constructors return `void`)
    Method(MethodType),
    /// Field kind
    Field(Kind),
}

impl fmt::Display for MemberType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberType::Method(ty) => write!(f, "{}", ty),
            MemberType::Field(kind) => write!(f, "{}", kind),
        }
    }
}

/// Declared visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Accessible everywhere
    Public,
    /// Accessible from the package and from subclasses
    Protected,
    /// Accessible from the package
    Package,
    /// Accessible from the declaring class and its nestmates
    Private,
}

/// Declared modifiers of a member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Modifiers {
    /// Visibility
    pub visibility: Visibility,
    /// Static member
    pub is_static: bool,
    /// Trailing array parameter collects a variable number of arguments
    pub is_varargs: bool,
    /// Behavior depends on the class that resolved the member
    pub is_caller_sensitive: bool,
}

impl Modifiers {
    /// Modifiers with the given visibility and nothing else set
    pub const fn new(visibility: Visibility) -> Self {
        Self {
            visibility,
            is_static: false,
            is_varargs: false,
            is_caller_sensitive: false,
        }
    }

    /// Public instance member
    pub const fn public() -> Self {
        Self::new(Visibility::Public)
    }

    /// Public static member
    pub const fn public_static() -> Self {
        Self::public().with_static()
    }

    /// Mark static
    pub const fn with_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Mark variable-arity
    pub const fn with_varargs(mut self) -> Self {
        self.is_varargs = true;
        self
    }

    /// Mark caller-sensitive
    pub const fn with_caller_sensitive(mut self) -> Self {
        self.is_caller_sensitive = true;
        self
    }
}

/// Symbolic reference to a member, as written at a use site
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MemberReference {
    /// Referenced class (lookup starts here)
    pub class: ClassRef,
    /// Member name
    pub name: String,
    /// Expected signature
    pub ty: MemberType,
    /// Intended use
    pub ref_kind: RefKind,
}

impl MemberReference {
    /// Build a method or constructor reference
    pub fn method(class: &ClassRef, name: &str, ty: &MethodType, ref_kind: RefKind) -> Self {
        Self {
            class: class.clone(),
            name: name.to_string(),
            ty: MemberType::Method(ty.clone()),
            ref_kind,
        }
    }

    /// Build a field reference
    pub fn field(class: &ClassRef, name: &str, kind: &Kind, ref_kind: RefKind) -> Self {
        Self {
            class: class.clone(),
            name: name.to_string(),
            ty: MemberType::Field(kind.clone()),
            ref_kind,
        }
    }
}

impl fmt::Display for MemberReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.class.name(), self.name, self.ty)
    }
}

/// A loaded member as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDeclaration {
    /// Class that declares the member
    pub declaring_class: ClassRef,
    /// Member name
    pub name: String,
    /// Declared signature
    pub ty: MemberType,
    /// Declared modifiers
    pub modifiers: Modifiers,
}

impl MemberDeclaration {
    /// Whether this is a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

impl fmt::Display for MemberDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.declaring_class.name(), self.name, self.ty)
    }
}
