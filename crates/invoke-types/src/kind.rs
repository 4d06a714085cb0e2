//! Value kinds
//!
//! Every parameter and return slot of a method type has a [`Kind`]: `void`,
//! one of the eight primitive kinds, or a reference to a class. Forms only
//! care about the coarser [`BasicType`] of a kind.

use std::fmt;

use crate::class::ClassRef;

/// The kind of a single argument or return value
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Kind {
    /// No value (return position only)
    Void,
    /// `boolean`
    Boolean,
    /// `byte` (signed 8-bit)
    Byte,
    /// `char` (unsigned 16-bit)
    Char,
    /// `short` (signed 16-bit)
    Short,
    /// `int` (signed 32-bit)
    Int,
    /// `long` (signed 64-bit)
    Long,
    /// `float` (IEEE 754 single precision)
    Float,
    /// `double` (IEEE 754 double precision)
    Double,
    /// Reference to an instance of a class (or null)
    Ref(ClassRef),
}

/// Erased kinds used to key composition forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BasicType {
    /// Any reference
    Ref,
    /// `int` and every sub-int primitive (`boolean`, `byte`, `char`, `short`)
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// `void`
    Void,
}

impl BasicType {
    /// Single-letter code, as used in species keys
    pub fn code(self) -> char {
        match self {
            BasicType::Ref => 'L',
            BasicType::Int => 'I',
            BasicType::Long => 'J',
            BasicType::Float => 'F',
            BasicType::Double => 'D',
            BasicType::Void => 'V',
        }
    }

    /// Representative kind for this basic type
    pub fn kind(self) -> Kind {
        match self {
            BasicType::Ref => Kind::object(),
            BasicType::Int => Kind::Int,
            BasicType::Long => Kind::Long,
            BasicType::Float => Kind::Float,
            BasicType::Double => Kind::Double,
            BasicType::Void => Kind::Void,
        }
    }
}

impl Kind {
    /// Reference to the root class
    pub fn object() -> Kind {
        Kind::Ref(ClassRef::object())
    }

    /// Reference to `lang.String`
    pub fn string() -> Kind {
        Kind::Ref(ClassRef::string())
    }

    /// Reference to the given class
    pub fn of(class: &ClassRef) -> Kind {
        Kind::Ref(class.clone())
    }

    /// Reference to the array class with this component kind
    pub fn array_of(component: &Kind) -> Kind {
        Kind::Ref(ClassRef::array_of(component))
    }

    /// Whether this is `void`
    pub fn is_void(&self) -> bool {
        matches!(self, Kind::Void)
    }

    /// Whether this is one of the eight primitive kinds
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Kind::Void | Kind::Ref(_))
    }

    /// Whether this is a reference kind
    pub fn is_reference(&self) -> bool {
        matches!(self, Kind::Ref(_))
    }

    /// Referenced class, for reference kinds
    pub fn class(&self) -> Option<&ClassRef> {
        match self {
            Kind::Ref(class) => Some(class),
            _ => None,
        }
    }

    /// Argument slots taken by a value of this kind
    pub fn slot_count(&self) -> usize {
        match self {
            Kind::Void => 0,
            Kind::Long | Kind::Double => 2,
            _ => 1,
        }
    }

    /// Erased basic type
    pub fn basic_type(&self) -> BasicType {
        match self {
            Kind::Void => BasicType::Void,
            Kind::Boolean | Kind::Byte | Kind::Char | Kind::Short | Kind::Int => BasicType::Int,
            Kind::Long => BasicType::Long,
            Kind::Float => BasicType::Float,
            Kind::Double => BasicType::Double,
            Kind::Ref(_) => BasicType::Ref,
        }
    }

    /// Wrapper class for primitive kinds
    pub fn wrapper_class(&self) -> Option<ClassRef> {
        ClassRef::wrapper_for(self)
    }

    /// Primitive kind boxed by a wrapper reference kind
    pub fn unwrapped(&self) -> Option<Kind> {
        self.class().and_then(|c| c.wrapped_primitive().cloned())
    }

    /// Primitive widening (identity included) from `self` to `to`
    pub fn is_widening_to(&self, to: &Kind) -> bool {
        use Kind::*;
        if self == to {
            return self.is_primitive();
        }
        matches!(
            (self, to),
            (Byte, Short | Int | Long | Float | Double)
                | (Short, Int | Long | Float | Double)
                | (Char, Int | Long | Float | Double)
                | (Int, Long | Float | Double)
                | (Long, Float | Double)
                | (Float, Double)
        )
    }

    /// Whether a value of kind `other` can be stored in a slot of this kind without conversion
    pub fn is_assignable_from(&self, other: &Kind) -> bool {
        match (self, other) {
            (Kind::Ref(mine), Kind::Ref(theirs)) => mine.is_assignable_from(theirs),
            _ => self == other,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Void => write!(f, "void"),
            Kind::Boolean => write!(f, "boolean"),
            Kind::Byte => write!(f, "byte"),
            Kind::Char => write!(f, "char"),
            Kind::Short => write!(f, "short"),
            Kind::Int => write!(f, "int"),
            Kind::Long => write!(f, "long"),
            Kind::Float => write!(f, "float"),
            Kind::Double => write!(f, "double"),
            Kind::Ref(class) => write!(f, "{}", class.simple_name()),
        }
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::Ref(class) => write!(f, "{}", class.name()),
            other => fmt::Display::fmt(other, f),
        }
    }
}
