//! Runtime values
//!
//! Arguments and results flow through invocation targets as [`Value`]s.
//! Primitive values carry their exact kind; references are either null or a
//! shared [`Object`] whose class decides casts and unboxing.

use std::fmt;
use std::sync::Arc;

use invoke_types::{ClassRef, ConversionMode, Kind, ValueConversion};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{HandleError, HandleResult};
use crate::target::InvocationTarget;

/// A single argument or result
#[derive(Clone)]
pub enum Value {
    /// Result of a `void` call
    Void,
    /// Null reference
    Null,
    /// `boolean`
    Boolean(bool),
    /// `byte`
    Byte(i8),
    /// `char`
    Char(u16),
    /// `short`
    Short(i16),
    /// `int`
    Int(i32),
    /// `long`
    Long(i64),
    /// `float`
    Float(f32),
    /// `double`
    Double(f64),
    /// Non-null reference
    Object(Arc<Object>),
}

/// Heap object
#[derive(Debug)]
pub struct Object {
    class: ClassRef,
    body: ObjectBody,
}

/// Payload of a heap object
#[derive(Debug)]
pub enum ObjectBody {
    /// Wrapper around a primitive value
    Boxed(Value),
    /// String contents
    Str(String),
    /// Array elements
    Array(RwLock<Vec<Value>>),
    /// Instance fields of a user class
    Instance(RwLock<FxHashMap<String, Value>>),
    /// Throwable with a message
    Throwable {
        /// Detail message
        message: String,
    },
    /// Class mirror
    Class(ClassRef),
    /// Invocation target used as a value
    Handle(InvocationTarget),
}

impl Object {
    /// Runtime class
    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    /// Payload
    pub fn body(&self) -> &ObjectBody {
        &self.body
    }
}

impl Value {
    fn object(class: ClassRef, body: ObjectBody) -> Value {
        Value::Object(Arc::new(Object { class, body }))
    }

    /// String object
    pub fn string(s: impl Into<String>) -> Value {
        Value::object(ClassRef::string(), ObjectBody::Str(s.into()))
    }

    /// Box a primitive into its wrapper; references pass through unchanged
    pub fn boxed(self) -> Value {
        match self.primitive_kind().and_then(|k| k.wrapper_class()) {
            Some(wrapper) => Value::object(wrapper, ObjectBody::Boxed(self)),
            None => self,
        }
    }

    /// Array object with the given component kind
    pub fn array(component: &Kind, elements: Vec<Value>) -> Value {
        Value::object(
            ClassRef::array_of(component),
            ObjectBody::Array(RwLock::new(elements)),
        )
    }

    /// Fresh instance with no fields set
    pub fn instance(class: &ClassRef) -> Value {
        Value::object(class.clone(), ObjectBody::Instance(RwLock::new(FxHashMap::default())))
    }

    /// Class mirror object
    pub fn class_object(class: &ClassRef) -> Value {
        Value::object(ClassRef::class(), ObjectBody::Class(class.clone()))
    }

    /// Invocation target wrapped as a value
    pub fn handle(target: InvocationTarget) -> Value {
        Value::object(ClassRef::handle(), ObjectBody::Handle(target))
    }

    /// Throwable instance of `class`
    pub fn exception(class: &ClassRef, message: impl Into<String>) -> Value {
        Value::object(
            class.clone(),
            ObjectBody::Throwable {
                message: message.into(),
            },
        )
    }

    /// Zero value of a kind: `0`, `false`, null, or nothing for `void`
    pub fn zero(kind: &Kind) -> Value {
        match kind {
            Kind::Void => Value::Void,
            Kind::Boolean => Value::Boolean(false),
            Kind::Byte => Value::Byte(0),
            Kind::Char => Value::Char(0),
            Kind::Short => Value::Short(0),
            Kind::Int => Value::Int(0),
            Kind::Long => Value::Long(0),
            Kind::Float => Value::Float(0.0),
            Kind::Double => Value::Double(0.0),
            Kind::Ref(_) => Value::Null,
        }
    }

    /// Kind of a primitive value
    pub fn primitive_kind(&self) -> Option<Kind> {
        Some(match self {
            Value::Boolean(_) => Kind::Boolean,
            Value::Byte(_) => Kind::Byte,
            Value::Char(_) => Kind::Char,
            Value::Short(_) => Kind::Short,
            Value::Int(_) => Kind::Int,
            Value::Long(_) => Kind::Long,
            Value::Float(_) => Kind::Float,
            Value::Double(_) => Kind::Double,
            _ => return None,
        })
    }

    /// Runtime class of a non-null reference
    pub fn class(&self) -> Option<&ClassRef> {
        match self {
            Value::Object(obj) => Some(&obj.class),
            _ => None,
        }
    }

    /// Whether this is the null reference
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short description of the value's kind, for error messages
    pub fn kind_name(&self) -> String {
        match self {
            Value::Void => "void".to_string(),
            Value::Null => "null".to_string(),
            Value::Object(obj) => obj.class.name().to_string(),
            other => other.primitive_kind().map(|k| k.to_string()).unwrap_or_default(),
        }
    }

    /// Whether the value may occupy a slot of `kind` without conversion
    pub fn conforms_to(&self, kind: &Kind) -> bool {
        match (self, kind) {
            (Value::Void, Kind::Void) => true,
            (Value::Null, Kind::Ref(_)) => true,
            (Value::Object(obj), Kind::Ref(class)) => class.is_assignable_from(&obj.class),
            (value, kind) => value.primitive_kind().as_ref() == Some(kind),
        }
    }

    /// Convert under `asType` rules into a slot of `kind`
    pub fn coerce_to(self, kind: &Kind) -> HandleResult<Value> {
        let source = match &self {
            Value::Null if kind.is_reference() => return Ok(self),
            Value::Null => {
                return Err(HandleError::NullDereference(format!("cannot convert null to {}", kind)))
            }
            Value::Object(obj) => Kind::Ref(obj.class.clone()),
            Value::Void => Kind::Void,
            other => other.primitive_kind().unwrap_or(Kind::Void),
        };
        match invoke_types::classify_conversion(&source, kind, ConversionMode::Invoke) {
            Some(conversion) => self.apply_conversion(&conversion),
            None => Err(mismatch(kind, &self)),
        }
    }

    /// Apply one conversion step
    pub fn apply_conversion(self, conversion: &ValueConversion) -> HandleResult<Value> {
        match conversion {
            ValueConversion::Identity => Ok(self),
            ValueConversion::Cast(class) => self.cast(class),
            ValueConversion::Primitive { to, .. } => self
                .convert_primitive(to, ConversionMode::ExplicitCast)
                .ok_or_else(|| mismatch(to, &self)),
            ValueConversion::Box { cast, .. } => {
                let boxed = self.boxed();
                match cast {
                    Some(class) => boxed.cast(class),
                    None => Ok(boxed),
                }
            }
            ValueConversion::Unbox { to, mode } => self.unbox(to, *mode),
            ValueConversion::Discard => Ok(Value::Void),
            ValueConversion::Zero(kind) => Ok(Value::zero(kind)),
        }
    }

    fn cast(self, class: &ClassRef) -> HandleResult<Value> {
        match &self {
            Value::Null => Ok(self),
            Value::Object(obj) if class.is_assignable_from(&obj.class) => Ok(self),
            _ => Err(HandleError::TypeMismatch {
                expected: class.name().to_string(),
                found: self.kind_name(),
            }),
        }
    }

    fn unbox(self, to: &Kind, mode: ConversionMode) -> HandleResult<Value> {
        let inner = match &self {
            Value::Null if mode == ConversionMode::ExplicitCast => return Ok(Value::zero(to)),
            Value::Null => {
                return Err(HandleError::NullDereference(format!("cannot unbox null to {}", to)))
            }
            Value::Object(obj) => match &obj.body {
                ObjectBody::Boxed(inner) => inner,
                _ => return Err(mismatch(to, &self)),
            },
            primitive => primitive,
        };
        inner
            .convert_primitive(to, mode)
            .ok_or_else(|| mismatch(to, &self))
    }

    /// Primitive conversion; under `Invoke` rules only widening succeeds
    ///
    /// Explicit conversions treat `boolean` as 0/1 and convert to `boolean`
    /// by testing the low bit.
    fn convert_primitive(&self, to: &Kind, mode: ConversionMode) -> Option<Value> {
        let from = self.primitive_kind()?;
        if !to.is_primitive() {
            return None;
        }
        if mode == ConversionMode::Invoke && !from.is_widening_to(to) {
            return None;
        }
        Some(match (self, to) {
            (Value::Boolean(b), Kind::Boolean) => Value::Boolean(*b),
            (Value::Boolean(b), to) => from_i64(to, *b as i64),
            (Value::Float(v), Kind::Boolean) => Value::Boolean(((*v as i32) & 1) != 0),
            (Value::Double(v), Kind::Boolean) => Value::Boolean(((*v as i32) & 1) != 0),
            (Value::Float(v), to) => from_f64(to, *v as f64),
            (Value::Double(v), to) => from_f64(to, *v),
            (integral, Kind::Boolean) => Value::Boolean((integral.as_i64()? & 1) != 0),
            (integral, to) => from_i64(to, integral.as_i64()?),
        })
    }

    /// `int`-compatible value (also unwraps boxes)
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Byte(v) => Some(*v as i32),
            Value::Char(v) => Some(*v as i32),
            Value::Short(v) => Some(*v as i32),
            Value::Int(v) => Some(*v),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Boxed(inner) => inner.as_i32(),
                _ => None,
            },
            _ => None,
        }
    }

    /// Integral value widened to `long` (also unwraps boxes)
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Boxed(inner) => inner.as_i64(),
                _ => None,
            },
            other => other.as_i32().map(i64::from),
        }
    }

    /// Numeric value widened to `double` (also unwraps boxes)
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Boxed(inner) => inner.as_f64(),
                _ => None,
            },
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// `boolean` value (also unwraps boxes)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Boxed(inner) => inner.as_bool(),
                _ => None,
            },
            _ => None,
        }
    }

    /// String contents
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Str(s) => Some(s),
                _ => None,
            },
            _ => None,
        }
    }

    /// Wrapped invocation target
    pub fn as_handle(&self) -> Option<&InvocationTarget> {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Handle(target) => Some(target),
                _ => None,
            },
            _ => None,
        }
    }

    /// Class behind a class mirror
    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Class(class) => Some(class),
                _ => None,
            },
            _ => None,
        }
    }

    /// Message of a throwable
    pub fn exception_message(&self) -> Option<&str> {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Throwable { message } => Some(message),
                _ => None,
            },
            _ => None,
        }
    }

    /// Copy of an array's elements
    pub fn array_elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Array(elements) => Some(elements.read().clone()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Array length
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Array(elements) => Some(elements.read().len()),
                _ => None,
            },
            _ => None,
        }
    }

    /// Array element at `index`
    pub fn array_get(&self, index: usize) -> HandleResult<Value> {
        let elements = self.array_body("read element of")?;
        let elements = elements.read();
        elements.get(index).cloned().ok_or_else(|| {
            HandleError::IllegalArgument(format!(
                "index {} out of bounds for length {}",
                index,
                elements.len()
            ))
        })
    }

    /// Store an element; the value must conform to the component kind
    pub fn array_set(&self, index: usize, value: Value) -> HandleResult<()> {
        let component = self
            .class()
            .and_then(|c| c.component().cloned())
            .unwrap_or_else(Kind::object);
        if !value.conforms_to(&component) {
            return Err(mismatch(&component, &value));
        }
        let elements = self.array_body("store element into")?;
        let mut elements = elements.write();
        let len = elements.len();
        match elements.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(HandleError::IllegalArgument(format!(
                "index {} out of bounds for length {}",
                index, len
            ))),
        }
    }

    fn array_body(&self, action: &str) -> HandleResult<&RwLock<Vec<Value>>> {
        match self {
            Value::Null => Err(HandleError::NullDereference(format!("{} null array", action))),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Array(elements) => Ok(elements),
                _ => Err(HandleError::TypeMismatch {
                    expected: "array".to_string(),
                    found: obj.class.name().to_string(),
                }),
            },
            other => Err(HandleError::TypeMismatch {
                expected: "array".to_string(),
                found: other.kind_name(),
            }),
        }
    }

    /// Read an instance field; unset fields read as `None`
    pub fn get_field(&self, name: &str) -> HandleResult<Option<Value>> {
        Ok(self.instance_body(name)?.read().get(name).cloned())
    }

    /// Write an instance field
    pub fn set_field(&self, name: &str, value: Value) -> HandleResult<()> {
        self.instance_body(name)?.write().insert(name.to_string(), value);
        Ok(())
    }

    fn instance_body(&self, field: &str) -> HandleResult<&RwLock<FxHashMap<String, Value>>> {
        match self {
            Value::Null => Err(HandleError::NullDereference(format!("field {} of null", field))),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Instance(fields) => Ok(fields),
                _ => Err(HandleError::TypeMismatch {
                    expected: "instance".to_string(),
                    found: obj.class.name().to_string(),
                }),
            },
            other => Err(HandleError::TypeMismatch {
                expected: "instance".to_string(),
                found: other.kind_name(),
            }),
        }
    }
}

fn mismatch(expected: &Kind, found: &Value) -> HandleError {
    HandleError::TypeMismatch {
        expected: format!("{:?}", expected),
        found: found.kind_name(),
    }
}

fn from_i64(to: &Kind, v: i64) -> Value {
    match to {
        Kind::Byte => Value::Byte(v as i8),
        Kind::Char => Value::Char(v as u16),
        Kind::Short => Value::Short(v as i16),
        Kind::Int => Value::Int(v as i32),
        Kind::Long => Value::Long(v),
        Kind::Float => Value::Float(v as f32),
        Kind::Double => Value::Double(v as f64),
        Kind::Boolean => Value::Boolean((v & 1) != 0),
        Kind::Void | Kind::Ref(_) => Value::Void,
    }
}

fn from_f64(to: &Kind, v: f64) -> Value {
    match to {
        Kind::Long => Value::Long(v as i64),
        Kind::Float => Value::Float(v as f32),
        Kind::Double => Value::Double(v),
        // Narrow through int, like the explicit cast rules for sub-int kinds.
        narrow => from_i64(narrow, (v as i32) as i64),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                if Arc::ptr_eq(a, b) {
                    return true;
                }
                match (&a.body, &b.body) {
                    (ObjectBody::Boxed(x), ObjectBody::Boxed(y)) => a.class == b.class && x == y,
                    (ObjectBody::Str(x), ObjectBody::Str(y)) => x == y,
                    (ObjectBody::Class(x), ObjectBody::Class(y)) => x == y,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Null => write!(f, "null"),
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Char(v) => match char::from_u32(*v as u32) {
                Some(c) => write!(f, "{}", c),
                None => write!(f, "\\u{:04x}", v),
            },
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Object(obj) => match &obj.body {
                ObjectBody::Boxed(inner) => write!(f, "{}", inner),
                ObjectBody::Str(s) => write!(f, "{}", s),
                ObjectBody::Array(elements) => {
                    write!(f, "[")?;
                    for (i, e) in elements.read().iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", e)?;
                    }
                    write!(f, "]")
                }
                ObjectBody::Instance(_) => write!(f, "{}@{:x}", obj.class.simple_name(), Arc::as_ptr(obj) as usize),
                ObjectBody::Throwable { message } => write!(f, "{}: {}", obj.class.name(), message),
                ObjectBody::Class(class) => write!(f, "class {}", class.name()),
                ObjectBody::Handle(target) => write!(f, "handle{}", target.ty()),
            },
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Object(obj) => match &obj.body {
                ObjectBody::Str(s) => write!(f, "{:?}", s),
                _ => write!(f, "{}", self),
            },
            Value::Char(v) => write!(f, "char({})", v),
            other => write!(f, "{}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::string(v)
    }
}
