//! Interned method types
//!
//! A [`MethodType`] is the shape of an invocation target: an ordered list of
//! parameter kinds plus one return kind. Method types are interned in a
//! process-wide table, so two structurally equal types are always the same
//! object and equality is a pointer comparison. The table is append-only and
//! never evicts.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::{Lazy, OnceCell};
use rustc_hash::FxBuildHasher;

use crate::conversion::{classify_conversion, ConversionMode};
use crate::error::TypeError;
use crate::kind::Kind;

/// Maximum number of argument slots a method type may use
pub const MAX_SLOTS: usize = 255;

/// Maximum argument slots for a composed target (one slot is reserved for the target itself)
pub const MAX_TARGET_SLOTS: usize = MAX_SLOTS - 1;

/// Interned method type; cheap to clone, compared by identity
#[derive(Clone)]
pub struct MethodType(Arc<MethodTypeData>);

struct MethodTypeData {
    rtype: Kind,
    ptypes: Box<[Kind]>,
    slots: usize,
    basic: OnceCell<MethodType>,
}

type MethodTypeKey = (Kind, Box<[Kind]>);

static METHOD_TYPES: Lazy<DashMap<MethodTypeKey, MethodType, FxBuildHasher>> =
    Lazy::new(|| DashMap::with_hasher(FxBuildHasher));

/// Build (or find) the interned method type `(ptypes)rtype`
pub fn method_type(rtype: Kind, ptypes: &[Kind]) -> Result<MethodType, TypeError> {
    MethodType::new(rtype, ptypes)
}

impl MethodType {
    /// Build (or find) the interned method type `(ptypes)rtype`
    pub fn new(rtype: Kind, ptypes: &[Kind]) -> Result<Self, TypeError> {
        Self::intern(rtype, ptypes.to_vec())
    }

    /// `(Object, Object, ...)Object` with `arity` parameters
    pub fn generic(arity: usize) -> Result<Self, TypeError> {
        Self::intern(Kind::object(), vec![Kind::object(); arity])
    }

    fn intern(rtype: Kind, ptypes: Vec<Kind>) -> Result<Self, TypeError> {
        if let Some(index) = ptypes.iter().position(Kind::is_void) {
            return Err(TypeError::VoidParameter { index });
        }
        let slots: usize = ptypes.iter().map(Kind::slot_count).sum();
        if slots > MAX_SLOTS {
            return Err(TypeError::ArityOverflow {
                slots,
                max: MAX_SLOTS,
            });
        }
        Ok(Self::intern_checked(rtype, ptypes, slots))
    }

    fn intern_checked(rtype: Kind, ptypes: Vec<Kind>, slots: usize) -> Self {
        let key: MethodTypeKey = (rtype, ptypes.into_boxed_slice());
        if let Some(existing) = METHOD_TYPES.get(&key) {
            return existing.value().clone();
        }
        let fresh = MethodType(Arc::new(MethodTypeData {
            rtype: key.0.clone(),
            ptypes: key.1.clone(),
            slots,
            basic: OnceCell::new(),
        }));
        // Concurrent first use may build two candidates; the first one published wins.
        METHOD_TYPES.entry(key).or_insert(fresh).value().clone()
    }

    /// Return kind
    pub fn return_type(&self) -> &Kind {
        &self.0.rtype
    }

    /// Parameter kind at `index`
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn parameter_type(&self, index: usize) -> &Kind {
        &self.0.ptypes[index]
    }

    /// Parameter kinds as a slice
    pub fn parameter_array(&self) -> &[Kind] {
        &self.0.ptypes
    }

    /// Parameter kinds as an owned list
    pub fn parameter_list(&self) -> Vec<Kind> {
        self.0.ptypes.to_vec()
    }

    /// Number of parameters
    pub fn parameter_count(&self) -> usize {
        self.0.ptypes.len()
    }

    /// Argument slots used by the parameters (`long`/`double` count twice)
    pub fn parameter_slot_count(&self) -> usize {
        self.0.slots
    }

    /// Last parameter kind, if any
    pub fn last_parameter_type(&self) -> Option<&Kind> {
        self.0.ptypes.last()
    }

    /// Whether any parameter or the return kind is primitive
    pub(crate) fn has_primitives(&self) -> bool {
        self.0.rtype.is_primitive() || self.0.ptypes.iter().any(Kind::is_primitive)
    }

    /// Whether any parameter or the return kind is a wrapper class
    pub(crate) fn has_wrappers(&self) -> bool {
        self.0.rtype.unwrapped().is_some() || self.0.ptypes.iter().any(|p| p.unwrapped().is_some())
    }

    /// Same type with one parameter replaced
    pub fn change_parameter_type(&self, index: usize, kind: Kind) -> Result<Self, TypeError> {
        self.check_index(index)?;
        if self.0.ptypes[index] == kind {
            return Ok(self.clone());
        }
        let mut ptypes = self.parameter_list();
        ptypes[index] = kind;
        Self::intern(self.0.rtype.clone(), ptypes)
    }

    /// Same parameters with a different return kind
    pub fn change_return_type(&self, rtype: Kind) -> Self {
        if self.0.rtype == rtype {
            return self.clone();
        }
        Self::intern_checked(rtype, self.parameter_list(), self.0.slots)
    }

    /// Insert parameter kinds before position `pos` (`pos == count` appends)
    pub fn insert_parameter_types(&self, pos: usize, kinds: &[Kind]) -> Result<Self, TypeError> {
        if pos > self.parameter_count() {
            return Err(TypeError::IndexOutOfRange {
                index: pos,
                len: self.parameter_count(),
            });
        }
        if kinds.is_empty() {
            return Ok(self.clone());
        }
        let mut ptypes = Vec::with_capacity(self.parameter_count() + kinds.len());
        ptypes.extend_from_slice(&self.0.ptypes[..pos]);
        ptypes.extend_from_slice(kinds);
        ptypes.extend_from_slice(&self.0.ptypes[pos..]);
        Self::intern(self.0.rtype.clone(), ptypes)
    }

    /// Append parameter kinds at the end
    pub fn append_parameter_types(&self, kinds: &[Kind]) -> Result<Self, TypeError> {
        self.insert_parameter_types(self.parameter_count(), kinds)
    }

    /// Remove the parameters in `start..end`
    pub fn drop_parameter_types(&self, start: usize, end: usize) -> Result<Self, TypeError> {
        self.replace_parameter_types(start, end, &[])
    }

    /// Replace the parameters in `start..end` with `kinds`
    pub fn replace_parameter_types(
        &self,
        start: usize,
        end: usize,
        kinds: &[Kind],
    ) -> Result<Self, TypeError> {
        let len = self.parameter_count();
        if start > end || end > len {
            return Err(TypeError::InvalidRange { start, end, len });
        }
        if start == end && kinds.is_empty() {
            return Ok(self.clone());
        }
        let mut ptypes = Vec::with_capacity(len - (end - start) + kinds.len());
        ptypes.extend_from_slice(&self.0.ptypes[..start]);
        ptypes.extend_from_slice(kinds);
        ptypes.extend_from_slice(&self.0.ptypes[end..]);
        Self::intern(self.0.rtype.clone(), ptypes)
    }

    /// Every reference kind replaced by the root class
    pub fn erase(&self) -> Self {
        let erase = |k: &Kind| if k.is_reference() { Kind::object() } else { k.clone() };
        Self::intern_checked(
            erase(&self.0.rtype),
            self.0.ptypes.iter().map(erase).collect(),
            self.0.slots,
        )
    }

    /// Erasure to basic types; this is what composition forms are keyed by
    pub fn basic_type(&self) -> &MethodType {
        self.0.basic.get_or_init(|| {
            let basic = |k: &Kind| k.basic_type().kind();
            Self::intern_checked(
                basic(&self.0.rtype),
                self.0.ptypes.iter().map(basic).collect(),
                self.0.slots,
            )
        })
    }

    /// Primitive kinds replaced by their wrapper classes
    pub fn wrap(&self) -> Self {
        if !self.has_primitives() {
            return self.clone();
        }
        let wrap = |k: &Kind| match k.wrapper_class() {
            Some(w) => Kind::Ref(w),
            None => k.clone(),
        };
        let ptypes: Vec<Kind> = self.0.ptypes.iter().map(wrap).collect();
        let slots = ptypes.len();
        Self::intern_checked(wrap(&self.0.rtype), ptypes, slots)
    }

    /// Wrapper classes replaced by their primitive kinds
    pub fn unwrap(&self) -> Self {
        if !self.has_wrappers() {
            return self.clone();
        }
        let unwrap = |k: &Kind| k.unwrapped().unwrap_or_else(|| k.clone());
        let ptypes: Vec<Kind> = self.0.ptypes.iter().map(unwrap).collect();
        let slots = ptypes.iter().map(Kind::slot_count).sum();
        Self::intern_checked(unwrap(&self.0.rtype), ptypes, slots)
    }

    /// Whether a target of this type can be adapted to `new_type` by `asType`
    ///
    /// Each caller-supplied parameter of `new_type` must convert to the
    /// matching parameter of `self`, and the return of `self` must convert to
    /// the return of `new_type`.
    pub fn is_convertible_to(&self, new_type: &MethodType) -> bool {
        self.convertible_in(new_type, ConversionMode::Invoke)
    }

    /// Like [`is_convertible_to`](Self::is_convertible_to) under explicit-cast rules
    pub fn is_explicit_castable_to(&self, new_type: &MethodType) -> bool {
        self.convertible_in(new_type, ConversionMode::ExplicitCast)
    }

    fn convertible_in(&self, new_type: &MethodType, mode: ConversionMode) -> bool {
        if self == new_type {
            return true;
        }
        if self.parameter_count() != new_type.parameter_count() {
            return false;
        }
        let params_ok = new_type
            .parameter_array()
            .iter()
            .zip(self.parameter_array())
            .all(|(src, dst)| classify_conversion(src, dst, mode).is_some());
        params_ok && classify_conversion(self.return_type(), new_type.return_type(), mode).is_some()
    }

    fn check_index(&self, index: usize) -> Result<(), TypeError> {
        if index >= self.parameter_count() {
            return Err(TypeError::IndexOutOfRange {
                index,
                len: self.parameter_count(),
            });
        }
        Ok(())
    }

    /// Whether two handles refer to the same interned type
    pub fn ptr_eq(&self, other: &MethodType) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for MethodType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for MethodType {}

impl Hash for MethodType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Display for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.0.ptypes.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, "){}", self.0.rtype)
    }
}

impl fmt::Debug for MethodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
