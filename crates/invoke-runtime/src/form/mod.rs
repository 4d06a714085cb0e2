//! Composition forms
//!
//! A [`CompositionForm`] is the shared execution plan of a family of targets
//! with the same basic shape. It is a straight-line list of names: the first
//! `arity` names are the incoming arguments, each later name is computed by
//! one [`FormOp`] from earlier names, captured fields or constants. Captured
//! values live in the owning bound target, so two adapters that differ only
//! in what they captured run the same form.
//!
//! Forms are immutable once published. New forms are derived through the
//! editor (see [`Transform`]), which memoizes each edit per source form, and
//! the base forms come from process-wide caches in [`cache`].

pub mod cache;
mod editor;
mod interpret;
mod species;

pub(crate) use editor::Transform;
pub use species::Species;

use std::fmt;
use std::sync::Arc;

use invoke_types::{BasicType, Kind, MethodType, ValueConversion};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::value::Value;

/// What a form was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// Calls the owning target's engine primitive
    Direct,
    /// Forwards to the owning target's delegate
    Delegate,
    /// Calls a captured target
    Reinvoker,
    /// Returns its argument
    Identity,
    /// Returns a captured value
    Constant,
    /// Returns a fixed zero value
    Zero,
    /// Chooses between two captured targets
    Guard,
    /// Intercepts exceptions from a captured target
    Catch,
    /// Throws its argument
    Throw,
    /// Calls a target passed as the leading argument
    Invoker,
    /// Derived from another form by an edit
    Edited,
}

/// Who an [`FormOp::Invoke`] calls
#[derive(Debug, Clone)]
pub enum Callee {
    /// The owning direct target's engine primitive
    Member,
    /// The owning delegating target's delegate
    Delegate,
    /// The target held by a name, without type checks
    Name(usize),
    /// The target held by a name, through `invoke_exact` with the type
    Exact(usize, MethodType),
    /// The target held by a name, through `invoke` with the type
    Generic(usize, MethodType),
}

/// One step of a form
#[derive(Debug, Clone)]
pub enum FormOp {
    /// Captured value of the owning bound target
    Field(usize),
    /// Value substituted into a customized form
    Constant(Value),
    /// Call with the values of the listed names
    Invoke {
        /// Callee
        callee: Callee,
        /// Argument names
        args: Vec<usize>,
    },
    /// Apply a value conversion
    Convert {
        /// Conversion step
        conversion: ValueConversion,
        /// Input name
        arg: usize,
    },
    /// Pick `if_true` or `if_false` by the boolean in `test`
    Select {
        /// Boolean name
        test: usize,
        /// Chosen when true
        if_true: usize,
        /// Chosen when false
        if_false: usize,
    },
    /// Call `target`; on a thrown value of class `exception` call `handler`
    Catch {
        /// Protected target
        target: usize,
        /// Class mirror of the intercepted exception class
        exception: usize,
        /// Handler target
        handler: usize,
        /// Arguments for the protected target
        args: Vec<usize>,
        /// Leading arguments passed on to the handler
        handler_args: usize,
    },
    /// Throw the value of a name
    Throw(usize),
    /// Require an array of exactly `length` elements (null passes only for zero)
    CheckLength {
        /// Array name
        array: usize,
        /// Required length
        length: usize,
    },
    /// Read one array element
    Element {
        /// Array name
        array: usize,
        /// Element index
        index: usize,
    },
    /// Build a new array from the listed names
    NewArray {
        /// Component kind
        component: Kind,
        /// Element names
        elements: Vec<usize>,
    },
}

impl FormOp {
    /// Same op with every name reference passed through `map`
    fn remap(&self, map: &dyn Fn(usize) -> usize) -> FormOp {
        let names = |list: &[usize]| list.iter().map(|&i| map(i)).collect::<Vec<_>>();
        match self {
            FormOp::Field(i) => FormOp::Field(*i),
            FormOp::Constant(v) => FormOp::Constant(v.clone()),
            FormOp::Invoke { callee, args } => FormOp::Invoke {
                callee: match callee {
                    Callee::Member => Callee::Member,
                    Callee::Delegate => Callee::Delegate,
                    Callee::Name(i) => Callee::Name(map(*i)),
                    Callee::Exact(i, ty) => Callee::Exact(map(*i), ty.clone()),
                    Callee::Generic(i, ty) => Callee::Generic(map(*i), ty.clone()),
                },
                args: names(args),
            },
            FormOp::Convert { conversion, arg } => FormOp::Convert {
                conversion: conversion.clone(),
                arg: map(*arg),
            },
            FormOp::Select {
                test,
                if_true,
                if_false,
            } => FormOp::Select {
                test: map(*test),
                if_true: map(*if_true),
                if_false: map(*if_false),
            },
            FormOp::Catch {
                target,
                exception,
                handler,
                args,
                handler_args,
            } => FormOp::Catch {
                target: map(*target),
                exception: map(*exception),
                handler: map(*handler),
                args: names(args),
                handler_args: *handler_args,
            },
            FormOp::Throw(i) => FormOp::Throw(map(*i)),
            FormOp::CheckLength { array, length } => FormOp::CheckLength {
                array: map(*array),
                length: *length,
            },
            FormOp::Element { array, index } => FormOp::Element {
                array: map(*array),
                index: *index,
            },
            FormOp::NewArray {
                component,
                elements,
            } => FormOp::NewArray {
                component: component.clone(),
                elements: names(elements),
            },
        }
    }
}

/// A named intermediate value
#[derive(Debug, Clone)]
pub struct Name {
    basic: BasicType,
    op: Option<FormOp>,
}

impl Name {
    fn argument(basic: BasicType) -> Self {
        Self { basic, op: None }
    }

    fn computed(basic: BasicType, op: FormOp) -> Self {
        Self {
            basic,
            op: Some(op),
        }
    }

    /// Basic type of the value
    pub fn basic_type(&self) -> BasicType {
        self.basic
    }

    /// Producing op; `None` for arguments
    pub fn op(&self) -> Option<&FormOp> {
        self.op.as_ref()
    }
}

/// Shared execution plan
pub struct CompositionForm {
    kind: FormKind,
    arity: usize,
    names: Vec<Name>,
    result: Option<usize>,
    species: Arc<Species>,
    customized: bool,
    edits: Mutex<FxHashMap<Transform, Arc<CompositionForm>>>,
}

impl CompositionForm {
    fn new(
        kind: FormKind,
        args: &[BasicType],
        body: Vec<(BasicType, FormOp)>,
        result: Option<usize>,
        species: Arc<Species>,
    ) -> Self {
        let mut names: Vec<Name> = args.iter().map(|b| Name::argument(*b)).collect();
        names.extend(body.into_iter().map(|(b, op)| Name::computed(b, op)));
        Self::from_names(kind, args.len(), names, result, species)
    }

    fn from_names(
        kind: FormKind,
        arity: usize,
        names: Vec<Name>,
        result: Option<usize>,
        species: Arc<Species>,
    ) -> Self {
        debug_assert!(result.map_or(true, |r| r < names.len()));
        Self {
            kind,
            arity,
            names,
            result,
            species,
            customized: false,
            edits: Mutex::new(FxHashMap::default()),
        }
    }

    /// What the form was built for
    pub fn kind(&self) -> FormKind {
        self.kind
    }

    /// Number of incoming arguments
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// All names, arguments first
    pub fn names(&self) -> &[Name] {
        &self.names
    }

    /// Name whose value is returned; `None` returns nothing
    pub fn result(&self) -> Option<usize> {
        self.result
    }

    /// Layout of captured values the form reads
    pub fn species(&self) -> &Arc<Species> {
        &self.species
    }

    /// Whether this form belongs to exactly one target
    pub fn is_customized(&self) -> bool {
        self.customized
    }

    /// Basic types of the incoming arguments
    pub fn argument_types(&self) -> Vec<BasicType> {
        self.names[..self.arity].iter().map(|n| n.basic).collect()
    }

    /// Copy with every captured field replaced by its value
    pub(crate) fn customize(&self, values: &[Value]) -> CompositionForm {
        let names = self
            .names
            .iter()
            .map(|name| match &name.op {
                Some(FormOp::Field(i)) => match values.get(*i) {
                    Some(value) => Name::computed(name.basic, FormOp::Constant(value.clone())),
                    None => name.clone(),
                },
                _ => name.clone(),
            })
            .collect();
        let mut form = Self::from_names(self.kind, self.arity, names, self.result, self.species.clone());
        form.customized = true;
        form
    }
}

fn result_name(basic: BasicType, index: usize) -> Option<usize> {
    if basic == BasicType::Void {
        None
    } else {
        Some(index)
    }
}

impl fmt::Display for CompositionForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}_{}(", self.kind, self.species.key())?;
        for (i, name) in self.names[..self.arity].iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "a{}:{}", i, name.basic.code())?;
        }
        write!(f, ")")?;
        match self.result {
            Some(r) => write!(f, "=>t{}", r),
            None => write!(f, "=>void"),
        }
    }
}

impl fmt::Debug for CompositionForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self)?;
        for (i, name) in self.names.iter().enumerate().skip(self.arity) {
            let op = match &name.op {
                Some(FormOp::NewArray { component, elements }) => {
                    format!("new {}[]{:?}", component, elements)
                }
                Some(op) => format!("{:?}", op),
                None => "arg".to_string(),
            };
            writeln!(f, "    t{}:{} = {}", i, name.basic.code(), op)?;
        }
        write!(f, "}}")
    }
}
