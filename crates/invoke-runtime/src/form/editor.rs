//! Form editor
//!
//! Combinators never build forms from scratch. They take the form of the
//! target they adapt and apply one [`Transform`] per step. Each form keeps
//! the results of its own edits, so adapting many targets the same way
//! yields one shared form per step.

use std::sync::Arc;

use invoke_types::{BasicType, Kind, ValueConversion};

use super::{result_name, Callee, CompositionForm, FormKind, FormOp, Name, Species};
use crate::value::Value;

/// One edit step; new captured values are appended to the species
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Transform {
    /// Replace argument `pos` with a new captured field
    BindArg { pos: usize, basic: BasicType },
    /// Insert ignored arguments at `pos`
    AddArgs { pos: usize, basics: Vec<BasicType> },
    /// New argument list; old argument `j` is fed from new argument `reorder[j]`
    Permute {
        args: Vec<BasicType>,
        reorder: Vec<usize>,
    },
    /// Pass argument `pos` (now of `basic`) through a captured unary filter
    FilterArg { pos: usize, basic: BasicType },
    /// Pass the result through a captured filter returning `basic`
    FilterReturn { basic: BasicType },
    /// Replace argument `pos` with the arguments of a captured combiner
    Collect {
        pos: usize,
        params: Vec<BasicType>,
        returns_void: bool,
    },
    /// Feed `count` arguments from `pos` to a captured combiner whose result
    /// becomes argument `pos`
    Fold {
        pos: usize,
        count: usize,
        returns_void: bool,
    },
    /// Replace `count` arguments from `pos` with one array argument
    Spread { pos: usize, count: usize },
    /// Replace array argument `pos` with `count` element arguments
    CollectArray {
        pos: usize,
        count: usize,
        component: Kind,
    },
    /// Convert argument `pos`, which now arrives as `basic`
    Convert {
        pos: usize,
        conversion: ValueConversion,
        basic: BasicType,
    },
    /// Convert the result into `basic`
    ConvertReturn {
        conversion: ValueConversion,
        basic: BasicType,
    },
}

impl CompositionForm {
    /// Form produced by applying `transform` to this one
    pub(crate) fn edit(self: &Arc<Self>, transform: Transform) -> Arc<CompositionForm> {
        if let Some(found) = self.edits.lock().get(&transform) {
            return found.clone();
        }
        let edited = Arc::new(self.apply(&transform));
        tracing::trace!(from = %self, to = %edited, ?transform, "form: edit");
        self.edits.lock().entry(transform).or_insert(edited).clone()
    }

    fn apply(&self, transform: &Transform) -> CompositionForm {
        let old = self.argument_types();
        let n = old.len();
        let fields = self.species.len();
        match transform {
            Transform::BindArg { pos, basic } => {
                let mut args = old.clone();
                args.remove(*pos);
                let field = args.len();
                let map = (0..n)
                    .map(|j| match j.cmp(pos) {
                        std::cmp::Ordering::Less => j,
                        std::cmp::Ordering::Equal => field,
                        std::cmp::Ordering::Greater => j - 1,
                    })
                    .collect::<Vec<_>>();
                self.splice(&args, vec![(*basic, FormOp::Field(fields))], &map, self.species.extend_with(*basic))
                    .finish()
            }
            Transform::AddArgs { pos, basics } => {
                let mut args = old[..*pos].to_vec();
                args.extend_from_slice(basics);
                args.extend_from_slice(&old[*pos..]);
                let map = (0..n)
                    .map(|j| if j < *pos { j } else { j + basics.len() })
                    .collect::<Vec<_>>();
                self.splice(&args, Vec::new(), &map, self.species.clone()).finish()
            }
            Transform::Permute { args, reorder } => {
                self.splice(args, Vec::new(), reorder, self.species.clone()).finish()
            }
            Transform::FilterArg { pos, basic } => {
                let mut args = old.clone();
                args[*pos] = *basic;
                let filter = args.len();
                let prologue = vec![
                    (BasicType::Ref, FormOp::Field(fields)),
                    (
                        old[*pos],
                        FormOp::Invoke {
                            callee: Callee::Name(filter),
                            args: vec![*pos],
                        },
                    ),
                ];
                let map = (0..n)
                    .map(|j| if j == *pos { filter + 1 } else { j })
                    .collect::<Vec<_>>();
                self.splice(&args, prologue, &map, self.species.extend_with(BasicType::Ref))
                    .finish()
            }
            Transform::FilterReturn { basic } => {
                let identity = (0..n).collect::<Vec<_>>();
                let mut edited = self.splice(&old, Vec::new(), &identity, self.species.extend_with(BasicType::Ref));
                let filter = edited.names.len();
                let input: Vec<usize> = edited.result.into_iter().collect();
                edited.push(BasicType::Ref, FormOp::Field(fields));
                edited.push(
                    *basic,
                    FormOp::Invoke {
                        callee: Callee::Name(filter),
                        args: input,
                    },
                );
                edited.result = result_name(*basic, filter + 1);
                edited.finish()
            }
            Transform::Collect {
                pos,
                params,
                returns_void,
            } => {
                let m = params.len();
                let mut args = old[..*pos].to_vec();
                args.extend_from_slice(params);
                let rest = if *returns_void { *pos } else { *pos + 1 };
                args.extend_from_slice(&old[rest..]);
                let combiner = args.len();
                let ret = if *returns_void { BasicType::Void } else { old[*pos] };
                let prologue = vec![
                    (BasicType::Ref, FormOp::Field(fields)),
                    (
                        ret,
                        FormOp::Invoke {
                            callee: Callee::Name(combiner),
                            args: (*pos..*pos + m).collect(),
                        },
                    ),
                ];
                let map = (0..n)
                    .map(|j| {
                        if j < *pos {
                            j
                        } else if *returns_void {
                            j + m
                        } else if j == *pos {
                            combiner + 1
                        } else {
                            j - 1 + m
                        }
                    })
                    .collect::<Vec<_>>();
                self.splice(&args, prologue, &map, self.species.extend_with(BasicType::Ref))
                    .finish()
            }
            Transform::Fold {
                pos,
                count,
                returns_void,
            } => {
                let mut args = old.clone();
                if !*returns_void {
                    args.remove(*pos);
                }
                let combiner = args.len();
                let ret = if *returns_void { BasicType::Void } else { old[*pos] };
                let prologue = vec![
                    (BasicType::Ref, FormOp::Field(fields)),
                    (
                        ret,
                        FormOp::Invoke {
                            callee: Callee::Name(combiner),
                            args: (*pos..*pos + count).collect(),
                        },
                    ),
                ];
                let map = (0..n)
                    .map(|j| {
                        if *returns_void || j < *pos {
                            j
                        } else if j == *pos {
                            combiner + 1
                        } else {
                            j - 1
                        }
                    })
                    .collect::<Vec<_>>();
                self.splice(&args, prologue, &map, self.species.extend_with(BasicType::Ref))
                    .finish()
            }
            Transform::Spread { pos, count } => {
                let mut args = old[..*pos].to_vec();
                args.push(BasicType::Ref);
                args.extend_from_slice(&old[*pos + count..]);
                let first_element = args.len() + 1;
                let mut prologue = vec![(
                    BasicType::Void,
                    FormOp::CheckLength {
                        array: *pos,
                        length: *count,
                    },
                )];
                prologue.extend((0..*count).map(|k| {
                    (
                        old[*pos + k],
                        FormOp::Element {
                            array: *pos,
                            index: k,
                        },
                    )
                }));
                let map = (0..n)
                    .map(|j| {
                        if j < *pos {
                            j
                        } else if j < *pos + count {
                            first_element + (j - pos)
                        } else {
                            j - count + 1
                        }
                    })
                    .collect::<Vec<_>>();
                self.splice(&args, prologue, &map, self.species.clone()).finish()
            }
            Transform::CollectArray {
                pos,
                count,
                component,
            } => {
                let mut args = old[..*pos].to_vec();
                args.extend(std::iter::repeat(component.basic_type()).take(*count));
                args.extend_from_slice(&old[*pos + 1..]);
                let array = args.len();
                let prologue = vec![(
                    BasicType::Ref,
                    FormOp::NewArray {
                        component: component.clone(),
                        elements: (*pos..*pos + count).collect(),
                    },
                )];
                let map = (0..n)
                    .map(|j| {
                        if j < *pos {
                            j
                        } else if j == *pos {
                            array
                        } else {
                            j + count - 1
                        }
                    })
                    .collect::<Vec<_>>();
                self.splice(&args, prologue, &map, self.species.clone()).finish()
            }
            Transform::Convert {
                pos,
                conversion,
                basic,
            } => {
                let mut args = old.clone();
                args[*pos] = *basic;
                let converted = args.len();
                let prologue = vec![(
                    old[*pos],
                    FormOp::Convert {
                        conversion: conversion.clone(),
                        arg: *pos,
                    },
                )];
                let map = (0..n)
                    .map(|j| if j == *pos { converted } else { j })
                    .collect::<Vec<_>>();
                self.splice(&args, prologue, &map, self.species.clone()).finish()
            }
            Transform::ConvertReturn { conversion, basic } => {
                let identity = (0..n).collect::<Vec<_>>();
                let mut edited = self.splice(&old, Vec::new(), &identity, self.species.clone());
                let next = edited.names.len();
                match (edited.result, conversion) {
                    (_, ValueConversion::Discard) => edited.result = None,
                    (None, ValueConversion::Zero(kind)) => {
                        edited.push(*basic, FormOp::Constant(Value::zero(kind)));
                        edited.result = result_name(*basic, next);
                    }
                    (None, _) => {}
                    (Some(result), conversion) => {
                        edited.push(
                            *basic,
                            FormOp::Convert {
                                conversion: conversion.clone(),
                                arg: result,
                            },
                        );
                        edited.result = result_name(*basic, next);
                    }
                }
                edited.finish()
            }
        }
    }

    /// Rebuild with a new argument list and prologue, then this form's body
    ///
    /// `map[j]` is the new name that stands in for old argument `j`.
    fn splice(
        &self,
        args: &[BasicType],
        prologue: Vec<(BasicType, FormOp)>,
        map: &[usize],
        species: Arc<Species>,
    ) -> Spliced {
        let base = args.len() + prologue.len();
        let arity = self.arity;
        let remap = |i: usize| if i < arity { map[i] } else { base + i - arity };

        let mut names: Vec<Name> = args.iter().map(|b| Name::argument(*b)).collect();
        names.extend(prologue.into_iter().map(|(b, op)| Name::computed(b, op)));
        for name in &self.names[arity..] {
            names.push(Name {
                basic: name.basic,
                op: name.op.as_ref().map(|op| op.remap(&remap)),
            });
        }
        Spliced {
            arity: args.len(),
            names,
            result: self.result.map(remap),
            species,
        }
    }
}

struct Spliced {
    arity: usize,
    names: Vec<Name>,
    result: Option<usize>,
    species: Arc<Species>,
}

impl Spliced {
    fn push(&mut self, basic: BasicType, op: FormOp) {
        self.names.push(Name::computed(basic, op));
    }

    fn finish(self) -> CompositionForm {
        CompositionForm::from_names(FormKind::Edited, self.arity, self.names, self.result, self.species)
    }
}
