//! Form interpreter
//!
//! Evaluates a form's names in order for one invocation. Values computed by
//! earlier names feed later ones; the result name's value is returned.

use smallvec::SmallVec;

use super::{Callee, CompositionForm, FormOp};
use crate::error::{HandleError, HandleResult};
use crate::target::InvocationTarget;
use crate::value::Value;

type Frame = SmallVec<[Value; 8]>;

impl CompositionForm {
    /// Run this form on behalf of `target`
    ///
    /// Arguments are trusted to match the form's basic shape; exact type
    /// checks happen at the public entry points of the target.
    pub(crate) fn interpret(&self, target: &InvocationTarget, args: &[Value]) -> HandleResult<Value> {
        let mut frame: Frame = SmallVec::with_capacity(self.names.len());
        frame.extend(args.iter().cloned());
        for name in &self.names[self.arity..] {
            let value = match &name.op {
                Some(op) => self.eval(target, op, &frame)?,
                None => Value::Void,
            };
            frame.push(value);
        }
        Ok(match self.result {
            Some(index) => frame[index].clone(),
            None => Value::Void,
        })
    }

    fn eval(&self, target: &InvocationTarget, op: &FormOp, frame: &Frame) -> HandleResult<Value> {
        match op {
            FormOp::Field(index) => target.bound_value(*index),
            FormOp::Constant(value) => Ok(value.clone()),
            FormOp::Invoke { callee, args } => {
                let argv = gather(frame, args);
                match callee {
                    Callee::Member => target.call_primitive(&argv),
                    Callee::Delegate => target.delegate()?.invoke_basic(&argv),
                    Callee::Name(index) => handle_at(frame, *index)?.invoke_basic(&argv),
                    Callee::Exact(index, ty) => handle_at(frame, *index)?.invoke_exact(ty, &argv),
                    Callee::Generic(index, ty) => handle_at(frame, *index)?.invoke(ty, &argv),
                }
            }
            FormOp::Convert { conversion, arg } => frame[*arg].clone().apply_conversion(conversion),
            FormOp::Select {
                test,
                if_true,
                if_false,
            } => {
                let chosen = frame[*test].as_bool().ok_or_else(|| HandleError::TypeMismatch {
                    expected: "boolean".to_string(),
                    found: frame[*test].kind_name(),
                })?;
                Ok(frame[if chosen { *if_true } else { *if_false }].clone())
            }
            FormOp::Catch {
                target: protected,
                exception,
                handler,
                args,
                handler_args,
            } => {
                let argv = gather(frame, args);
                match handle_at(frame, *protected)?.invoke_basic(&argv) {
                    Err(HandleError::Thrown(thrown)) if is_instance(&frame[*exception], &thrown) => {
                        let mut handler_argv = Vec::with_capacity(handler_args + 1);
                        handler_argv.push(thrown);
                        handler_argv.extend_from_slice(&argv[..*handler_args]);
                        handle_at(frame, *handler)?.invoke_basic(&handler_argv)
                    }
                    other => other,
                }
            }
            FormOp::Throw(index) => match &frame[*index] {
                Value::Null => Err(HandleError::NullDereference("cannot throw null".to_string())),
                thrown => Err(HandleError::Thrown(thrown.clone())),
            },
            FormOp::CheckLength { array, length } => {
                let actual = match &frame[*array] {
                    Value::Null if *length == 0 => return Ok(Value::Void),
                    Value::Null => {
                        return Err(HandleError::NullDereference(
                            "cannot spread a null array".to_string(),
                        ))
                    }
                    value => value.array_len(),
                };
                match actual {
                    Some(actual) if actual == *length => Ok(Value::Void),
                    Some(actual) => Err(HandleError::IllegalArgument(format!(
                        "array is not of length {} (found {})",
                        length, actual
                    ))),
                    None => Err(HandleError::TypeMismatch {
                        expected: "array".to_string(),
                        found: frame[*array].kind_name(),
                    }),
                }
            }
            FormOp::Element { array, index } => frame[*array].array_get(*index),
            FormOp::NewArray {
                component,
                elements,
            } => Ok(Value::array(component, gather(frame, elements).into_vec())),
        }
    }
}

fn gather(frame: &Frame, names: &[usize]) -> SmallVec<[Value; 8]> {
    names.iter().map(|&i| frame[i].clone()).collect()
}

fn handle_at(frame: &Frame, index: usize) -> HandleResult<&InvocationTarget> {
    match &frame[index] {
        Value::Null => Err(HandleError::NullDereference("cannot invoke a null target".to_string())),
        value => value.as_handle().ok_or_else(|| HandleError::TypeMismatch {
            expected: "handle".to_string(),
            found: value.kind_name(),
        }),
    }
}

fn is_instance(class_mirror: &Value, thrown: &Value) -> bool {
    match (class_mirror.as_class(), thrown.class()) {
        (Some(expected), Some(actual)) => expected.is_assignable_from(actual),
        _ => false,
    }
}
