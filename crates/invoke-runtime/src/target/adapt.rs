//! Type adaptation
//!
//! `as_type` bridges a target to a new type with one conversion per
//! parameter and one for the return value. Conversions become form edits on
//! the target's shared form, so equally adapted targets share a form.

use invoke_types::{classify_conversion, ClassRef, ConversionMode, Kind, MethodType};

use super::InvocationTarget;
use crate::combinators::as_collector;
use crate::error::{HandleError, HandleResult};
use crate::form::Transform;

impl InvocationTarget {
    /// Adapter of type `new_ty` that converts arguments and the result
    ///
    /// Per slot the allowed conversions are identity, reference casts,
    /// primitive widening, boxing, unboxing (with widening), discarding the
    /// result, and a zero result for `void` targets. The last adaptation is
    /// memoized; a hit requires the identical type.
    pub fn as_type(&self, new_ty: &MethodType) -> HandleResult<InvocationTarget> {
        if new_ty == &self.0.ty {
            return Ok(self.clone());
        }
        if let Some((cached_ty, cached)) = &*self.0.as_type_cache.lock() {
            if cached_ty == new_ty {
                return Ok(cached.clone());
            }
        }
        let adapted = self.as_type_uncached(new_ty)?;
        *self.0.as_type_cache.lock() = Some((new_ty.clone(), adapted.clone()));
        Ok(adapted)
    }

    fn as_type_uncached(&self, new_ty: &MethodType) -> HandleResult<InvocationTarget> {
        if let Some(array_class) = &self.0.varargs {
            let arity = self.0.ty.parameter_count();
            let array_kind = Kind::of(array_class);
            let pairwise = new_ty.parameter_count() == arity
                && new_ty
                    .last_parameter_type()
                    .is_some_and(|last| array_kind.is_assignable_from(last));
            if !pairwise {
                return self.gather_varargs(new_ty, array_class);
            }
        }
        if !self.0.ty.is_convertible_to(new_ty) {
            return Err(HandleError::Adaptation {
                from: self.0.ty.to_string(),
                to: new_ty.to_string(),
            });
        }
        self.adapt(new_ty, ConversionMode::Invoke)
    }

    /// Collect the caller's trailing arguments into the collector's array
    fn gather_varargs(&self, new_ty: &MethodType, array_class: &ClassRef) -> HandleResult<InvocationTarget> {
        let leading = self.0.ty.parameter_count() - 1;
        if new_ty.parameter_count() < leading {
            return Err(HandleError::Adaptation {
                from: self.0.ty.to_string(),
                to: new_ty.to_string(),
            });
        }
        let collector = as_collector(&self.as_fixed_arity(), array_class, new_ty.parameter_count() - leading)?;
        tracing::trace!(
            collector = %self.0.ty,
            count = new_ty.parameter_count() - leading,
            "target: gathering varargs"
        );
        collector.as_type(new_ty)
    }

    /// Pairwise conversion to `new_ty` under `mode`
    pub(crate) fn adapt(&self, new_ty: &MethodType, mode: ConversionMode) -> HandleResult<InvocationTarget> {
        let old = &self.0.ty;
        let failed = || HandleError::Adaptation {
            from: old.to_string(),
            to: new_ty.to_string(),
        };
        if old.parameter_count() != new_ty.parameter_count() {
            return Err(failed());
        }

        let mut edits = Vec::new();
        for (pos, (wanted, given)) in old.parameter_array().iter().zip(new_ty.parameter_array()).enumerate() {
            let conversion = classify_conversion(given, wanted, mode).ok_or_else(failed)?;
            if !conversion.is_identity() {
                edits.push((
                    Transform::Convert {
                        pos,
                        conversion,
                        basic: given.basic_type(),
                    },
                    None,
                ));
            }
        }
        let conversion = classify_conversion(old.return_type(), new_ty.return_type(), mode).ok_or_else(failed)?;
        if !conversion.is_identity() {
            edits.push((
                Transform::ConvertReturn {
                    conversion,
                    basic: new_ty.return_type().basic_type(),
                },
                None,
            ));
        }

        if edits.is_empty() {
            return Ok(InvocationTarget::delegating(new_ty.clone(), self.detached()));
        }
        self.derive(new_ty.clone(), edits)
    }
}
