//! Pairwise value conversions
//!
//! [`classify_conversion`] decides which single step turns a value of one kind
//! into a value of another. `asType` uses the [`ConversionMode::Invoke`] rules;
//! explicit-cast adapters use the looser [`ConversionMode::ExplicitCast`]
//! rules, which also allow narrowing and boolean conversions.

use crate::class::ClassRef;
use crate::kind::Kind;

/// Rule set used when classifying a conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionMode {
    /// `asType` rules: widening, boxing, unboxing, reference casts
    Invoke,
    /// Explicit-cast rules: additionally narrowing and boolean conversions
    ExplicitCast,
}

/// One conversion step between two kinds
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueConversion {
    /// Types already agree
    Identity,
    /// Checked reference cast to the class
    Cast(ClassRef),
    /// Primitive-to-primitive conversion
    Primitive {
        /// Source kind
        from: Kind,
        /// Destination kind
        to: Kind,
    },
    /// Box a primitive, optionally followed by a checked cast
    Box {
        /// Primitive being boxed
        from: Kind,
        /// Cast applied to the wrapper, if the destination is not a supertype of it
        cast: Option<ClassRef>,
    },
    /// Unbox a reference into a primitive
    Unbox {
        /// Destination primitive kind
        to: Kind,
        /// Under explicit casts a null unboxes to zero
        mode: ConversionMode,
    },
    /// Drop the value (destination is `void`)
    Discard,
    /// Produce the zero value of the kind (source is `void`)
    Zero(Kind),
}

impl ValueConversion {
    /// Whether this conversion leaves the value untouched
    pub fn is_identity(&self) -> bool {
        matches!(self, ValueConversion::Identity)
    }
}

/// Classify the conversion of a value of kind `src` into kind `dst`
///
/// Returns `None` if no rule applies in the given mode.
pub fn classify_conversion(src: &Kind, dst: &Kind, mode: ConversionMode) -> Option<ValueConversion> {
    if src == dst {
        return Some(ValueConversion::Identity);
    }
    if dst.is_void() {
        return Some(ValueConversion::Discard);
    }
    if src.is_void() {
        return Some(ValueConversion::Zero(dst.clone()));
    }
    match (src, dst) {
        (Kind::Ref(from), Kind::Ref(to)) => {
            if to.is_assignable_from(from) {
                Some(ValueConversion::Identity)
            } else {
                Some(ValueConversion::Cast(to.clone()))
            }
        }
        (from, Kind::Ref(to)) => {
            let wrapper = from.wrapper_class()?;
            if to.is_assignable_from(&wrapper) {
                Some(ValueConversion::Box {
                    from: from.clone(),
                    cast: None,
                })
            } else if mode == ConversionMode::ExplicitCast {
                Some(ValueConversion::Box {
                    from: from.clone(),
                    cast: Some(to.clone()),
                })
            } else {
                None
            }
        }
        (Kind::Ref(from), to) => unbox_rule(from, to, mode),
        (from, to) => {
            if from.is_widening_to(to) || mode == ConversionMode::ExplicitCast {
                Some(ValueConversion::Primitive {
                    from: from.clone(),
                    to: to.clone(),
                })
            } else {
                None
            }
        }
    }
}

fn unbox_rule(from: &ClassRef, to: &Kind, mode: ConversionMode) -> Option<ValueConversion> {
    let unbox = Some(ValueConversion::Unbox {
        to: to.clone(),
        mode,
    });
    if mode == ConversionMode::ExplicitCast {
        return unbox;
    }
    if let Some(wrapped) = from.wrapped_primitive() {
        return if wrapped.is_widening_to(to) { unbox } else { None };
    }
    // A supertype of the wrapper (Object, Number) is checked at call time.
    let wrapper = to.wrapper_class()?;
    if from.is_assignable_from(&wrapper) {
        unbox
    } else {
        None
    }
}

/// Whether `src` converts to `dst` under `asType` rules
pub fn can_convert(src: &Kind, dst: &Kind) -> bool {
    classify_conversion(src, dst, ConversionMode::Invoke).is_some()
}

/// Whether `src` converts to `dst` under explicit-cast rules
pub fn can_explicit_cast(src: &Kind, dst: &Kind) -> bool {
    classify_conversion(src, dst, ConversionMode::ExplicitCast).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integer() -> Kind {
        Kind::Ref(ClassRef::wrapper_for(&Kind::Int).unwrap())
    }

    #[test]
    fn test_identity_and_void() {
        assert_eq!(
            classify_conversion(&Kind::Int, &Kind::Int, ConversionMode::Invoke),
            Some(ValueConversion::Identity)
        );
        assert_eq!(
            classify_conversion(&Kind::Int, &Kind::Void, ConversionMode::Invoke),
            Some(ValueConversion::Discard)
        );
        assert_eq!(
            classify_conversion(&Kind::Void, &Kind::Long, ConversionMode::Invoke),
            Some(ValueConversion::Zero(Kind::Long))
        );
    }

    #[test]
    fn test_reference_rules() {
        assert_eq!(
            classify_conversion(&Kind::string(), &Kind::object(), ConversionMode::Invoke),
            Some(ValueConversion::Identity)
        );
        assert_eq!(
            classify_conversion(&Kind::object(), &Kind::string(), ConversionMode::Invoke),
            Some(ValueConversion::Cast(ClassRef::string()))
        );
    }

    #[test]
    fn test_boxing() {
        assert_eq!(
            classify_conversion(&Kind::Int, &Kind::object(), ConversionMode::Invoke),
            Some(ValueConversion::Box {
                from: Kind::Int,
                cast: None
            })
        );
        assert!(!can_convert(&Kind::Int, &Kind::string()));
        assert!(can_explicit_cast(&Kind::Int, &Kind::string()));
    }

    #[test]
    fn test_unboxing() {
        assert!(can_convert(&integer(), &Kind::Int));
        assert!(can_convert(&integer(), &Kind::Long));
        assert!(!can_convert(&integer(), &Kind::Short));
        assert!(can_convert(&Kind::object(), &Kind::Int));
        assert!(!can_convert(&Kind::string(), &Kind::Int));
        assert!(can_explicit_cast(&Kind::string(), &Kind::Int));
    }

    #[test]
    fn test_primitive_rules() {
        assert!(can_convert(&Kind::Int, &Kind::Long));
        assert!(!can_convert(&Kind::Long, &Kind::Int));
        assert!(!can_convert(&Kind::Boolean, &Kind::Int));
        assert!(can_explicit_cast(&Kind::Long, &Kind::Int));
        assert!(can_explicit_cast(&Kind::Boolean, &Kind::Double));
        assert!(can_explicit_cast(&Kind::Double, &Kind::Boolean));
    }
}
