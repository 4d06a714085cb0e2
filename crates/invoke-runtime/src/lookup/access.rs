//! Access capabilities
//!
//! An [`AccessContext`] pairs a lookup class with the [`AccessMode`]s it
//! may exercise. Contexts only ever narrow: moving to another class or
//! dropping a mode never adds capabilities.
//!
//! ## String form
//!
//! Modes parse from pipe-separated names, hex or decimal:
//!
//! ```toml
//! [lookup]
//! default_modes = "PUBLIC|PACKAGE"   # or "0x09", or "9"
//! ```

use std::fmt;

use invoke_types::ClassRef;

use crate::member::{MemberDeclaration, Visibility};

/// Access capability flags (bitflags)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessMode(u8);

impl AccessMode {
    /// No access at all
    pub const NONE: Self = Self(0x00);
    /// Public members of accessible classes
    pub const PUBLIC: Self = Self(0x01);
    /// Private members of the lookup class and its nestmates
    pub const PRIVATE: Self = Self(0x02);
    /// Protected members of superclasses
    pub const PROTECTED: Self = Self(0x04);
    /// Package-private members of the lookup class's package
    pub const PACKAGE: Self = Self(0x08);

    /// PUBLIC | PRIVATE | PROTECTED | PACKAGE
    pub const ALL: Self = Self(0x0F);
    /// Every member of every class, used by the engine's own bootstrap code
    pub const TRUSTED: Self = Self(0x1F);

    const TRUST_BIT: u8 = 0x10;

    /// Create from raw bits
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Get raw bits
    pub const fn bits(&self) -> u8 {
        self.0
    }

    /// Check if all flags of `other` are present
    pub const fn contains(&self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of modes
    pub const fn union(&self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection of modes
    pub const fn intersection(&self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Difference (remove flags)
    pub const fn difference(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// No capability at all
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// The trusted sentinel
    pub const fn is_trusted(&self) -> bool {
        self.0 & Self::TRUST_BIT != 0
    }

    /// Parse a single mode name, or hex (`0x0F`) / decimal bits
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "NONE" => Some(Self::NONE),
            "PUBLIC" => Some(Self::PUBLIC),
            "PRIVATE" => Some(Self::PRIVATE),
            "PROTECTED" => Some(Self::PROTECTED),
            "PACKAGE" => Some(Self::PACKAGE),
            "ALL" => Some(Self::ALL),
            "TRUSTED" => Some(Self::TRUSTED),
            _ => {
                let bits = if let Some(hex) = s.strip_prefix("0x") {
                    u8::from_str_radix(hex, 16).ok()?
                } else {
                    s.parse::<u8>().ok()?
                };
                (bits & !Self::TRUSTED.0 == 0).then_some(Self::from_bits(bits))
            }
        }
    }

    /// Parse combined modes from a pipe-separated string (e.g. `PUBLIC|PACKAGE`)
    pub fn from_combined_str(s: &str) -> Option<Self> {
        let mut result = Self::NONE;
        for part in s.split('|') {
            result = result.union(Self::from_str(part.trim())?);
        }
        Some(result)
    }
}

impl Default for AccessMode {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NONE => return write!(f, "NONE"),
            Self::ALL => return write!(f, "ALL"),
            Self::TRUSTED => return write!(f, "TRUSTED"),
            _ => {}
        }
        let names = [
            (Self::PUBLIC, "PUBLIC"),
            (Self::PRIVATE, "PRIVATE"),
            (Self::PROTECTED, "PROTECTED"),
            (Self::PACKAGE, "PACKAGE"),
        ];
        let mut first = true;
        for (mode, name) in names {
            if self.contains(mode) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", name)?;
                first = false;
            }
        }
        if self.is_trusted() {
            write!(f, "|0x{:02X}", Self::TRUST_BIT)?;
        }
        Ok(())
    }
}

/// A lookup class plus the modes it may exercise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    lookup_class: ClassRef,
    modes: AccessMode,
}

impl AccessContext {
    /// Context for `lookup_class` with `modes`
    pub fn new(lookup_class: &ClassRef, modes: AccessMode) -> Self {
        Self {
            lookup_class: lookup_class.clone(),
            modes,
        }
    }

    /// Class the context resolves as
    pub fn lookup_class(&self) -> &ClassRef {
        &self.lookup_class
    }

    /// Capabilities
    pub fn modes(&self) -> AccessMode {
        self.modes
    }

    /// Context for `other` that never exceeds this one
    ///
    /// PROTECTED is lost on any class change; PACKAGE and PRIVATE are lost
    /// across packages; PRIVATE is lost between classes that are not
    /// nestmates. If `other` is not accessible, nothing remains. A trusted
    /// context moves with full (untrusted) access.
    pub fn in_class(&self, other: &ClassRef) -> AccessContext {
        if other == &self.lookup_class {
            return self.clone();
        }
        if self.modes.is_trusted() {
            return AccessContext::new(other, AccessMode::ALL);
        }
        if !self.is_class_accessible(other) {
            return AccessContext::new(other, AccessMode::NONE);
        }
        let mut modes = self.modes.difference(AccessMode::PROTECTED);
        if !self.lookup_class.is_same_package(other) {
            modes = modes.difference(AccessMode::PACKAGE.union(AccessMode::PRIVATE));
        }
        if !self.lookup_class.is_nestmate_of(other) {
            modes = modes.difference(AccessMode::PRIVATE);
        }
        AccessContext::new(other, modes)
    }

    /// Same class with `mode` given up
    ///
    /// Dropping PUBLIC drops everything; dropping PACKAGE also drops
    /// PRIVATE. Trust is always lost.
    pub fn drop_mode(&self, mode: AccessMode) -> AccessContext {
        let mut modes = self.modes.difference(AccessMode::from_bits(AccessMode::TRUST_BIT));
        if mode.contains(AccessMode::PUBLIC) {
            modes = AccessMode::NONE;
        } else if mode.contains(AccessMode::PACKAGE) {
            modes = modes.difference(AccessMode::PACKAGE.union(AccessMode::PRIVATE));
        }
        AccessContext::new(&self.lookup_class, modes.difference(mode))
    }

    /// Whether `class` is visible from this context
    pub fn is_class_accessible(&self, class: &ClassRef) -> bool {
        if self.modes.is_trusted() {
            return true;
        }
        if class.is_public() || class == &self.lookup_class {
            return !self.modes.is_empty();
        }
        self.modes.contains(AccessMode::PACKAGE) && self.lookup_class.is_same_package(class)
    }

    /// Check `member`, referenced through `refc`, against this context
    ///
    /// A class reaches its own members with any mode at all.
    pub fn check_member(&self, refc: &ClassRef, member: &MemberDeclaration) -> Result<(), String> {
        if self.modes.is_trusted() {
            return Ok(());
        }
        let denied = |why: &str| {
            Err(format!(
                "{} is not accessible from {} with {}: {}",
                member, self.lookup_class, self.modes, why
            ))
        };
        if self.modes.is_empty() {
            return denied("no access");
        }
        if !self.is_class_accessible(refc) {
            return denied("class is not accessible");
        }
        let lookup = &self.lookup_class;
        let declaring = &member.declaring_class;
        if lookup == declaring {
            return Ok(());
        }
        match member.modifiers.visibility {
            Visibility::Public => Ok(()),
            Visibility::Protected => {
                if lookup.is_same_package(declaring)
                    && (self.modes.contains(AccessMode::PROTECTED) || self.modes.contains(AccessMode::PACKAGE))
                {
                    Ok(())
                } else if self.modes.contains(AccessMode::PROTECTED) && lookup.is_subclass_of(declaring) {
                    Ok(())
                } else {
                    denied("protected")
                }
            }
            Visibility::Package => {
                if self.modes.contains(AccessMode::PACKAGE) && lookup.is_same_package(declaring) {
                    Ok(())
                } else {
                    denied("package-private")
                }
            }
            Visibility::Private => {
                if self.modes.contains(AccessMode::PRIVATE) && lookup.is_nestmate_of(declaring) {
                    Ok(())
                } else {
                    denied("private")
                }
            }
        }
    }
}

impl fmt::Display for AccessContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.lookup_class.name(), self.modes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_contains() {
        let modes = AccessMode::PUBLIC.union(AccessMode::PACKAGE);
        assert!(modes.contains(AccessMode::PUBLIC));
        assert!(!modes.contains(AccessMode::PRIVATE));
        assert!(AccessMode::ALL.contains(modes));
        assert!(!AccessMode::ALL.is_trusted());
        assert!(AccessMode::TRUSTED.contains(AccessMode::ALL));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(AccessMode::from_str("public"), Some(AccessMode::PUBLIC));
        assert_eq!(AccessMode::from_str("0x09"), Some(AccessMode::from_bits(9)));
        assert_eq!(AccessMode::from_str("15"), Some(AccessMode::ALL));
        assert_eq!(AccessMode::from_str("0x40"), None);
        assert_eq!(
            AccessMode::from_combined_str("PUBLIC | PRIVATE"),
            Some(AccessMode::PUBLIC.union(AccessMode::PRIVATE))
        );
        assert_eq!(AccessMode::from_combined_str("PUBLIC|NOPE"), None);
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(AccessMode::NONE.to_string(), "NONE");
        assert_eq!(AccessMode::ALL.to_string(), "ALL");
        assert_eq!(AccessMode::PUBLIC.union(AccessMode::PACKAGE).to_string(), "PUBLIC|PACKAGE");
    }

    #[test]
    fn test_in_class_only_narrows() {
        let a = ClassRef::builder("app.A").build();
        let nested = ClassRef::builder("app.A$Inner").nested_in(&a).build();
        let sibling = ClassRef::builder("app.B").build();
        let foreign = ClassRef::builder("lib.C").build();
        let hidden = ClassRef::builder("lib.Hidden").package_private().build();
        let ctx = AccessContext::new(&a, AccessMode::ALL);

        assert_eq!(ctx.in_class(&a), ctx);
        assert_eq!(
            ctx.in_class(&nested).modes(),
            AccessMode::PUBLIC.union(AccessMode::PRIVATE).union(AccessMode::PACKAGE)
        );
        assert_eq!(ctx.in_class(&sibling).modes(), AccessMode::PUBLIC.union(AccessMode::PACKAGE));
        assert_eq!(ctx.in_class(&foreign).modes(), AccessMode::PUBLIC);
        assert_eq!(ctx.in_class(&hidden).modes(), AccessMode::NONE);

        let trusted = AccessContext::new(&a, AccessMode::TRUSTED);
        assert_eq!(trusted.in_class(&foreign).modes(), AccessMode::ALL);
    }

    #[test]
    fn test_drop_mode() {
        let a = ClassRef::builder("app.A").build();
        let ctx = AccessContext::new(&a, AccessMode::TRUSTED);
        assert_eq!(ctx.drop_mode(AccessMode::PUBLIC).modes(), AccessMode::NONE);
        assert_eq!(
            ctx.drop_mode(AccessMode::PACKAGE).modes(),
            AccessMode::PUBLIC.union(AccessMode::PROTECTED)
        );
        assert_eq!(
            ctx.drop_mode(AccessMode::PRIVATE).modes(),
            AccessMode::PUBLIC.union(AccessMode::PROTECTED).union(AccessMode::PACKAGE)
        );
    }

    #[test]
    fn test_own_members_need_any_mode() {
        let own = ClassRef::builder("app.Own").package_private().build();
        let nested = ClassRef::builder("app.Own$Part").nested_in(&own).build();
        let hidden = MemberDeclaration {
            declaring_class: own.clone(),
            name: "hidden".to_string(),
            ty: crate::member::MemberType::Field(invoke_types::Kind::Int),
            modifiers: crate::member::Modifiers::new(Visibility::Private),
        };

        let public_only = AccessContext::new(&own, AccessMode::PUBLIC);
        assert!(public_only.is_class_accessible(&own));
        assert!(public_only.check_member(&own, &hidden).is_ok());
        assert!(AccessContext::new(&own, AccessMode::NONE).check_member(&own, &hidden).is_err());

        let nestmate = AccessContext::new(&nested, AccessMode::PUBLIC.union(AccessMode::PACKAGE));
        assert!(nestmate.check_member(&own, &hidden).is_err());
        let nestmate = AccessContext::new(&nested, AccessMode::ALL);
        assert!(nestmate.check_member(&own, &hidden).is_ok());
    }
}
