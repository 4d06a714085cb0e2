//! Bound-value species
//!
//! A species names the basic types of the values a bound target captures,
//! e.g. `LI` for one reference and one int. Forms are built for one species
//! and read captured values by position.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use invoke_types::BasicType;
use once_cell::sync::Lazy;
use rustc_hash::FxBuildHasher;

/// Interned layout of captured values
#[derive(PartialEq, Eq, Hash)]
pub struct Species {
    key: String,
    fields: Vec<BasicType>,
}

static SPECIES: Lazy<DashMap<String, Arc<Species>, FxBuildHasher>> =
    Lazy::new(|| DashMap::with_hasher(FxBuildHasher));

impl Species {
    /// Species with no captured values
    pub fn empty() -> Arc<Species> {
        Self::of(&[])
    }

    /// Species for the given field layout
    pub fn of(fields: &[BasicType]) -> Arc<Species> {
        let key: String = fields.iter().map(|b| b.code()).collect();
        if let Some(existing) = SPECIES.get(&key) {
            return existing.value().clone();
        }
        let species = Arc::new(Species {
            key: key.clone(),
            fields: fields.to_vec(),
        });
        SPECIES.entry(key).or_insert(species).value().clone()
    }

    /// This species with one more field
    pub fn extend_with(&self, basic: BasicType) -> Arc<Species> {
        let mut fields = self.fields.clone();
        fields.push(basic);
        Self::of(&fields)
    }

    /// Key such as `LLI`
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Field basic types
    pub fn fields(&self) -> &[BasicType] {
        &self.fields
    }

    /// Number of captured values
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether nothing is captured
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Debug for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Species_{}", self.key)
    }
}
