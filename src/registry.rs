//! Variant registry - explicit name -> factory lookup
//!
//! Variants are registered up front, either one by one or in bulk from a
//! [`VariantSource`]. The grid only ever sees variants that
//! [`VariantRegistry::resolve`] returned, so an unknown name fails before a
//! single run is scheduled.
//!
//! ```rust
//! use bkz_compare::registry::VariantRegistry;
//!
//! let registry = VariantRegistry::with_builtins();
//! let variants = registry.resolve(&["LLL"])?;
//! assert_eq!(variants[0].name(), "LLL");
//! assert!(registry.resolve(&["BKZ3"]).is_err());
//! # Ok::<(), bkz_compare::Error>(())
//! ```

use std::collections::BTreeMap;

use crate::variant::{Lll, RegisteredVariant};
use crate::{Error, Result};

/// Source name of the variants shipped with the crate.
pub const BUILTIN_SOURCE: &str = "builtin";

/// A bundle of variants registered together (a "plugin").
pub trait VariantSource {
    /// Name shown in lookup errors.
    fn name(&self) -> &str;

    /// Variants provided by this source.
    fn variants(&self) -> Vec<RegisteredVariant>;
}

/// A named, fixed list of variants.
#[derive(Debug, Clone)]
pub struct VariantSet {
    name: String,
    variants: Vec<RegisteredVariant>,
}

impl VariantSet {
    /// Create an empty set.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    /// Add a variant.
    #[must_use]
    pub fn with(mut self, variant: RegisteredVariant) -> Self {
        self.variants.push(variant);
        self
    }
}

impl VariantSource for VariantSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn variants(&self) -> Vec<RegisteredVariant> {
        self.variants.clone()
    }
}

/// Registry of known variants.
///
/// Later registrations under an existing name replace the earlier one, so a
/// source loaded after the builtins can override them.
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    entries: BTreeMap<String, RegisteredVariant>,
    sources: Vec<String>,
}

impl VariantRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the reference variants: `LLL` (delta 0.99) and
    /// `LLL75` (delta 0.75).
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.load(
            &VariantSet::new(BUILTIN_SOURCE)
                .with(Lll::registered("LLL", 0.99))
                .with(Lll::registered("LLL75", 0.75)),
        );
        registry
    }

    /// Register one variant, returning the one it replaced.
    pub fn register(&mut self, variant: RegisteredVariant) -> Option<RegisteredVariant> {
        self.entries.insert(variant.name().to_string(), variant)
    }

    /// Register every variant of `source`. Returns how many were added.
    pub fn load(&mut self, source: &dyn VariantSource) -> usize {
        let variants = source.variants();
        let count = variants.len();
        for variant in variants {
            self.register(variant);
        }
        tracing::debug!(source = source.name(), count, "loaded variant source");
        self.sources.push(source.name().to_string());
        count
    }

    /// Look up one variant.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredVariant> {
        self.entries.get(name)
    }

    /// Check if a name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of registered variants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve `names` in order.
    ///
    /// # Errors
    ///
    /// Returns `VariantNotFound` for the first unknown name; nothing is
    /// resolved in that case.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<RegisteredVariant>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).cloned().ok_or_else(|| Error::VariantNotFound {
                    name: name.to_string(),
                    searched: self.sources.clone(),
                })
            })
            .collect()
    }
}
