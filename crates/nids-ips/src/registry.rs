//! Option plugin registry
//!
//! Maps rule keywords to constructors.

use crate::clause::parse_clause;
use crate::cvs;
use crate::option::DetectionOption;
use crate::{IpsError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds an option from its clause value
pub type OptionCtor = fn(Option<&str>) -> Result<Arc<dyn DetectionOption>>;

/// Keyword to constructor table
#[derive(Clone, Default)]
pub struct OptionRegistry {
    ctors: HashMap<&'static str, OptionCtor>,
}

impl OptionRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in option
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(cvs::CVS_KEYWORD, cvs::ctor);
        registry
    }

    /// Register `ctor` for `keyword`; the first registration wins
    pub fn register(&mut self, keyword: &'static str, ctor: OptionCtor) -> bool {
        if self.ctors.contains_key(keyword) {
            tracing::warn!(keyword, "rule option already registered, ignoring");
            return false;
        }
        self.ctors.insert(keyword, ctor);
        true
    }

    /// Build the option for `keyword`
    pub fn build(&self, keyword: &str, value: Option<&str>) -> Result<Arc<dyn DetectionOption>> {
        let ctor = self
            .ctors
            .get(keyword)
            .ok_or_else(|| IpsError::UnknownKeyword(keyword.to_string()))?;
        ctor(value)
    }

    /// Build the option for a `keyword: value` clause
    pub fn build_clause(&self, text: &str) -> Result<Arc<dyn DetectionOption>> {
        let clause = parse_clause(text)?;
        self.build(clause.keyword, clause.value)
    }

    /// Registered keywords, sorted
    pub fn keywords(&self) -> Vec<&'static str> {
        let mut keys: Vec<_> = self.ctors.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}

impl std::fmt::Debug for OptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionRegistry")
            .field("keywords", &self.keywords())
            .finish()
    }
}
