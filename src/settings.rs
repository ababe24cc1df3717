//! App-Setting Resolution
//!
//! Binding metadata often names a setting (e.g. a `connection` field holds
//! the *name* of a connection-string setting, not the value). `AppSettings`
//! resolves those names: explicit host-supplied values first, then the
//! process environment.

use rustc_hash::FxHashMap;

/// Case-insensitive setting name -> value map with environment fallback.
#[derive(Debug, Clone, Default)]
pub struct AppSettings {
    values: FxHashMap<String, String>,
}

impl AppSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.values
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Resolve a setting by name, falling back to an environment variable
    /// of the same (exact) name. Returns `None` when neither is present.
    pub fn resolve(&self, name: &str) -> Option<String> {
        if let Some(value) = self.values.get(&name.to_ascii_lowercase()) {
            return Some(value.clone());
        }
        std::env::var(name).ok()
    }
}
