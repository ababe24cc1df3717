//! Template Resolution - `{placeholder}` substitution
//!
//! String fields of a capability may contain `{placeholder}` markers that
//! are substituted from the per-invocation [`BindingContext`]. Parsing
//! happens once (a literal string parses to `None`), binding happens per
//! invocation and is pure: the same template with the same context always
//! yields the same string, safe to call concurrently.
//!
//! Two resolution modes:
//! - [`ResolveMode::Lenient`] (default): unknown placeholders bind to the
//!   empty string, preserving legacy host behavior.
//! - [`ResolveMode::Strict`]: unknown placeholders fail with the offending
//!   placeholder name.

use std::sync::LazyLock;

use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use smallvec::SmallVec;
use uuid::Uuid;

use crate::error::{BindError, Result};

/// Pre-compiled regex for `{placeholder}` markers (no nested braces).
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([^{}]+)\}").unwrap()
});

/// How unknown placeholders are handled during binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResolveMode {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// A parsed template, alternating literal and placeholder segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    raw: String,
    segments: SmallVec<[Segment; 4]>,
}

impl Template {
    /// Parse a string into a template.
    ///
    /// Returns `None` when the string contains no complete `{name}` pair;
    /// such strings are literals and skip per-invocation resolution.
    pub fn parse(raw: &str) -> Option<Self> {
        if !raw.contains('{') {
            return None;
        }

        let mut segments: SmallVec<[Segment; 4]> = SmallVec::new();
        let mut last_end = 0;
        for cap in PLACEHOLDER_RE.captures_iter(raw) {
            let marker = cap.get(0).expect("capture group 0 always present");
            if marker.start() > last_end {
                segments.push(Segment::Literal(raw[last_end..marker.start()].to_string()));
            }
            segments.push(Segment::Placeholder(cap[1].to_string()));
            last_end = marker.end();
        }

        if last_end == 0 {
            // a stray '{' with no closing brace is a literal
            return None;
        }
        if last_end < raw.len() {
            segments.push(Segment::Literal(raw[last_end..].to_string()));
        }

        Some(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The original template text.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in order of appearance, for static validation.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Substitute placeholders from the invocation context.
    pub fn bind(&self, ctx: &BindingContext, mode: ResolveMode) -> Result<String> {
        let mut out = String::with_capacity(self.raw.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(name) => match ctx.get(name) {
                    Some(value) => out.push_str(value),
                    None if mode == ResolveMode::Strict => {
                        return Err(BindError::UnresolvedPlaceholder {
                            placeholder: name.clone(),
                            template: self.raw.clone(),
                        });
                    }
                    None => {}
                },
            }
        }
        Ok(out)
    }
}

/// Quick check whether a string contains placeholder syntax.
pub fn has_markers(raw: &str) -> bool {
    raw.contains('{') && PLACEHOLDER_RE.is_match(raw)
}

/// Per-invocation placeholder values: trigger payload fields, invocation
/// id, and whatever else the dispatcher supplies. Lives for one invocation.
#[derive(Debug, Clone, Default)]
pub struct BindingContext {
    values: FxHashMap<String, String>,
}

impl BindingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Build a context from a trigger payload: scalar top-level fields
    /// become placeholder values, plus a fresh `invocationId`. Nested
    /// objects and arrays are not addressable as flat placeholders.
    pub fn from_trigger_payload(payload: &Value) -> Self {
        let mut ctx = Self::new();
        ctx.insert("invocationId", Uuid::new_v4().to_string());
        if let Some(object) = payload.as_object() {
            for (key, value) in object {
                match value {
                    Value::String(s) => ctx.insert(key.clone(), s.clone()),
                    Value::Number(n) => ctx.insert(key.clone(), n.to_string()),
                    Value::Bool(b) => ctx.insert(key.clone(), b.to_string()),
                    _ => {}
                }
            }
        }
        ctx
    }
}
