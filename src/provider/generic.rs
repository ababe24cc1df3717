//! Generic Trigger Kinds
//!
//! Catch-all provider for trigger types with no dedicated descriptor
//! (timers, manual invocations, webhooks handled elsewhere). The served
//! type list is explicit so the registry's overlapping-claim detection
//! stays meaningful; a wildcard claim on every `*Trigger` would collide
//! with the dedicated providers.
//!
//! The capability shape is derived from the declaration itself: one empty
//! construction signature plus a non-nullable property per extra scalar
//! field, so the whole declaration back-fills onto the capability.

use std::sync::Arc;

use serde_json::Value;

use crate::descriptor::{
    message_value_shape, CapabilityBlueprint, CapabilityDescriptor, ValueShape,
};
use crate::engine::{CapabilityShape, NamedValues, ValueKind};
use crate::error::{BindError, Result};
use crate::metadata::MetadataMap;
use crate::provider::BindingProvider;

/// Declaration fields that never surface on the capability.
const RESERVED_FIELDS: [&str; 4] = ["type", "name", "direction", "datatype"];

/// Provider serving an explicit list of trigger type names.
pub struct GenericTriggerProvider {
    types: Vec<String>,
}

impl GenericTriggerProvider {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            types: types.into_iter().map(Into::into).collect(),
        }
    }
}

impl BindingProvider for GenericTriggerProvider {
    fn name(&self) -> &str {
        "generic-trigger"
    }

    fn try_create(&self, metadata: &MetadataMap) -> Result<Option<Box<dyn CapabilityDescriptor>>> {
        if !self.types.iter().any(|t| metadata.type_is(t)) {
            return Ok(None);
        }
        if !metadata.is_trigger() {
            return Err(BindError::InvalidBindingConfiguration {
                binding: metadata.name().to_string(),
                reason: format!(
                    "type '{}' is served by the generic trigger provider but is not a trigger",
                    metadata.binding_type()
                ),
            });
        }
        Ok(Some(Box::new(GenericTriggerDescriptor::from_metadata(
            metadata,
        ))))
    }
}

struct GenericTriggerDescriptor {
    metadata: MetadataMap,
    shape: Arc<CapabilityShape>,
    values: NamedValues,
}

impl GenericTriggerDescriptor {
    fn from_metadata(metadata: &MetadataMap) -> Self {
        // deterministic property order: surfaced fields sorted by name
        let mut fields: Vec<(&str, &Value)> = metadata
            .entries()
            .filter(|&(key, value)| !RESERVED_FIELDS.contains(&key) && is_scalar(value))
            .collect();
        fields.sort_by(|a, b| a.0.cmp(b.0));

        let mut shape = CapabilityShape::new(capitalize(metadata.binding_type())).with_signature(&[]);
        let mut values = NamedValues::new();
        for (key, value) in fields {
            shape = shape.with_property(key, ValueKind::of(value), false);
            values.insert(key, value.clone());
        }

        Self {
            metadata: metadata.clone(),
            shape: Arc::new(shape),
            values,
        }
    }
}

impl CapabilityDescriptor for GenericTriggerDescriptor {
    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn default_value_shape(&self) -> ValueShape {
        message_value_shape(self.direction(), self.metadata.data_type_hint())
    }

    fn build_capabilities(&self) -> Result<Vec<CapabilityBlueprint>> {
        Ok(vec![CapabilityBlueprint::new(
            self.shape.clone(),
            self.values.clone(),
        )])
    }
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
