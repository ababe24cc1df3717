//! Capability Shapes - provider-declared construction surfaces
//!
//! A `CapabilityShape` describes a capability type as an ordered list of
//! construction signatures plus a list of settable properties. Providers
//! declare shapes with the builder methods; the engine only ever inspects
//! them through this module, never through runtime type inspection.
//!
//! Signature declaration order is priority order: when two signatures of
//! equal parameter count are both satisfiable, the first declared wins.

use rustc_hash::FxHashMap;
use serde_json::Value;

use super::construct::ConstructionPlan;

/// Coarse value kinds carried on parameters and properties.
///
/// Kinds are declarative: signature matching is by name presence, values
/// pass through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Boolean,
    Structured,
}

impl ValueKind {
    /// Kind of a JSON value, for shapes derived from live metadata.
    pub fn of(value: &Value) -> Self {
        match value {
            Value::String(_) => Self::Text,
            Value::Number(_) => Self::Integer,
            Value::Bool(_) => Self::Boolean,
            _ => Self::Structured,
        }
    }
}

/// One named construction parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub kind: ValueKind,
}

/// One construction signature: an ordered parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// One settable property. Nullable properties are caller-managed and never
/// back-filled from metadata; non-nullable properties without a metadata
/// entry fall back to the shape-defined default, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub kind: ValueKind,
    pub nullable: bool,
    pub default: Option<Value>,
}

/// Provider-declared description of a capability type.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityShape {
    type_name: String,
    signatures: Vec<Signature>,
    properties: Vec<Property>,
}

impl CapabilityShape {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            signatures: Vec::new(),
            properties: Vec::new(),
        }
    }

    /// Declare a construction signature. Declaration order is priority order.
    pub fn with_signature(mut self, params: &[(&str, ValueKind)]) -> Self {
        self.signatures.push(Signature {
            params: params
                .iter()
                .map(|(name, kind)| Param {
                    name: (*name).to_string(),
                    kind: *kind,
                })
                .collect(),
        });
        self
    }

    /// Declare a settable property without a default.
    pub fn with_property(mut self, name: &str, kind: ValueKind, nullable: bool) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            kind,
            nullable,
            default: None,
        });
        self
    }

    /// Declare a non-nullable settable property with a shape-defined default.
    pub fn with_property_default(mut self, name: &str, kind: ValueKind, default: Value) -> Self {
        self.properties.push(Property {
            name: name.to_string(),
            kind,
            nullable: false,
            default: Some(default),
        });
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Realize a construction plan into a capability instance.
    ///
    /// This is the provider-delegated factory step: args are named after the
    /// winning signature's parameters, back-filled properties are applied,
    /// and unset non-nullable properties fall back to their defaults.
    pub fn instantiate(&self, plan: &ConstructionPlan) -> CapabilityInstance {
        let signature = &self.signatures[plan.signature()];
        let args: Vec<(String, Value)> = signature
            .params()
            .iter()
            .map(|param| param.name.clone())
            .zip(plan.args().iter().cloned())
            .collect();

        let mut properties: Vec<(String, Value)> = plan.properties().to_vec();
        for property in &self.properties {
            if property.nullable {
                continue;
            }
            let already_set = properties
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case(&property.name));
            if already_set {
                continue;
            }
            if let Some(default) = &property.default {
                properties.push((property.name.clone(), default.clone()));
            }
        }

        CapabilityInstance {
            type_name: self.type_name.clone(),
            args,
            properties,
        }
    }
}

/// Case-insensitive name -> value bag a descriptor assembles for one
/// capability: metadata fields plus derived entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedValues {
    entries: FxHashMap<String, Value>,
}

impl NamedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value; names fold to lowercase, last insert wins.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<Value>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&name.to_ascii_lowercase())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// A realized, ready-to-use capability: type name, named construction args
/// and applied properties. Owned by the descriptor/adapter that built it;
/// channels consume it read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityInstance {
    type_name: String,
    args: Vec<(String, Value)>,
    properties: Vec<(String, Value)>,
}

impl CapabilityInstance {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Construction args in signature order.
    pub fn args(&self) -> &[(String, Value)] {
        &self.args
    }

    /// Applied properties, shape defaults included.
    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    /// Case-insensitive field lookup, args first, then properties.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.args
            .iter()
            .chain(self.properties.iter())
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// String field lookup.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }
}
