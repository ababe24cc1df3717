//! Capability Construction - signature selection and property back-fill
//!
//! Given a named-value bag and a capability shape, pick the construction
//! signature with the greatest number of fully-satisfied parameters (ties
//! keep the first declared) and back-fill the remaining settable,
//! non-nullable properties from the bag. The output is a plan; realizing
//! it is the shape's job ([`CapabilityShape::instantiate`]).

use serde_json::Value;

use crate::error::{BindError, Result};

use super::shape::{CapabilityShape, NamedValues, Signature};

/// Engine output: the chosen signature with bound args, plus property
/// assignments. One value bag + one shape yields zero or one plan.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructionPlan {
    signature: usize,
    args: Vec<Value>,
    properties: Vec<(String, Value)>,
}

impl ConstructionPlan {
    /// Index of the winning signature in the shape's declaration order.
    pub fn signature(&self) -> usize {
        self.signature
    }

    /// Bound parameter values in signature order.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Back-filled property assignments.
    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }
}

/// Select the best-fitting signature and build a construction plan.
pub fn construct(values: &NamedValues, shape: &CapabilityShape) -> Result<ConstructionPlan> {
    let mut best: Option<(usize, Vec<Value>)> = None;

    for (index, signature) in shape.signatures().iter().enumerate() {
        let Some(args) = bind_signature(values, signature) else {
            continue;
        };
        // strictly-greater comparison keeps the first declared on ties
        let improves = match &best {
            Some((best_index, _)) => {
                signature.arity() > shape.signatures()[*best_index].arity()
            }
            None => true,
        };
        if improves {
            best = Some((index, args));
        }
    }

    let Some((signature, args)) = best else {
        return Err(BindError::NoMatchingSignature {
            capability: shape.type_name().to_string(),
        });
    };

    // Back-fill settable, non-nullable properties present in the value bag.
    // Nullable properties are caller-managed and always skipped.
    let mut properties = Vec::new();
    for property in shape.properties() {
        if property.nullable {
            continue;
        }
        if let Some(value) = values.get(&property.name) {
            if !value.is_null() {
                properties.push((property.name.clone(), value.clone()));
            }
        }
    }

    Ok(ConstructionPlan {
        signature,
        args,
        properties,
    })
}

/// Bind one signature against the value bag: every parameter must have a
/// present, non-null value. Returns the args in signature order.
fn bind_signature(values: &NamedValues, signature: &Signature) -> Option<Vec<Value>> {
    let mut args = Vec::with_capacity(signature.arity());
    for param in signature.params() {
        match values.get(&param.name) {
            Some(value) if !value.is_null() => args.push(value.clone()),
            _ => return None,
        }
    }
    Some(args)
}
