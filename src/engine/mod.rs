//! Capability Construction Engine
//!
//! Runtime structural matching between an open-ended bag of named values
//! and a statically-shaped construction surface:
//! - `shape`: provider-declared capability shapes (signatures, properties)
//! - `construct`: signature selection and property back-fill
//!
//! The engine is reflection-free: everything it knows about a capability
//! type comes from the shape the provider declared.

mod construct;
mod shape;

pub use construct::{construct, ConstructionPlan};
pub use shape::{
    CapabilityInstance, CapabilityShape, NamedValues, Param, Property, Signature, ValueKind,
};
