//! fnbind - metadata-driven binding resolution for function hosts
//!
//! Given a declarative JSON descriptor for an input/output binding attached
//! to a user function, this crate selects the binding provider for the
//! descriptor's `type`, materializes strongly-typed capability instances by
//! matching metadata fields against the best-fitting construction signature
//! of the target capability shape, resolves `{placeholder}` templates
//! against per-invocation context, and dispatches the bound value to one of
//! the supported data shapes (raw bytes, text, structured object,
//! write-collector, byte stream).
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  metadata    declaration parsing (MetadataMap, Direction)    │
//! │  descriptor  per-kind abstraction (CapabilityDescriptor)     │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  engine      signature selection + property back-fill        │
//! │  template    {placeholder} resolution per invocation         │
//! │  adapter     registration-to-release orchestration           │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  provider    descriptor factories + registry                 │
//! │  settings    app-setting/environment resolution              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! Configuration metadata -> [`ProviderRegistry::resolve`] picks a
//! [`CapabilityDescriptor`] -> the descriptor plans its capabilities ->
//! per invocation, [`BindingAdapter`] resolves templates against that
//! invocation's [`BindingContext`], runs the construction engine, and
//! performs the value-shape-specific bind against a [`ValueChannel`].

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - declarations and per-kind descriptors
// ═══════════════════════════════════════════════════════════════
pub mod descriptor;
pub mod metadata;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - construction, templates, orchestration
// ═══════════════════════════════════════════════════════════════
pub mod adapter;
pub mod engine;
pub mod template;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - providers, settings
// ═══════════════════════════════════════════════════════════════
pub mod provider;
pub mod settings;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - error handling
// ═══════════════════════════════════════════════════════════════
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{BindError, Result};

// Domain model
pub use descriptor::{
    message_value_shape, CapabilityBlueprint, CapabilityDescriptor, CollectorItem, ValueShape,
};
pub use metadata::{Direction, MetadataMap};

// Application layer
pub use adapter::{
    register_all, BindState, BindingAdapter, BoundBinding, ByteStream, Collector, Payload,
    ValueChannel,
};
pub use engine::{
    construct, CapabilityInstance, CapabilityShape, ConstructionPlan, NamedValues, Param,
    Property, Signature, ValueKind,
};
pub use template::{has_markers, BindingContext, ResolveMode, Template};

// Infrastructure
pub use provider::{
    BindingProvider, GenericTriggerProvider, MessagingBindingProvider, ProviderRegistry,
    StorageBindingProvider, StreamListener, StreamListenerRegistry,
};
pub use settings::AppSettings;
