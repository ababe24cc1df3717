//! Binding Providers - descriptor factories keyed by binding type
//!
//! Providers are registered in a caller-determined order and queried per
//! declaration. The registry queries *every* provider so that overlapping
//! claims on the same `type` surface as a configuration error instead of
//! silently resolving to whichever provider happened to be listed first.
//!
//! ## Modules
//!
//! - [`storage`] - queue and blob binding kinds
//! - [`messaging`] - service-bus and event-stream binding kinds
//! - [`generic`] - catch-all trigger kinds with a configured type list

pub mod generic;
pub mod messaging;
pub mod storage;

pub use generic::GenericTriggerProvider;
pub use messaging::{MessagingBindingProvider, StreamListener, StreamListenerRegistry};
pub use storage::StorageBindingProvider;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use crate::descriptor::CapabilityDescriptor;
use crate::error::{BindError, Result};
use crate::metadata::MetadataMap;

/// Factory for capability descriptors of the binding types one backend
/// supports.
pub trait BindingProvider: Send + Sync {
    /// Stable provider name, used in diagnostics.
    fn name(&self) -> &str;

    /// Create a descriptor if this provider claims the declaration's type.
    ///
    /// `Ok(None)` means the type is not claimed; `Err` means the type is
    /// claimed but the declaration is invalid for it.
    fn try_create(&self, metadata: &MetadataMap) -> Result<Option<Box<dyn CapabilityDescriptor>>>;

    /// One-time host-level hook, called before any descriptor is built.
    /// Providers configure shared backend resources here.
    fn initialize(&self, _host_metadata: &Value) -> Result<()> {
        Ok(())
    }
}

/// Ordered provider list with one-time initialization.
///
/// After `initialize` returns the registry is read-only and safe to share
/// across concurrent invocations.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn BindingProvider>>,
    initialized: Mutex<bool>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Box<dyn BindingProvider>>) -> Self {
        Self {
            providers,
            initialized: Mutex::new(false),
        }
    }

    /// Registry with the built-in storage and messaging providers.
    pub fn with_default_providers() -> Self {
        Self::new(vec![
            Box::new(StorageBindingProvider),
            Box::new(MessagingBindingProvider::new()),
        ])
    }

    /// Run every provider's host-level hook, at most once per process.
    ///
    /// Later calls are logged no-ops, so callers may invoke this defensively
    /// with empty host metadata.
    pub fn initialize(&self, host_metadata: &Value) -> Result<()> {
        let mut initialized = self.initialized.lock();
        if *initialized {
            debug!("provider registry already initialized, skipping");
            return Ok(());
        }
        *initialized = true;

        for provider in &self.providers {
            provider
                .initialize(host_metadata)
                .map_err(|err| BindError::ProviderInit {
                    provider: provider.name().to_string(),
                    reason: err.to_string(),
                })?;
        }
        Ok(())
    }

    /// Resolve the descriptor for one binding declaration.
    ///
    /// Zero claims is an unknown type; more than one claim is a host
    /// configuration error, reported rather than resolved by order.
    pub fn resolve(&self, metadata: &MetadataMap) -> Result<Box<dyn CapabilityDescriptor>> {
        let mut claims: Vec<(&str, Result<Box<dyn CapabilityDescriptor>>)> = Vec::new();
        for provider in &self.providers {
            match provider.try_create(metadata) {
                Ok(None) => {}
                Ok(Some(descriptor)) => claims.push((provider.name(), Ok(descriptor))),
                Err(err) => claims.push((provider.name(), Err(err))),
            }
        }

        if claims.is_empty() {
            return Err(BindError::UnknownBindingType {
                binding: metadata.name().to_string(),
                binding_type: metadata.binding_type().to_string(),
            });
        }
        if claims.len() > 1 {
            let providers = claims
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", ");
            return Err(BindError::ProviderSelectionAmbiguous {
                binding_type: metadata.binding_type().to_string(),
                providers,
            });
        }

        let (provider, descriptor) = claims.remove(0);
        debug!(
            provider,
            binding = metadata.name(),
            binding_type = metadata.binding_type(),
            "provider claimed binding"
        );
        descriptor
    }
}
