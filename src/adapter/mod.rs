//! Binding Adapter - registration-to-release orchestration
//!
//! Lifecycle of one binding:
//!
//! ```text
//! Unbound -> MetadataResolved -> CapabilitiesPlanned
//!                                      | per invocation
//!                                      v
//!                        (TemplatesResolved, skipped when static)
//!                                      |
//!                                      v
//!                                   Bound -> Released
//! ```
//!
//! Registration resolves the provider, builds the capability blueprints
//! once and validates every blueprint through the construction engine, so
//! signature mismatches fail the function registration rather than an
//! invocation. Per invocation, templated string values are re-resolved
//! against that invocation's context and the final instances are built;
//! non-templated bindings reuse instances cached at registration.

mod channel;

pub use channel::{ByteStream, Collector, Payload, ValueChannel};

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::descriptor::{CapabilityBlueprint, CapabilityDescriptor, ValueShape};
use crate::engine::{construct, CapabilityInstance, NamedValues};
use crate::error::{BindError, Result};
use crate::metadata::{Direction, MetadataMap};
use crate::provider::ProviderRegistry;
use crate::template::{BindingContext, ResolveMode, Template};

/// Lifecycle states of a binding, registration through release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindState {
    Unbound,
    MetadataResolved,
    CapabilitiesPlanned,
    TemplatesResolved,
    Bound,
    Released,
}

/// One registered binding: descriptor, planned capabilities, and the
/// per-invocation bind entry points. Immutable after registration and safe
/// to share across concurrent invocations.
pub struct BindingAdapter {
    metadata: MetadataMap,
    descriptor: Box<dyn CapabilityDescriptor>,
    blueprints: Vec<CapabilityBlueprint>,
    static_instances: Option<Arc<Vec<CapabilityInstance>>>,
    mode: ResolveMode,
}

impl std::fmt::Debug for BindingAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingAdapter")
            .field("metadata", &self.metadata)
            .field("blueprints", &self.blueprints)
            .field("static_instances", &self.static_instances)
            .field("mode", &self.mode)
            .finish()
    }
}

impl BindingAdapter {
    /// Register one binding declaration: resolve the provider, plan the
    /// capabilities, and validate every plan.
    pub fn register(registry: &ProviderRegistry, declaration: &Value) -> Result<Self> {
        let metadata = MetadataMap::from_value(declaration)?;
        let descriptor = registry.resolve(&metadata)?;
        debug!(
            binding = metadata.name(),
            binding_type = metadata.binding_type(),
            "binding metadata resolved"
        );

        let blueprints = descriptor.build_capabilities()?;
        if blueprints.is_empty() {
            return Err(BindError::InvalidBindingConfiguration {
                binding: metadata.name().to_string(),
                reason: "descriptor produced no capabilities".to_string(),
            });
        }

        // Fail fast: every blueprint must satisfy a signature even before
        // templates are resolved.
        for blueprint in &blueprints {
            construct(&blueprint.values, &blueprint.shape)?;
        }

        let templated = blueprints.iter().any(|blueprint| {
            blueprint
                .values
                .iter()
                .any(|(_, value)| matches!(value, Value::String(s) if Template::parse(s).is_some()))
        });

        let mut adapter = Self {
            metadata,
            descriptor,
            blueprints,
            static_instances: None,
            mode: ResolveMode::Lenient,
        };
        if !templated {
            let instances = adapter.instantiate_all(None)?;
            adapter.static_instances = Some(Arc::new(instances));
        }
        debug!(
            binding = adapter.metadata.name(),
            templated, "capabilities planned"
        );
        Ok(adapter)
    }

    /// Set the template resolution mode (lenient by default).
    pub fn with_mode(mut self, mode: ResolveMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn binding_name(&self) -> &str {
        self.metadata.name()
    }

    pub fn direction(&self) -> Direction {
        self.descriptor.direction()
    }

    pub fn is_trigger(&self) -> bool {
        self.descriptor.is_trigger()
    }

    pub fn value_shape(&self) -> ValueShape {
        self.descriptor.default_value_shape()
    }

    /// Whether any capability value carries template markers. Templated
    /// bindings rebuild their instances on every invocation.
    pub fn is_templated(&self) -> bool {
        self.static_instances.is_none()
    }

    fn instantiate_all(&self, ctx: Option<&BindingContext>) -> Result<Vec<CapabilityInstance>> {
        let mut instances = Vec::with_capacity(self.blueprints.len());
        for blueprint in &self.blueprints {
            let values = match ctx {
                Some(ctx) => resolve_values(&blueprint.values, ctx, self.mode)?,
                None => blueprint.values.clone(),
            };
            let plan = construct(&values, &blueprint.shape)?;
            instances.push(blueprint.shape.instantiate(&plan));
        }
        Ok(instances)
    }

    /// Capability instances for one invocation, templates resolved.
    /// Instance order follows the descriptor's blueprint order.
    pub fn capabilities(&self, ctx: &BindingContext) -> Result<Vec<CapabilityInstance>> {
        if let Some(cached) = &self.static_instances {
            return Ok(cached.as_ref().clone());
        }
        self.instantiate_all(Some(ctx))
    }

    /// The primary capability instance for one invocation.
    pub fn primary(&self, ctx: &BindingContext) -> Result<CapabilityInstance> {
        self.capabilities(ctx)?
            .into_iter()
            .next()
            .ok_or_else(|| BindError::InvalidBindingConfiguration {
                binding: self.metadata.name().to_string(),
                reason: "descriptor produced no capabilities".to_string(),
            })
    }

    /// Bind for one invocation, dispatching on the descriptor's value
    /// shape. The returned binding owns any scoped resources; callers must
    /// `release()` it when the invocation ends.
    pub async fn bind(
        &self,
        ctx: &BindingContext,
        channel: &dyn ValueChannel,
    ) -> Result<BoundBinding> {
        let primary = self.primary(ctx)?;
        let shape = self.value_shape();
        let direction = self.direction();
        debug!(
            binding = self.binding_name(),
            shape = shape.label(),
            "binding value"
        );

        let mut bound = BoundBinding::new(self.binding_name().to_string(), shape);
        match shape {
            ValueShape::RawBytes | ValueShape::Text | ValueShape::StructuredObject => {
                if !direction.is_read() {
                    return Err(BindError::UnsupportedValueShape {
                        binding: self.binding_name().to_string(),
                        shape: shape.label().to_string(),
                        direction: direction.access_str().to_string(),
                    });
                }
                let payload = channel.read_all(&primary).await?;
                bound.payload = Some(match shape {
                    ValueShape::RawBytes => Payload::Bytes(payload.into_bytes()?),
                    ValueShape::Text => Payload::Text(payload.into_text()?),
                    _ => Payload::Structured(payload.into_structured()?),
                });
            }
            ValueShape::ByteStream => {
                let stream = if direction == Direction::Read {
                    channel.open_read(&primary).await?
                } else {
                    channel.open_write(&primary).await?
                };
                bound.stream = Some(stream);
            }
            ValueShape::WriteCollector(_) => {
                bound.collector = Some(channel.collector(&primary).await?);
            }
        }
        Ok(bound)
    }
}

/// Register one function's binding set. The first configuration error
/// aborts that function's registration; other functions are unaffected.
pub fn register_all(
    registry: &ProviderRegistry,
    declarations: &[Value],
) -> Result<Vec<BindingAdapter>> {
    declarations
        .iter()
        .map(|declaration| BindingAdapter::register(registry, declaration))
        .collect()
}

/// Resolve every templated string value in a bag against the context.
fn resolve_values(
    values: &NamedValues,
    ctx: &BindingContext,
    mode: ResolveMode,
) -> Result<NamedValues> {
    let mut resolved = NamedValues::new();
    for (name, value) in values.iter() {
        match value {
            Value::String(raw) => match Template::parse(raw) {
                Some(template) => {
                    resolved.insert(name, Value::String(template.bind(ctx, mode)?));
                }
                None => resolved.insert(name, value.clone()),
            },
            _ => resolved.insert(name, value.clone()),
        }
    }
    Ok(resolved)
}

/// A binding in its `Bound` state: the fetched payload, or the scoped
/// stream/collector resources for the invocation.
///
/// `release()` consumes the binding, so resources are released at most
/// once; dropping an unreleased binding aborts them instead of leaking.
pub struct BoundBinding {
    binding: String,
    shape: ValueShape,
    state: BindState,
    payload: Option<Payload>,
    stream: Option<Box<dyn ByteStream>>,
    collector: Option<Box<dyn Collector>>,
}

impl std::fmt::Debug for BoundBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundBinding")
            .field("binding", &self.binding)
            .field("shape", &self.shape)
            .field("state", &self.state)
            .field("payload", &self.payload)
            .field("stream", &self.stream.is_some())
            .field("collector", &self.collector.is_some())
            .finish()
    }
}

impl BoundBinding {
    fn new(binding: String, shape: ValueShape) -> Self {
        Self {
            binding,
            shape,
            state: BindState::Bound,
            payload: None,
            stream: None,
            collector: None,
        }
    }

    pub fn state(&self) -> BindState {
        self.state
    }

    pub fn value_shape(&self) -> ValueShape {
        self.shape
    }

    /// The fetched value, for the whole-value read shapes.
    pub fn payload(&self) -> Option<&Payload> {
        self.payload.as_ref()
    }

    pub fn take_payload(&mut self) -> Option<Payload> {
        self.payload.take()
    }

    /// The open byte stream, for stream-shaped bindings.
    pub fn stream(&mut self) -> Option<&mut (dyn ByteStream + 'static)> {
        self.stream.as_deref_mut()
    }

    /// Append a value to the write collector.
    pub async fn append(&mut self, value: Payload) -> Result<()> {
        match self.collector.as_mut() {
            Some(collector) => collector.append(value).await,
            None => Err(BindError::NoCollector {
                binding: self.binding.clone(),
            }),
        }
    }

    /// Release scoped resources: flush the collector, close the stream.
    /// Consuming `self` guarantees this runs at most once; the drop guard
    /// covers bindings abandoned on failure paths.
    pub async fn release(mut self) -> Result<()> {
        self.state = BindState::Released;
        let mut result = Ok(());

        if let Some(mut collector) = self.collector.take() {
            if let Err(err) = collector.flush().await {
                result = Err(err);
            }
        }
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.close().await {
                if result.is_ok() {
                    result = Err(err);
                }
            }
        }

        debug!(binding = %self.binding, "binding released");
        result
    }
}

impl Drop for BoundBinding {
    fn drop(&mut self) {
        // release() drains these; anything left means the invocation bailed
        // without releasing, so abort the resources instead of leaking them.
        if let Some(mut collector) = self.collector.take() {
            collector.abort();
            warn!(binding = %self.binding, "collector aborted without release");
        }
        if let Some(mut stream) = self.stream.take() {
            stream.abort();
            warn!(binding = %self.binding, "stream aborted without release");
        }
    }
}
