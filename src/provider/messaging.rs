//! Messaging Binding Kinds - service bus and event streams
//!
//! Service-bus bindings address either a queue or a topic+subscription
//! pair; when both are declared the topic+subscription form wins through
//! the engine's greatest-parameter-count rule. Event-stream bindings
//! register their listeners and senders in a provider-owned registry that
//! the host configures once through `initialize`.

use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::descriptor::{
    message_value_shape, CapabilityBlueprint, CapabilityDescriptor, ValueShape,
};
use crate::engine::{CapabilityShape, NamedValues, ValueKind};
use crate::error::{BindError, Result};
use crate::metadata::MetadataMap;
use crate::provider::BindingProvider;
use crate::settings::AppSettings;

/// Consumer group used when a stream binding names none.
const DEFAULT_CONSUMER_GROUP: &str = "$Default";

static SERVICE_BUS_TRIGGER_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(
        CapabilityShape::new("ServiceBusTrigger")
            .with_signature(&[
                ("topicName", ValueKind::Text),
                ("subscriptionName", ValueKind::Text),
                ("accessRights", ValueKind::Text),
            ])
            .with_signature(&[
                ("queueName", ValueKind::Text),
                ("accessRights", ValueKind::Text),
            ])
            .with_property_default("isSessionsEnabled", ValueKind::Boolean, Value::Bool(false)),
    )
});

static SERVICE_BUS_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(CapabilityShape::new("ServiceBus").with_signature(&[
        ("entityPath", ValueKind::Text),
        ("accessRights", ValueKind::Text),
    ]))
});

static SERVICE_BUS_ACCOUNT_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(
        CapabilityShape::new("ServiceBusAccount").with_signature(&[("account", ValueKind::Text)]),
    )
});

static EVENT_HUB_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(CapabilityShape::new("EventHub").with_signature(&[("path", ValueKind::Text)]))
});

static EVENT_HUB_TRIGGER_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(CapabilityShape::new("EventHubTrigger").with_signature(&[("path", ValueKind::Text)]))
});

/// Entity access rights carried on service-bus capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AccessRights {
    #[default]
    Manage,
    Listen,
    Send,
}

impl AccessRights {
    fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("manage") {
            Some(Self::Manage)
        } else if raw.eq_ignore_ascii_case("listen") {
            Some(Self::Listen)
        } else if raw.eq_ignore_ascii_case("send") {
            Some(Self::Send)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Manage => "manage",
            Self::Listen => "listen",
            Self::Send => "send",
        }
    }
}

/// Host-level messaging options (`serviceBus` section of host metadata).
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MessagingOptions {
    max_concurrent_calls: Option<u32>,
}

/// Listener entry registered for an event-stream trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamListener {
    pub host_id: String,
    pub hub: String,
    pub consumer_group: String,
    pub connection: Option<String>,
}

/// Provider-owned registry of stream listeners and senders.
///
/// Shared with every event-stream descriptor the provider creates. The
/// registry is the only shared mutable state in this crate; DashMap keeps
/// registration safe without explicit locking.
#[derive(Debug, Default)]
pub struct StreamListenerRegistry {
    listeners: DashMap<String, StreamListener>,
    senders: DashMap<String, Option<String>>,
    max_concurrent_calls: RwLock<Option<u32>>,
}

impl StreamListenerRegistry {
    pub fn listener(&self, hub: &str) -> Option<StreamListener> {
        self.listeners.get(hub).map(|entry| entry.value().clone())
    }

    pub fn has_listener(&self, hub: &str) -> bool {
        self.listeners.contains_key(hub)
    }

    pub fn has_sender(&self, hub: &str) -> bool {
        self.senders.contains_key(hub)
    }

    pub fn max_concurrent_calls(&self) -> Option<u32> {
        *self.max_concurrent_calls.read()
    }

    fn register_listener(&self, listener: StreamListener) {
        debug!(hub = %listener.hub, consumer_group = %listener.consumer_group, "registered stream listener");
        self.listeners.insert(listener.hub.clone(), listener);
    }

    fn register_sender(&self, hub: &str, connection: Option<String>) {
        debug!(hub, "registered stream sender");
        self.senders.insert(hub.to_string(), connection);
    }

    fn apply_options(&self, options: MessagingOptions) {
        *self.max_concurrent_calls.write() = options.max_concurrent_calls;
    }
}

/// Provider for service-bus and event-stream binding types.
pub struct MessagingBindingProvider {
    registry: Arc<StreamListenerRegistry>,
    settings: AppSettings,
}

impl MessagingBindingProvider {
    pub fn new() -> Self {
        Self::with_settings(AppSettings::new())
    }

    pub fn with_settings(settings: AppSettings) -> Self {
        Self {
            registry: Arc::new(StreamListenerRegistry::default()),
            settings,
        }
    }

    /// Shared listener registry, for the host's stream plumbing.
    pub fn registry(&self) -> Arc<StreamListenerRegistry> {
        self.registry.clone()
    }
}

impl Default for MessagingBindingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl BindingProvider for MessagingBindingProvider {
    fn name(&self) -> &str {
        "messaging"
    }

    fn initialize(&self, host_metadata: &Value) -> Result<()> {
        // host metadata keys match case-insensitively, like binding keys
        let section = host_metadata.as_object().and_then(|object| {
            object
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("serviceBus"))
                .map(|(_, value)| value)
        });
        if let Some(section) = section {
            let options: MessagingOptions = serde_json::from_value(section.clone())?;
            self.registry.apply_options(options);
        }
        Ok(())
    }

    fn try_create(&self, metadata: &MetadataMap) -> Result<Option<Box<dyn CapabilityDescriptor>>> {
        if metadata.type_is("serviceBus") || metadata.type_is("serviceBusTrigger") {
            return Ok(Some(Box::new(ServiceBusDescriptor::from_metadata(
                metadata,
            )?)));
        }
        if metadata.type_is("eventHub") || metadata.type_is("eventHubTrigger") {
            return Ok(Some(Box::new(EventStreamDescriptor::from_metadata(
                metadata,
                self.registry.clone(),
                &self.settings,
            )?)));
        }
        Ok(None)
    }
}

struct ServiceBusDescriptor {
    metadata: MetadataMap,
    queue_name: Option<String>,
    topic_name: Option<String>,
    subscription_name: Option<String>,
    access_rights: AccessRights,
}

impl ServiceBusDescriptor {
    fn from_metadata(metadata: &MetadataMap) -> Result<Self> {
        let queue_name = metadata.get_text("queueName").map(str::to_string);
        let topic_name = metadata.get_text("topicName").map(str::to_string);
        let subscription_name = metadata.get_text("subscriptionName").map(str::to_string);
        // unrecognized access-rights strings fall back to the default
        let access_rights = metadata
            .get_str("accessRights")
            .and_then(AccessRights::parse)
            .unwrap_or_default();

        let has_subscription = topic_name.is_some() && subscription_name.is_some();
        if metadata.is_trigger() {
            if !has_subscription && queue_name.is_none() {
                return Err(BindError::InvalidBindingConfiguration {
                    binding: metadata.name().to_string(),
                    reason: "service bus trigger requires 'queueName' or 'topicName' plus 'subscriptionName'".to_string(),
                });
            }
        } else if queue_name.is_none() && topic_name.is_none() {
            return Err(BindError::InvalidBindingConfiguration {
                binding: metadata.name().to_string(),
                reason: "service bus binding requires a 'queueName' or 'topicName'".to_string(),
            });
        }

        Ok(Self {
            metadata: metadata.clone(),
            queue_name,
            topic_name,
            subscription_name,
            access_rights,
        })
    }
}

impl CapabilityDescriptor for ServiceBusDescriptor {
    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn default_value_shape(&self) -> ValueShape {
        message_value_shape(self.direction(), self.metadata.data_type_hint())
    }

    fn build_capabilities(&self) -> Result<Vec<CapabilityBlueprint>> {
        let mut values = NamedValues::new();
        values.insert(
            "accessRights",
            Value::String(self.access_rights.as_str().to_string()),
        );

        let shape = if self.is_trigger() {
            if let Some(queue) = &self.queue_name {
                values.insert("queueName", Value::String(queue.clone()));
            }
            if let Some(topic) = &self.topic_name {
                values.insert("topicName", Value::String(topic.clone()));
            }
            if let Some(subscription) = &self.subscription_name {
                values.insert("subscriptionName", Value::String(subscription.clone()));
            }
            if let Some(sessions) = self.metadata.get("isSessionsEnabled") {
                values.insert("isSessionsEnabled", sessions.clone());
            }
            SERVICE_BUS_TRIGGER_SHAPE.clone()
        } else {
            let entity = self
                .queue_name
                .clone()
                .or_else(|| self.topic_name.clone())
                .ok_or_else(|| BindError::InvalidBindingConfiguration {
                    binding: self.metadata.name().to_string(),
                    reason: "service bus binding requires a 'queueName' or 'topicName'"
                        .to_string(),
                })?;
            values.insert("entityPath", Value::String(entity));
            SERVICE_BUS_SHAPE.clone()
        };

        let mut capabilities = vec![CapabilityBlueprint::new(shape, values)];
        if let Some(account) = self.metadata.get_text("connection") {
            let mut account_values = NamedValues::new();
            account_values.insert("account", Value::String(account.to_string()));
            capabilities.push(CapabilityBlueprint::new(
                SERVICE_BUS_ACCOUNT_SHAPE.clone(),
                account_values,
            ));
        }
        Ok(capabilities)
    }
}

struct EventStreamDescriptor {
    metadata: MetadataMap,
    hub: String,
    consumer_group: String,
    connection: Option<String>,
    registry: Arc<StreamListenerRegistry>,
}

impl EventStreamDescriptor {
    fn from_metadata(
        metadata: &MetadataMap,
        registry: Arc<StreamListenerRegistry>,
        settings: &AppSettings,
    ) -> Result<Self> {
        let hub = metadata
            .get_text("path")
            .ok_or_else(|| BindError::InvalidBindingConfiguration {
                binding: metadata.name().to_string(),
                reason: "event stream binding requires a 'path' field".to_string(),
            })?
            .to_string();

        let consumer_group = metadata
            .get_text("consumerGroup")
            .unwrap_or(DEFAULT_CONSUMER_GROUP)
            .to_string();

        // `connection` names an app setting holding the connection string
        let connection = metadata
            .get_text("connection")
            .and_then(|name| settings.resolve(name));

        Ok(Self {
            metadata: metadata.clone(),
            hub,
            consumer_group,
            connection,
            registry,
        })
    }
}

impl CapabilityDescriptor for EventStreamDescriptor {
    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn default_value_shape(&self) -> ValueShape {
        message_value_shape(self.direction(), self.metadata.data_type_hint())
    }

    fn build_capabilities(&self) -> Result<Vec<CapabilityBlueprint>> {
        let mut values = NamedValues::new();
        values.insert("path", Value::String(self.hub.clone()));

        let shape = if self.is_trigger() {
            self.registry.register_listener(StreamListener {
                host_id: Uuid::new_v4().to_string(),
                hub: self.hub.clone(),
                consumer_group: self.consumer_group.clone(),
                connection: self.connection.clone(),
            });
            EVENT_HUB_TRIGGER_SHAPE.clone()
        } else {
            self.registry
                .register_sender(&self.hub, self.connection.clone());
            EVENT_HUB_SHAPE.clone()
        };

        Ok(vec![CapabilityBlueprint::new(shape, values)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::construct;
    use serde_json::json;

    fn create(provider: &MessagingBindingProvider, declaration: Value) -> Box<dyn CapabilityDescriptor> {
        let metadata = MetadataMap::from_value(&declaration).unwrap();
        provider
            .try_create(&metadata)
            .unwrap()
            .expect("type should be claimed")
    }

    // ═══════════════════════════════════════════════════════════════
    // Service bus
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn topic_subscription_wins_over_queue() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({
                "type": "serviceBusTrigger",
                "queueName": "orders",
                "topicName": "events",
                "subscriptionName": "audit"
            }),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        let blueprint = &capabilities[0];

        let plan = construct(&blueprint.values, &blueprint.shape).unwrap();
        let instance = blueprint.shape.instantiate(&plan);
        assert_eq!(instance.type_name(), "ServiceBusTrigger");
        assert_eq!(instance.text("topicName"), Some("events"));
        assert_eq!(instance.text("subscriptionName"), Some("audit"));
        assert_eq!(instance.field("queueName"), None);
    }

    #[test]
    fn queue_only_trigger_binds_the_queue_signature() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({"type": "serviceBusTrigger", "queueName": "orders"}),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        let blueprint = &capabilities[0];

        let plan = construct(&blueprint.values, &blueprint.shape).unwrap();
        let instance = blueprint.shape.instantiate(&plan);
        assert_eq!(instance.text("queueName"), Some("orders"));
        assert_eq!(instance.text("accessRights"), Some("manage"));
        // shape default applies when the declaration says nothing
        assert_eq!(instance.field("isSessionsEnabled"), Some(&json!(false)));
    }

    #[test]
    fn sessions_flag_backfills_from_metadata() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({
                "type": "serviceBusTrigger",
                "queueName": "orders",
                "isSessionsEnabled": true
            }),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        let blueprint = &capabilities[0];
        let plan = construct(&blueprint.values, &blueprint.shape).unwrap();
        let instance = blueprint.shape.instantiate(&plan);
        assert_eq!(instance.field("isSessionsEnabled"), Some(&json!(true)));
    }

    #[test]
    fn trigger_without_entity_is_rejected() {
        let provider = MessagingBindingProvider::new();
        let metadata = MetadataMap::from_value(
            &json!({"type": "serviceBusTrigger", "name": "msg", "topicName": "events"}),
        )
        .unwrap();
        // topic without subscription is not a valid combination
        let err = provider.try_create(&metadata).unwrap_err();
        assert_eq!(err.code(), "FNB-040");
        assert!(err.to_string().contains("msg"));
    }

    #[test]
    fn out_binding_addresses_the_entity_path() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({"type": "serviceBus", "topicName": "events", "direction": "out"}),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        let blueprint = &capabilities[0];
        let plan = construct(&blueprint.values, &blueprint.shape).unwrap();
        let instance = blueprint.shape.instantiate(&plan);
        assert_eq!(instance.type_name(), "ServiceBus");
        assert_eq!(instance.text("entityPath"), Some("events"));
    }

    #[test]
    fn access_rights_parse_with_silent_default() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({
                "type": "serviceBusTrigger",
                "queueName": "orders",
                "accessRights": "listen"
            }),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        assert_eq!(
            capabilities[0].values.get("accessRights"),
            Some(&json!("listen"))
        );

        let fallback = create(
            &provider,
            json!({
                "type": "serviceBusTrigger",
                "queueName": "orders",
                "accessRights": "everything"
            }),
        );
        let capabilities = fallback.build_capabilities().unwrap();
        assert_eq!(
            capabilities[0].values.get("accessRights"),
            Some(&json!("manage"))
        );
    }

    #[test]
    fn connection_adds_a_secondary_account_capability() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({
                "type": "serviceBus",
                "queueName": "orders",
                "direction": "out",
                "connection": "MyServiceBus"
            }),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        assert_eq!(capabilities.len(), 2);
        assert_eq!(capabilities[1].shape.type_name(), "ServiceBusAccount");
    }

    // ═══════════════════════════════════════════════════════════════
    // Event streams
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn trigger_registers_a_listener_with_default_consumer_group() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({"type": "eventHubTrigger", "path": "telemetry"}),
        );
        descriptor.build_capabilities().unwrap();

        let listener = provider.registry().listener("telemetry").unwrap();
        assert_eq!(listener.consumer_group, "$Default");
        assert!(!listener.host_id.is_empty());
        assert_eq!(listener.connection, None);
    }

    #[test]
    fn listener_connection_resolves_through_app_settings() {
        let mut settings = AppSettings::new();
        settings.insert("HubConnection", "Endpoint=sb://hub");
        let provider = MessagingBindingProvider::with_settings(settings);
        let descriptor = create(
            &provider,
            json!({
                "type": "eventHubTrigger",
                "path": "telemetry",
                "consumerGroup": "workers",
                "connection": "HubConnection"
            }),
        );
        descriptor.build_capabilities().unwrap();

        let listener = provider.registry().listener("telemetry").unwrap();
        assert_eq!(listener.consumer_group, "workers");
        assert_eq!(listener.connection.as_deref(), Some("Endpoint=sb://hub"));
    }

    #[test]
    fn out_binding_registers_a_sender() {
        let provider = MessagingBindingProvider::new();
        let descriptor = create(
            &provider,
            json!({"type": "eventHub", "path": "telemetry", "direction": "out"}),
        );
        let capabilities = descriptor.build_capabilities().unwrap();
        assert_eq!(capabilities[0].shape.type_name(), "EventHub");
        assert!(provider.registry().has_sender("telemetry"));
        assert!(!provider.registry().has_listener("telemetry"));
    }

    #[test]
    fn stream_without_path_is_rejected() {
        let provider = MessagingBindingProvider::new();
        let metadata = MetadataMap::from_value(&json!({"type": "eventHubTrigger"})).unwrap();
        let err = provider.try_create(&metadata).unwrap_err();
        assert_eq!(err.code(), "FNB-040");
    }

    // ═══════════════════════════════════════════════════════════════
    // Host-level initialization
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn initialize_applies_the_service_bus_section() {
        let provider = MessagingBindingProvider::new();
        provider
            .initialize(&json!({"serviceBus": {"maxConcurrentCalls": 32, "other": "ignored"}}))
            .unwrap();
        assert_eq!(provider.registry().max_concurrent_calls(), Some(32));
    }

    #[test]
    fn initialize_without_section_is_a_no_op() {
        let provider = MessagingBindingProvider::new();
        provider.initialize(&json!({})).unwrap();
        assert_eq!(provider.registry().max_concurrent_calls(), None);
    }

    #[test]
    fn initialize_section_key_is_case_insensitive() {
        let provider = MessagingBindingProvider::new();
        provider
            .initialize(&json!({"SERVICEBUS": {"maxConcurrentCalls": 8}}))
            .unwrap();
        assert_eq!(provider.registry().max_concurrent_calls(), Some(8));
    }
}
