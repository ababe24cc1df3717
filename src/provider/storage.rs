//! Storage Binding Kinds - queue and blob
//!
//! Queue bindings are message-style: the read side honors the `dataType`
//! hint, the write side collects raw messages. Blob bindings always move
//! bytes as a stream, whichever direction they face. Both emit a secondary
//! `StorageAccount` capability when the declaration carries a `connection`
//! override.

use std::sync::{Arc, LazyLock};

use serde_json::Value;

use crate::descriptor::{
    message_value_shape, CapabilityBlueprint, CapabilityDescriptor, ValueShape,
};
use crate::engine::{CapabilityShape, NamedValues, ValueKind};
use crate::error::{BindError, Result};
use crate::metadata::MetadataMap;
use crate::provider::BindingProvider;

static QUEUE_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(CapabilityShape::new("Queue").with_signature(&[("queueName", ValueKind::Text)]))
});

static QUEUE_TRIGGER_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(
        CapabilityShape::new("QueueTrigger").with_signature(&[("queueName", ValueKind::Text)]),
    )
});

static BLOB_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(
        CapabilityShape::new("Blob")
            .with_signature(&[("path", ValueKind::Text), ("access", ValueKind::Text)])
            .with_signature(&[("path", ValueKind::Text)]),
    )
});

static BLOB_TRIGGER_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(CapabilityShape::new("BlobTrigger").with_signature(&[("path", ValueKind::Text)]))
});

static STORAGE_ACCOUNT_SHAPE: LazyLock<Arc<CapabilityShape>> = LazyLock::new(|| {
    Arc::new(
        CapabilityShape::new("StorageAccount").with_signature(&[("account", ValueKind::Text)]),
    )
});

/// Provider for the core storage-backed binding types.
pub struct StorageBindingProvider;

impl BindingProvider for StorageBindingProvider {
    fn name(&self) -> &str {
        "storage"
    }

    fn try_create(&self, metadata: &MetadataMap) -> Result<Option<Box<dyn CapabilityDescriptor>>> {
        if metadata.type_is("queue") || metadata.type_is("queueTrigger") {
            return Ok(Some(Box::new(QueueDescriptor::from_metadata(metadata)?)));
        }
        if metadata.type_is("blob") || metadata.type_is("blobTrigger") {
            return Ok(Some(Box::new(BlobDescriptor::from_metadata(metadata)?)));
        }
        Ok(None)
    }
}

/// Append the secondary account-override capability when `connection` is set.
fn push_storage_account(metadata: &MetadataMap, capabilities: &mut Vec<CapabilityBlueprint>) {
    if let Some(account) = metadata.get_text("connection") {
        let mut values = NamedValues::new();
        values.insert("account", Value::String(account.to_string()));
        capabilities.push(CapabilityBlueprint::new(
            STORAGE_ACCOUNT_SHAPE.clone(),
            values,
        ));
    }
}

struct QueueDescriptor {
    metadata: MetadataMap,
    queue_name: String,
}

impl QueueDescriptor {
    fn from_metadata(metadata: &MetadataMap) -> Result<Self> {
        let queue_name = metadata
            .get_text("queueName")
            .ok_or_else(|| BindError::InvalidBindingConfiguration {
                binding: metadata.name().to_string(),
                reason: "queue binding requires a 'queueName' field".to_string(),
            })?
            .to_string();

        Ok(Self {
            metadata: metadata.clone(),
            queue_name,
        })
    }
}

impl CapabilityDescriptor for QueueDescriptor {
    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn default_value_shape(&self) -> ValueShape {
        message_value_shape(self.direction(), self.metadata.data_type_hint())
    }

    fn build_capabilities(&self) -> Result<Vec<CapabilityBlueprint>> {
        let shape = if self.is_trigger() {
            QUEUE_TRIGGER_SHAPE.clone()
        } else {
            QUEUE_SHAPE.clone()
        };

        let mut values = NamedValues::new();
        values.insert("queueName", Value::String(self.queue_name.clone()));

        let mut capabilities = vec![CapabilityBlueprint::new(shape, values)];
        push_storage_account(&self.metadata, &mut capabilities);
        Ok(capabilities)
    }
}

struct BlobDescriptor {
    metadata: MetadataMap,
    path: String,
}

impl BlobDescriptor {
    fn from_metadata(metadata: &MetadataMap) -> Result<Self> {
        let path = metadata
            .get_text("path")
            .ok_or_else(|| BindError::InvalidBindingConfiguration {
                binding: metadata.name().to_string(),
                reason: "blob binding requires a 'path' field".to_string(),
            })?
            .to_string();

        Ok(Self {
            metadata: metadata.clone(),
            path,
        })
    }
}

impl CapabilityDescriptor for BlobDescriptor {
    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    // Blobs move bytes as a stream whichever direction they face.
    fn default_value_shape(&self) -> ValueShape {
        ValueShape::ByteStream
    }

    fn build_capabilities(&self) -> Result<Vec<CapabilityBlueprint>> {
        let mut values = NamedValues::new();
        values.insert("path", Value::String(self.path.clone()));

        let shape = if self.is_trigger() {
            BLOB_TRIGGER_SHAPE.clone()
        } else {
            values.insert(
                "access",
                Value::String(self.direction().access_str().to_string()),
            );
            BLOB_SHAPE.clone()
        };

        let mut capabilities = vec![CapabilityBlueprint::new(shape, values)];
        push_storage_account(&self.metadata, &mut capabilities);
        Ok(capabilities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CollectorItem;
    use crate::engine::construct;
    use serde_json::json;

    fn descriptor(declaration: Value) -> Box<dyn CapabilityDescriptor> {
        let metadata = MetadataMap::from_value(&declaration).unwrap();
        StorageBindingProvider
            .try_create(&metadata)
            .unwrap()
            .expect("type should be claimed")
    }

    // ═══════════════════════════════════════════════════════════════
    // Queue
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn queue_out_is_a_raw_collector_bound_to_the_queue() {
        let descriptor = descriptor(json!({
            "type": "queue", "queueName": "orders", "direction": "out"
        }));
        assert_eq!(
            descriptor.default_value_shape(),
            ValueShape::WriteCollector(CollectorItem::RawBytes)
        );

        let capabilities = descriptor.build_capabilities().unwrap();
        assert_eq!(capabilities.len(), 1);
        let blueprint = &capabilities[0];
        assert_eq!(blueprint.shape.type_name(), "Queue");

        let plan = construct(&blueprint.values, &blueprint.shape).unwrap();
        let instance = blueprint.shape.instantiate(&plan);
        assert_eq!(instance.text("queueName"), Some("orders"));
    }

    #[test]
    fn queue_trigger_uses_the_trigger_shape() {
        let descriptor = descriptor(json!({"type": "queueTrigger", "queueName": "orders"}));
        assert!(descriptor.is_trigger());
        let capabilities = descriptor.build_capabilities().unwrap();
        assert_eq!(capabilities[0].shape.type_name(), "QueueTrigger");
    }

    #[test]
    fn queue_read_honors_data_type_hint() {
        let text = descriptor(json!({"type": "queue", "queueName": "q"}));
        assert_eq!(text.default_value_shape(), ValueShape::Text);

        let binary = descriptor(json!({"type": "queue", "queueName": "q", "dataType": "binary"}));
        assert_eq!(binary.default_value_shape(), ValueShape::RawBytes);
    }

    #[test]
    fn queue_without_queue_name_is_rejected() {
        let metadata =
            MetadataMap::from_value(&json!({"type": "queue", "name": "input"})).unwrap();
        let err = StorageBindingProvider.try_create(&metadata).unwrap_err();
        assert_eq!(err.code(), "FNB-040");
        assert!(err.to_string().contains("input"));
    }

    #[test]
    fn connection_adds_a_secondary_account_capability() {
        let descriptor = descriptor(json!({
            "type": "queue", "queueName": "orders", "connection": "MyStorage"
        }));
        let capabilities = descriptor.build_capabilities().unwrap();
        assert_eq!(capabilities.len(), 2);
        // primary first, account override second
        assert_eq!(capabilities[0].shape.type_name(), "Queue");
        assert_eq!(capabilities[1].shape.type_name(), "StorageAccount");
        assert_eq!(
            capabilities[1].values.get("account"),
            Some(&json!("MyStorage"))
        );
    }

    // ═══════════════════════════════════════════════════════════════
    // Blob
    // ═══════════════════════════════════════════════════════════════

    #[test]
    fn blob_is_always_a_byte_stream() {
        for direction in ["in", "out", "inout"] {
            let descriptor = descriptor(json!({
                "type": "blob", "path": "c/b.txt", "direction": direction
            }));
            assert_eq!(descriptor.default_value_shape(), ValueShape::ByteStream);
        }
    }

    #[test]
    fn blob_non_trigger_binds_path_and_access() {
        let descriptor = descriptor(json!({
            "type": "blob", "path": "c/b.txt", "direction": "out"
        }));
        let capabilities = descriptor.build_capabilities().unwrap();
        let blueprint = &capabilities[0];

        let plan = construct(&blueprint.values, &blueprint.shape).unwrap();
        // two-param signature wins over the path-only fallback
        assert_eq!(plan.signature(), 0);

        let instance = blueprint.shape.instantiate(&plan);
        assert_eq!(instance.type_name(), "Blob");
        assert_eq!(instance.text("access"), Some("write"));
    }

    #[test]
    fn blob_trigger_binds_path_only() {
        let descriptor = descriptor(json!({"type": "blobTrigger", "path": "c/{name}"}));
        let capabilities = descriptor.build_capabilities().unwrap();
        let blueprint = &capabilities[0];
        assert_eq!(blueprint.shape.type_name(), "BlobTrigger");
        assert_eq!(blueprint.values.get("path"), Some(&json!("c/{name}")));
        assert!(!blueprint.values.contains("access"));
    }

    #[test]
    fn blob_without_path_is_rejected() {
        let metadata = MetadataMap::from_value(&json!({"type": "blob"})).unwrap();
        let err = StorageBindingProvider.try_create(&metadata).unwrap_err();
        assert_eq!(err.code(), "FNB-040");
    }

    #[test]
    fn unrelated_types_are_not_claimed() {
        let metadata = MetadataMap::from_value(&json!({"type": "eventHub"})).unwrap();
        assert!(StorageBindingProvider
            .try_create(&metadata)
            .unwrap()
            .is_none());
    }
}
