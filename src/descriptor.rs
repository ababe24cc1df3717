//! Capability Descriptors - one per binding declaration
//!
//! A descriptor is the polymorphic bridge between a parsed declaration and
//! the capabilities it requires. It derives direction and the trigger flag
//! from metadata, chooses the default value shape, and enumerates the
//! capability blueprints to construct (primary first).

use std::sync::Arc;

use crate::engine::{CapabilityShape, NamedValues};
use crate::error::Result;
use crate::metadata::{Direction, MetadataMap};

/// Item type collected by a write-collector binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorItem {
    RawBytes,
    StructuredObject,
}

/// How the adapter moves data for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    RawBytes,
    Text,
    StructuredObject,
    ByteStream,
    WriteCollector(CollectorItem),
}

impl ValueShape {
    pub fn is_collector(self) -> bool {
        matches!(self, Self::WriteCollector(_))
    }

    /// Display label for diagnostics and tracing.
    pub fn label(self) -> &'static str {
        match self {
            Self::RawBytes => "rawBytes",
            Self::Text => "text",
            Self::StructuredObject => "structuredObject",
            Self::ByteStream => "byteStream",
            Self::WriteCollector(CollectorItem::RawBytes) => "writeCollector(rawBytes)",
            Self::WriteCollector(CollectorItem::StructuredObject) => {
                "writeCollector(structuredObject)"
            }
        }
    }
}

/// One capability to construct: the shape plus the value bag the descriptor
/// assembled for it. String values may still contain unresolved templates.
#[derive(Debug, Clone)]
pub struct CapabilityBlueprint {
    pub shape: Arc<CapabilityShape>,
    pub values: NamedValues,
}

impl CapabilityBlueprint {
    pub fn new(shape: Arc<CapabilityShape>, values: NamedValues) -> Self {
        Self { shape, values }
    }
}

/// Polymorphic per-binding-kind abstraction. Implementations are immutable
/// after construction and safe to share across concurrent invocations.
pub trait CapabilityDescriptor: Send + Sync {
    /// The declaration this descriptor was built from, for diagnostics.
    fn metadata(&self) -> &MetadataMap;

    fn direction(&self) -> Direction {
        self.metadata().direction()
    }

    fn is_trigger(&self) -> bool {
        self.metadata().is_trigger()
    }

    /// Default value shape for this binding.
    fn default_value_shape(&self) -> ValueShape;

    /// Capability blueprints in a fixed, descriptor-defined order.
    ///
    /// The first blueprint is the primary capability; single-capability
    /// consumers use it alone.
    fn build_capabilities(&self) -> Result<Vec<CapabilityBlueprint>>;
}

impl std::fmt::Debug for dyn CapabilityDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityDescriptor")
            .field("metadata", self.metadata())
            .finish()
    }
}

/// Default shape for message-style bindings (queue, topic, event stream):
/// the read side honors the `dataType` hint, the write side collects raw
/// messages.
pub fn message_value_shape(direction: Direction, data_type_hint: Option<&str>) -> ValueShape {
    if direction == Direction::Read {
        match data_type_hint {
            Some(hint) if hint.eq_ignore_ascii_case("binary") => ValueShape::RawBytes,
            _ => ValueShape::Text,
        }
    } else {
        ValueShape::WriteCollector(CollectorItem::RawBytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_shape_read_defaults_to_text() {
        assert_eq!(
            message_value_shape(Direction::Read, None),
            ValueShape::Text
        );
    }

    #[test]
    fn message_shape_read_binary_hint_yields_raw_bytes() {
        assert_eq!(
            message_value_shape(Direction::Read, Some("binary")),
            ValueShape::RawBytes
        );
        assert_eq!(
            message_value_shape(Direction::Read, Some("BINARY")),
            ValueShape::RawBytes
        );
        assert_eq!(
            message_value_shape(Direction::Read, Some("string")),
            ValueShape::Text
        );
    }

    #[test]
    fn message_shape_write_is_raw_collector() {
        assert_eq!(
            message_value_shape(Direction::Write, None),
            ValueShape::WriteCollector(CollectorItem::RawBytes)
        );
        // inout is treated as a write for shape purposes
        assert_eq!(
            message_value_shape(Direction::ReadWrite, Some("binary")),
            ValueShape::WriteCollector(CollectorItem::RawBytes)
        );
    }

    #[test]
    fn shape_labels_are_distinct() {
        let shapes = [
            ValueShape::RawBytes,
            ValueShape::Text,
            ValueShape::StructuredObject,
            ValueShape::ByteStream,
            ValueShape::WriteCollector(CollectorItem::RawBytes),
            ValueShape::WriteCollector(CollectorItem::StructuredObject),
        ];
        for (i, a) in shapes.iter().enumerate() {
            for b in shapes.iter().skip(i + 1) {
                assert_ne!(a.label(), b.label());
            }
        }
        assert!(ValueShape::WriteCollector(CollectorItem::RawBytes).is_collector());
        assert!(!ValueShape::ByteStream.is_collector());
    }
}
