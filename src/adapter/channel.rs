//! Value-Shape Channel Interface
//!
//! The backend side of a bind: something that can fetch a whole value, open
//! a byte stream, or hand out an append-only collector for a capability
//! instance. Implementations belong to the out-of-scope backend providers;
//! this crate only defines the contract and the payload coercions.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

use crate::engine::CapabilityInstance;
use crate::error::{BindError, Result};

/// A bound value in one of the three whole-value forms.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Bytes),
    Text(String),
    Structured(Value),
}

impl Payload {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "text",
            Self::Structured(_) => "structured",
        }
    }

    /// Coerce to raw bytes. Text becomes UTF-8; structured values become
    /// compact JSON.
    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text) => Ok(Bytes::from(text.into_bytes())),
            Self::Structured(value) => Ok(Bytes::from(serde_json::to_vec(&value)?)),
        }
    }

    /// Coerce to text. Bytes must be valid UTF-8; structured strings
    /// unwrap, other structured values render as compact JSON.
    pub fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(bytes) => String::from_utf8(bytes.to_vec()).map_err(|err| {
                BindError::PayloadDecode {
                    target: "text".to_string(),
                    reason: err.to_string(),
                }
            }),
            Self::Structured(Value::String(text)) => Ok(text),
            Self::Structured(value) => Ok(value.to_string()),
        }
    }

    /// Coerce to a structured object. Text and bytes must parse as JSON.
    pub fn into_structured(self) -> Result<Value> {
        match self {
            Self::Structured(value) => Ok(value),
            Self::Text(text) => {
                serde_json::from_str(&text).map_err(|err| BindError::PayloadDecode {
                    target: "structured object".to_string(),
                    reason: err.to_string(),
                })
            }
            Self::Bytes(bytes) => {
                serde_json::from_slice(&bytes).map_err(|err| BindError::PayloadDecode {
                    target: "structured object".to_string(),
                    reason: err.to_string(),
                })
            }
        }
    }
}

/// A scoped byte stream, open for the duration of one invocation.
#[async_trait]
pub trait ByteStream: Send {
    /// Next chunk, `None` at end of stream.
    async fn read(&mut self) -> Result<Option<Bytes>>;

    async fn write(&mut self, chunk: Bytes) -> Result<()>;

    /// Graceful close; called exactly once by `BoundBinding::release`.
    async fn close(&mut self) -> Result<()>;

    /// Best-effort synchronous release for abandoned bindings.
    fn abort(&mut self);
}

/// Append-only sink for write-collector bindings; values are flushed at
/// invocation end.
#[async_trait]
pub trait Collector: Send {
    async fn append(&mut self, value: Payload) -> Result<()>;

    /// Flush buffered values; called exactly once at release.
    async fn flush(&mut self) -> Result<()>;

    /// Best-effort synchronous release for abandoned bindings.
    fn abort(&mut self);
}

/// Backend source/sink for capability instances.
#[async_trait]
pub trait ValueChannel: Send + Sync {
    async fn read_all(&self, target: &CapabilityInstance) -> Result<Payload>;

    async fn open_read(&self, target: &CapabilityInstance) -> Result<Box<dyn ByteStream>>;

    async fn open_write(&self, target: &CapabilityInstance) -> Result<Box<dyn ByteStream>>;

    async fn collector(&self, target: &CapabilityInstance) -> Result<Box<dyn Collector>>;
}
