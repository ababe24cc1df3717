//! Binding Error Types with Error Codes
//!
//! Error code ranges:
//! - FNB-000-009: metadata errors
//! - FNB-010-019: construction engine errors
//! - FNB-020-029: template errors
//! - FNB-030-039: provider/registry errors
//! - FNB-040-049: descriptor configuration errors
//! - FNB-050-069: bind/dispatch errors
//! - FNB-090-099: IO/JSON errors

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindError>;

/// All error variants are part of the public API.
///
/// Implements both `thiserror::Error` for std error compatibility
/// and `miette::Diagnostic` for fancy terminal error display.
#[derive(Error, Debug, Diagnostic)]
#[diagnostic(url(docsrs))]
pub enum BindError {
    // ═══════════════════════════════════════════
    // METADATA ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[FNB-001] Binding '{binding}' metadata is not a JSON object")]
    #[diagnostic(
        code(fnbind::metadata_not_object),
        help("Each binding declaration must be a JSON object with at least a 'type' field")
    )]
    MetadataNotObject { binding: String },

    #[error("[FNB-002] Binding '{binding}' has no 'type' field")]
    #[diagnostic(
        code(fnbind::missing_binding_type),
        help("Add a string 'type' field naming the binding kind (e.g. 'queue', 'blobTrigger')")
    )]
    MissingBindingType { binding: String },

    #[error("[FNB-003] Binding '{binding}' has invalid direction '{value}'")]
    #[diagnostic(
        code(fnbind::invalid_direction),
        help("Direction must be 'in', 'out' or 'inout' (default 'in')")
    )]
    InvalidDirection { binding: String, value: String },

    // ═══════════════════════════════════════════
    // CONSTRUCTION ENGINE ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[FNB-010] No construction signature of capability '{capability}' is satisfied by the available fields")]
    #[diagnostic(
        code(fnbind::no_matching_signature),
        help("Check that the binding declaration supplies every field of at least one signature")
    )]
    NoMatchingSignature { capability: String },

    // ═══════════════════════════════════════════
    // TEMPLATE ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[FNB-020] Unresolved placeholder '{{{placeholder}}}' in template '{template}'")]
    #[diagnostic(
        code(fnbind::unresolved_placeholder),
        help("The invocation context has no value for this placeholder; check the trigger payload fields")
    )]
    UnresolvedPlaceholder {
        placeholder: String,
        template: String,
    },

    // ═══════════════════════════════════════════
    // PROVIDER/REGISTRY ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[FNB-030] Binding '{binding}': no provider claims type '{binding_type}'")]
    #[diagnostic(
        code(fnbind::unknown_binding_type),
        help("Register a provider for this type or fix the 'type' field")
    )]
    UnknownBindingType {
        binding: String,
        binding_type: String,
    },

    #[error("[FNB-031] Binding type '{binding_type}' is claimed by multiple providers: {providers}")]
    #[diagnostic(
        code(fnbind::provider_selection_ambiguous),
        help("Overlapping provider claims are a host configuration error; remove one of the claimants")
    )]
    ProviderSelectionAmbiguous {
        binding_type: String,
        providers: String,
    },

    #[error("[FNB-032] Provider '{provider}' initialization failed: {reason}")]
    #[diagnostic(code(fnbind::provider_init))]
    ProviderInit { provider: String, reason: String },

    // ═══════════════════════════════════════════
    // DESCRIPTOR CONFIGURATION ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[FNB-040] Binding '{binding}' is misconfigured: {reason}")]
    #[diagnostic(code(fnbind::invalid_binding_configuration))]
    InvalidBindingConfiguration { binding: String, reason: String },

    // ═══════════════════════════════════════════
    // BIND/DISPATCH ERRORS (050-069)
    // ═══════════════════════════════════════════
    #[error("[FNB-050] Binding '{binding}': value shape '{shape}' is not usable with access '{direction}'")]
    #[diagnostic(
        code(fnbind::unsupported_value_shape),
        help("Fetching shapes (rawBytes/text/structuredObject) are read-only; use a collector or stream to write")
    )]
    UnsupportedValueShape {
        binding: String,
        shape: String,
        direction: String,
    },

    #[error("[FNB-051] Binding '{binding}' has no write collector")]
    #[diagnostic(
        code(fnbind::no_collector),
        help("append() is only valid for bindings with a writeCollector value shape")
    )]
    NoCollector { binding: String },

    #[error("[FNB-052] Cannot decode payload as {target}: {reason}")]
    #[diagnostic(code(fnbind::payload_decode))]
    PayloadDecode { target: String, reason: String },

    #[error("[FNB-060] Channel error: {reason}")]
    #[diagnostic(code(fnbind::channel))]
    Channel { reason: String },

    // ═══════════════════════════════════════════
    // IO/JSON ERRORS (090-099)
    // ═══════════════════════════════════════════
    #[error("[FNB-090] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[FNB-091] JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BindError {
    /// Get the error code (e.g., "FNB-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::MetadataNotObject { .. } => "FNB-001",
            Self::MissingBindingType { .. } => "FNB-002",
            Self::InvalidDirection { .. } => "FNB-003",
            Self::NoMatchingSignature { .. } => "FNB-010",
            Self::UnresolvedPlaceholder { .. } => "FNB-020",
            Self::UnknownBindingType { .. } => "FNB-030",
            Self::ProviderSelectionAmbiguous { .. } => "FNB-031",
            Self::ProviderInit { .. } => "FNB-032",
            Self::InvalidBindingConfiguration { .. } => "FNB-040",
            Self::UnsupportedValueShape { .. } => "FNB-050",
            Self::NoCollector { .. } => "FNB-051",
            Self::PayloadDecode { .. } => "FNB-052",
            Self::Channel { .. } => "FNB-060",
            Self::Io(_) => "FNB-090",
            Self::Json(_) => "FNB-091",
        }
    }

    /// Whether the error is scoped to a single invocation.
    ///
    /// Invocation-scoped errors abort one invocation and leave the function
    /// registration intact; everything else is a configuration error that
    /// aborts the affected function's registration.
    pub fn is_invocation_scoped(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedPlaceholder { .. }
                | Self::NoCollector { .. }
                | Self::PayloadDecode { .. }
                | Self::Channel { .. }
        )
    }

    /// Shorthand for backend channel failures.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::Channel {
            reason: reason.into(),
        }
    }
}
