//! Error types for the Huddle domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Huddle operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Completion provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool provider errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Reference resolution errors ---
    #[error("Reference error: {0}")]
    Reference(#[from] ReferenceError),

    // --- Plan parsing errors ---
    #[error("Plan error: {0}")]
    Plan(#[from] PlanError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the Completion Provider (the language model call).
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the Tool Provider.
///
/// `InvocationFailed` is the ToolInvocationError of the planning loop: it is
/// recorded against the action and the plan carries on.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool invocation failed: {tool_name}: {reason}")]
    InvocationFailed { tool_name: String, reason: String },

    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("Tool catalogue unavailable: {0}")]
    CatalogueUnavailable(String),

    #[error("Tool transport error: {0}")]
    Transport(String),
}

/// Failures resolving a `$name.path` reference against the working context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("Reference {reference} not found in context (no entry named '{root}')")]
    NotFound { reference: String, root: String },

    #[error("Reference {reference}: cannot index with '{segment}': {reason}")]
    Index {
        reference: String,
        segment: String,
        reason: String,
    },

    #[error("Reference {reference}: cannot access '{segment}': {reason}")]
    Field {
        reference: String,
        segment: String,
        reason: String,
    },
}

/// Failures interpreting the planner's output.
#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("Failed to parse plan: {reason}")]
    Parse { reason: String, raw: String },
}

impl PlanError {
    /// The offending completion text.
    pub fn raw(&self) -> &str {
        match self {
            Self::Parse { raw, .. } => raw,
        }
    }
}
