//! Layered error taxonomy for reasoning-engine operations.
//!
//! Each concern gets its own small `thiserror` enum; [`ReasoningError`]
//! aggregates them via `#[from]`. Only the HTTP boundary (`reasoning-api`)
//! converts a [`ReasoningError`] into the wire `{code, http_status}` pair
//! via [`ReasoningError::error_code`].

use thiserror::Error;

/// Retrieval/scoring errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RetrievalError {
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid score weights: w_sparse={w_sparse}, w_dense={w_dense}")]
    InvalidWeights { w_sparse: f64, w_dense: f64 },

    #[error("embedding request to {endpoint} failed: {reason}")]
    EmbeddingRequestFailed { endpoint: String, reason: String },
}

/// Secret cipher errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("secret must be at least 16 characters, got {len}")]
    SecretTooShort { len: usize },

    #[error("invalid secret token")]
    InvalidSecretToken,

    #[error("malformed ciphertext: {reason}")]
    MalformedCiphertext { reason: String },
}

/// LLM client / provider errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LlmError {
    #[error("no LLM provider configured for tenant")]
    ProviderNotConfigured,

    #[error("request to {provider} failed with status {status}: {message}")]
    RequestFailed {
        provider: String,
        status: i32,
        message: String,
    },

    #[error("invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },

    #[error("llm decision failed ({task}): {reason}")]
    DecisionFailed { task: String, reason: String },

    #[error("summarization failed: {reason}")]
    SummarizationFailed { reason: String },
}

/// Request/value validation errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("provider not supported: {provider}")]
    ProviderNotSupported { provider: String },
}

/// Durable storage errors.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    #[error("insert failed for {entity}: {reason}")]
    InsertFailed { entity: String, reason: String },

    #[error("update failed for {entity} {id}: {reason}")]
    UpdateFailed {
        entity: String,
        id: String,
        reason: String,
    },

    #[error("conflict creating {entity}: {reason}")]
    Conflict { entity: String, reason: String },

    #[error("transaction failed: {reason}")]
    TransactionFailed { reason: String },
}

/// Reasoning-engine (state graph) errors - the node-level failure modes
/// that are not themselves a suspension (`waiting_clarification` /
/// `waiting_confirmation` are not errors, see §7 of the specification).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("no data attribute matched the query")]
    NoAttributeMatch,

    #[error("no ontology matched the query")]
    NoOntologyMatch,

    #[error("anchor ontology {code} is missing from the tenant catalog")]
    AnchorOntologyMissing { code: String },

    #[error("ontology {code} has neither capabilities nor object properties to execute")]
    NoExecutableResource { code: String },

    #[error("object property {code} has no target ontology candidates outside the anchor")]
    NoTargetOntologyCandidates { code: String },

    #[error("session {session_id} is already terminal ({status})")]
    SessionTerminal { session_id: String, status: String },

    #[error("session {session_id} has a pending clarification and cannot advance")]
    PendingClarification { session_id: String },
}

/// The umbrella error type for all reasoning-engine operations.
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Result type alias for reasoning-engine operations.
pub type ReasoningResult<T> = Result<T, ReasoningError>;

/// The §7 wire error taxonomy: an integer code plus its default HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorCode {
    pub code: i32,
    pub http_status: u16,
}

impl ReasoningError {
    /// Map this error onto the wire `{code, http_status}` pair.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            ReasoningError::Validation(_) => ErrorCode {
                code: 1001,
                http_status: 400,
            },
            ReasoningError::Storage(StorageError::NotFound { .. }) => ErrorCode {
                code: 1002,
                http_status: 404,
            },
            ReasoningError::Storage(StorageError::Conflict { .. }) => ErrorCode {
                code: 1003,
                http_status: 409,
            },
            ReasoningError::Engine(EngineError::NoAttributeMatch)
            | ReasoningError::Engine(EngineError::NoOntologyMatch)
            | ReasoningError::Engine(EngineError::AnchorOntologyMissing { .. })
            | ReasoningError::Engine(EngineError::NoExecutableResource { .. })
            | ReasoningError::Engine(EngineError::NoTargetOntologyCandidates { .. }) => {
                ErrorCode {
                    code: 1001,
                    http_status: 400,
                }
            }
            ReasoningError::Engine(EngineError::SessionTerminal { .. }) => ErrorCode {
                code: 1002,
                http_status: 404,
            },
            ReasoningError::Engine(EngineError::PendingClarification { .. }) => ErrorCode {
                code: 1003,
                http_status: 409,
            },
            // §8 scenario 4: an LLM-unreachable run is still an internal
            // failure (code 9000) but reported as a 400, matching the
            // original's `AppError` default for INTERNAL.
            ReasoningError::Llm(_) => ErrorCode {
                code: 9000,
                http_status: 400,
            },
            ReasoningError::Config(_)
            | ReasoningError::Retrieval(_)
            | ReasoningError::Crypto(_)
            | ReasoningError::Storage(_) => ErrorCode {
                code: 9000,
                http_status: 500,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_1001() {
        let err: ReasoningError = ValidationError::RequiredFieldMissing {
            field: "user_input".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), ErrorCode { code: 1001, http_status: 400 });
    }

    #[test]
    fn not_found_maps_to_1002() {
        let err: ReasoningError = StorageError::NotFound {
            entity: "session".to_string(),
            id: "abc".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), ErrorCode { code: 1002, http_status: 404 });
    }

    #[test]
    fn llm_failure_maps_to_internal_reported_as_400() {
        let err: ReasoningError = LlmError::DecisionFailed {
            task: "select_anchor_ontologies".to_string(),
            reason: "unreachable host".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), ErrorCode { code: 9000, http_status: 400 });
        assert!(err.to_string().contains("llm decision failed"));
    }

    #[test]
    fn no_executable_resource_maps_to_validation() {
        let err: ReasoningError = EngineError::NoExecutableResource {
            code: "user_profile".to_string(),
        }
        .into();
        assert_eq!(err.error_code(), ErrorCode { code: 1001, http_status: 400 });
    }
}
