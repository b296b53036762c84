//! Error types
//!
//! Two layers of errors are surfaced by the crate:
//!
//! - [`TransportError`]: status of a single call into the transport. Two of its
//!   variants, [`TransportError::WouldBlock`] and [`TransportError::TimedOut`],
//!   are benign and recovered from locally by the reactor.
//! - [`RclError`]: everything a spin cycle or an endpoint operation can fail
//!   with, including payload codec failures and user callback failures.

use crate::transport::{Category, RawHandle};
use thiserror::Error;

/// Error produced by a user callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for transport calls.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for reactor and endpoint operations.
pub type RclResult<T> = Result<T, RclError>;

/// Numeric return codes of the native client layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum RetCode {
    Ok = 0,
    Error = 1,
    Timeout = 2,
    Unsupported = 3,
    BadAlloc = 10,
    InvalidArgument = 11,
    AlreadyInit = 100,
    NotInit = 101,
    NodeInvalid = 200,
    NodeInvalidName = 201,
    NodeInvalidNamespace = 202,
    SubscriptionTakeFailed = 401,
    ClientTakeFailed = 501,
    ServiceTakeFailed = 601,
    WaitSetInvalid = 900,
    WaitSetEmpty = 901,
    WaitSetFull = 902,
}

impl RetCode {
    /// Convert a raw status value. Unknown values map to [`RetCode::Error`].
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => RetCode::Ok,
            2 => RetCode::Timeout,
            3 => RetCode::Unsupported,
            10 => RetCode::BadAlloc,
            11 => RetCode::InvalidArgument,
            100 => RetCode::AlreadyInit,
            101 => RetCode::NotInit,
            200 => RetCode::NodeInvalid,
            201 => RetCode::NodeInvalidName,
            202 => RetCode::NodeInvalidNamespace,
            401 => RetCode::SubscriptionTakeFailed,
            501 => RetCode::ClientTakeFailed,
            601 => RetCode::ServiceTakeFailed,
            900 => RetCode::WaitSetInvalid,
            901 => RetCode::WaitSetEmpty,
            902 => RetCode::WaitSetFull,
            _ => RetCode::Error,
        }
    }

    pub fn as_raw(self) -> i32 {
        self as i32
    }
}

/// Status of a call into the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("wait set is full for {category} entries (capacity {capacity})")]
    CapacityExceeded { category: Category, capacity: usize },

    /// Readiness was reported but nothing was left to take.
    #[error("nothing to take from {0}")]
    WouldBlock(Category),

    #[error("wait timed out")]
    TimedOut,

    #[error("transport is not initialized")]
    NotInitialized,

    #[error("transport is already initialized")]
    AlreadyInitialized,

    #[error("invalid handle {0}")]
    InvalidHandle(RawHandle),

    #[error("payload type mismatch: expected `{expected}`, got `{actual}`")]
    TypeMismatch { expected: String, actual: String },

    #[error("{operation}() failed: {message}")]
    Failure {
        operation: &'static str,
        message: String,
    },
}

impl TransportError {
    /// Build an error from a native return code.
    ///
    /// Take failures become [`TransportError::WouldBlock`] for the matching
    /// category. Codes without a dedicated variant become
    /// [`TransportError::Failure`] carrying `operation` and `message`.
    pub fn from_code(code: i32, operation: &'static str, message: impl Into<String>) -> Self {
        let message = message.into();
        match RetCode::from_raw(code) {
            RetCode::Timeout => TransportError::TimedOut,
            RetCode::BadAlloc => TransportError::ResourceExhausted(message),
            RetCode::InvalidArgument
            | RetCode::NodeInvalidName
            | RetCode::NodeInvalidNamespace => TransportError::InvalidArgument(message),
            RetCode::AlreadyInit => TransportError::AlreadyInitialized,
            RetCode::NotInit => TransportError::NotInitialized,
            RetCode::SubscriptionTakeFailed => TransportError::WouldBlock(Category::Subscription),
            RetCode::ServiceTakeFailed => TransportError::WouldBlock(Category::Service),
            RetCode::ClientTakeFailed => TransportError::WouldBlock(Category::Client),
            _ => TransportError::Failure { operation, message },
        }
    }

    /// Native return code equivalent to this error.
    pub fn code(&self) -> RetCode {
        match self {
            TransportError::InvalidArgument(_) => RetCode::InvalidArgument,
            TransportError::ResourceExhausted(_) => RetCode::BadAlloc,
            TransportError::CapacityExceeded { .. } => RetCode::WaitSetFull,
            TransportError::WouldBlock(Category::Subscription) => RetCode::SubscriptionTakeFailed,
            TransportError::WouldBlock(Category::Service) => RetCode::ServiceTakeFailed,
            TransportError::WouldBlock(Category::Client) => RetCode::ClientTakeFailed,
            TransportError::WouldBlock(Category::GuardCondition) => RetCode::Error,
            TransportError::TimedOut => RetCode::Timeout,
            TransportError::NotInitialized => RetCode::NotInit,
            TransportError::AlreadyInitialized => RetCode::AlreadyInit,
            TransportError::InvalidHandle(_) => RetCode::InvalidArgument,
            TransportError::TypeMismatch { .. } => RetCode::InvalidArgument,
            TransportError::Failure { .. } => RetCode::Error,
        }
    }

    pub fn is_would_block(&self) -> bool {
        matches!(self, TransportError::WouldBlock(_))
    }

    /// Whether the reactor recovers from this error locally.
    pub fn is_benign(&self) -> bool {
        matches!(
            self,
            TransportError::WouldBlock(_) | TransportError::TimedOut
        )
    }
}

/// Errors surfaced by spin cycles and endpoint operations.
#[derive(Debug, Error)]
pub enum RclError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("failed to encode `{type_name}`: {source}")]
    Encode {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode `{type_name}`: {source}")]
    Decode {
        type_name: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{category} callback failed: {source}")]
    Callback {
        category: Category,
        #[source]
        source: CallbackError,
    },

    #[error("take on {0} succeeded without a sequence number")]
    MissingSequenceNumber(Category),
}

impl RclError {
    /// The transport error behind this failure, if any.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            RclError::Transport(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_callback_failure(&self) -> bool {
        matches!(self, RclError::Callback { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_failures_map_to_would_block() {
        let err = TransportError::from_code(401, "take", "empty");
        assert_eq!(err, TransportError::WouldBlock(Category::Subscription));
        assert!(err.is_would_block());

        let err = TransportError::from_code(601, "take_request", "empty");
        assert_eq!(err, TransportError::WouldBlock(Category::Service));

        let err = TransportError::from_code(501, "take_response", "empty");
        assert_eq!(err, TransportError::WouldBlock(Category::Client));
    }

    #[test]
    fn test_unknown_code_is_failure() {
        let err = TransportError::from_code(7777, "wait", "boom");
        assert_eq!(
            err,
            TransportError::Failure {
                operation: "wait",
                message: "boom".to_string()
            }
        );
        assert_eq!(err.code(), RetCode::Error);
        assert!(!err.is_benign());
    }

    #[test]
    fn test_code_round_trip_for_named_variants() {
        for code in [2, 10, 11, 100, 101, 401, 501, 601] {
            let err = TransportError::from_code(code, "op", "msg");
            assert_eq!(err.code().as_raw(), code);
        }
    }

    #[test]
    fn test_benign_errors() {
        assert!(TransportError::TimedOut.is_benign());
        assert!(TransportError::WouldBlock(Category::Client).is_benign());
        assert!(!TransportError::NotInitialized.is_benign());
        assert!(!TransportError::ResourceExhausted("x".into()).is_benign());
    }

    #[test]
    fn test_node_name_codes_are_invalid_argument() {
        let err = TransportError::from_code(201, "create_node", "bad name");
        assert!(matches!(err, TransportError::InvalidArgument(_)));
        let err = TransportError::from_code(202, "create_node", "bad namespace");
        assert!(matches!(err, TransportError::InvalidArgument(_)));
    }

    #[test]
    fn test_error_display() {
        let err = TransportError::CapacityExceeded {
            category: Category::Service,
            capacity: 2,
        };
        assert_eq!(
            err.to_string(),
            "wait set is full for service entries (capacity 2)"
        );
    }
}
