use secp256k1::Error as SecpError;
use std::io;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    UnknownDenomination,
    InvalidStateTransition,
    WrongRole,
    NoActiveCoordinator,
    CoordinatorNotFound,
    SigningFailed,
    SignatureVerificationFailed,
    InvalidPublicKey,
    CryptoError,
    SerializationError,
    EncodingError,
    TransportError,
    LockPoisoned,
    ConfigError,
    StorageError,
    Message,
}

#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum MixError {
    #[error("amount {amount} matches no denomination")]
    UnknownDenomination { amount: u64 },

    #[error("invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("operation {operation} not available in {role} mode")]
    WrongRole { operation: String, role: String },

    #[error("no active coordinator identity")]
    NoActiveCoordinator,

    #[error("coordinator not found in directory: {0}")]
    CoordinatorNotFound(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("signature verification failed: {0}")]
    SignatureVerificationFailed(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("crypto error during {operation}: {details}")]
    CryptoError { operation: String, details: String },

    #[error("{format} serialization error: {details}")]
    SerializationError { format: String, details: String },

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("transport error during {operation}: {details}")]
    TransportError { operation: String, details: String },

    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("storage error during {operation}: {details}")]
    StorageError { operation: String, details: String },

    #[error("{0}")]
    Message(String),
}

pub type Result<T> = std::result::Result<T, MixError>;

impl MixError {
    pub fn code(&self) -> ErrorCode {
        match self {
            MixError::UnknownDenomination { .. } => ErrorCode::UnknownDenomination,
            MixError::InvalidStateTransition { .. } => ErrorCode::InvalidStateTransition,
            MixError::WrongRole { .. } => ErrorCode::WrongRole,
            MixError::NoActiveCoordinator => ErrorCode::NoActiveCoordinator,
            MixError::CoordinatorNotFound(_) => ErrorCode::CoordinatorNotFound,
            MixError::SigningFailed(_) => ErrorCode::SigningFailed,
            MixError::SignatureVerificationFailed(_) => ErrorCode::SignatureVerificationFailed,
            MixError::InvalidPublicKey(_) => ErrorCode::InvalidPublicKey,
            MixError::CryptoError { .. } => ErrorCode::CryptoError,
            MixError::SerializationError { .. } => ErrorCode::SerializationError,
            MixError::EncodingError(_) => ErrorCode::EncodingError,
            MixError::TransportError { .. } => ErrorCode::TransportError,
            MixError::LockPoisoned(_) => ErrorCode::LockPoisoned,
            MixError::ConfigError(_) => ErrorCode::ConfigError,
            MixError::StorageError { .. } => ErrorCode::StorageError,
            MixError::Message(_) => ErrorCode::Message,
        }
    }

    pub fn context(&self) -> ErrorContext {
        ErrorContext { code: self.code(), message: self.to_string() }
    }

    pub fn transport(operation: impl Into<String>, details: impl ToString) -> Self {
        MixError::TransportError { operation: operation.into(), details: details.to_string() }
    }

    pub fn wrong_role(operation: impl Into<String>, role: impl ToString) -> Self {
        MixError::WrongRole { operation: operation.into(), role: role.to_string() }
    }
}

impl From<hex::FromHexError> for MixError {
    fn from(err: hex::FromHexError) -> Self {
        MixError::EncodingError(format!("hex decode error: {}", err))
    }
}

impl From<toml::de::Error> for MixError {
    fn from(err: toml::de::Error) -> Self {
        MixError::ConfigError(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for MixError {
    fn from(err: toml::ser::Error) -> Self {
        MixError::SerializationError { format: "toml".to_string(), details: err.to_string() }
    }
}

impl From<figment::Error> for MixError {
    fn from(err: figment::Error) -> Self {
        MixError::ConfigError(format!("config extraction failed: {}", err))
    }
}

impl From<bincode::Error> for MixError {
    fn from(err: bincode::Error) -> Self {
        MixError::SerializationError { format: "bincode".to_string(), details: err.to_string() }
    }
}

#[macro_export]
macro_rules! serde_err {
    ($fmt:expr, $err:expr) => {
        $crate::foundation::MixError::SerializationError { format: $fmt.into(), details: $err.to_string() }
    };
}

impl From<io::Error> for MixError {
    fn from(err: io::Error) -> Self {
        MixError::StorageError { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for MixError {
    fn from(err: serde_json::Error) -> Self {
        MixError::SerializationError { format: "json".to_string(), details: err.to_string() }
    }
}

impl From<SecpError> for MixError {
    fn from(err: SecpError) -> Self {
        MixError::CryptoError { operation: "secp256k1".to_string(), details: err.to_string() }
    }
}
