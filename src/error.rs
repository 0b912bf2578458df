//! Error types for eoskit.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for eoskit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], surfaced across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad hex, truncated binary, invalid JSON or text forms.
    MalformedInput,
    /// Unknown contract, action, or type; missing or mistyped field.
    Schema,
    /// Invalid or expired handle, capacity exceeded.
    Handle,
    /// Bad key format, signing failure, malformed signature.
    Crypto,
    /// Operation not allowed in the transaction's current state.
    State,
    /// Reading or writing files.
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::MalformedInput => "malformed_input",
            ErrorKind::Schema => "schema",
            ErrorKind::Handle => "handle",
            ErrorKind::Crypto => "crypto",
            ErrorKind::State => "state",
            ErrorKind::Io => "io",
        }
    }
}

/// Errors that can occur in eoskit.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid hex input.
    #[error("Invalid hex input: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    /// Invalid JSON text.
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Binary input ended before a value was complete.
    #[error("Unexpected end of data: needed {needed} byte(s) at offset {offset}, {remaining} left")]
    Truncated {
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    /// A value could not be parsed from its text form.
    #[error("Invalid {kind} value '{value}'")]
    InvalidValue { kind: &'static str, value: String },

    /// An account/action name is not valid.
    #[error("Invalid name '{0}'")]
    InvalidName(String),

    /// A symbol or symbol code is not valid.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Lookup of a named field failed.
    #[error("Field not found: '{0}'")]
    FieldNotFound(String),

    /// Array index out of bounds.
    #[error("Index {0} out of bounds")]
    IndexOutOfBounds(usize),

    /// Path segment applied to the wrong kind of node.
    #[error("Expected {expected} at '{path}', found {found}")]
    KindMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Invalid query path syntax.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No ABI has been loaded for the contract.
    #[error("ABI for contract '{0}' is not cached")]
    AbiNotCached(String),

    /// The ABI document itself is malformed or inconsistent.
    #[error("Invalid ABI: {0}")]
    InvalidAbi(String),

    /// The contract does not declare the action.
    #[error("Unknown action '{action}' in contract '{contract}'")]
    UnknownAction { contract: String, action: String },

    /// A type name could not be resolved against the schema.
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    /// A struct field required by the schema was not supplied.
    #[error("Missing field '{field}' in struct '{owner}'")]
    MissingField { owner: String, field: String },

    /// A supplied value does not match the schema type.
    #[error("Type mismatch for '{ty}': {reason}")]
    TypeMismatch { ty: String, reason: String },

    /// Handle is out of range or already freed.
    #[error("Invalid transaction handle {0}")]
    InvalidHandle(i64),

    /// Handle table is full.
    #[error("Handle table is full ({0} live transactions)")]
    NoRoom(usize),

    /// A key string could not be parsed.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A signature string could not be parsed.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The signing backend failed.
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// The wallet has no private key for the given public key.
    #[error("No private key for public key {0}")]
    KeyNotFound(String),

    /// Mutation attempted after a signature was attached.
    #[error("Transaction is already signed; {0} is not allowed")]
    AlreadySigned(&'static str),

    /// Signing attempted before required header fields are set.
    #[error("Transaction is not ready: {0}")]
    NotReady(&'static str),

    /// No input was provided and stdin is a terminal.
    #[error("No input provided. Pass a file, literal text, or pipe data to stdin.")]
    NoInput,

    /// Input file does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An I/O error occurred.
    #[error("IO error{}: {source}", path.as_ref().map(|p| format!(" reading {}", p.display())).unwrap_or_default())]
    IoError {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// Output formatting error.
    #[error("Format error: {0}")]
    FormatError(String),
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidHex(_)
            | Error::InvalidJson(_)
            | Error::Truncated { .. }
            | Error::InvalidValue { .. }
            | Error::InvalidName(_)
            | Error::InvalidSymbol(_)
            | Error::FieldNotFound(_)
            | Error::IndexOutOfBounds(_)
            | Error::KindMismatch { .. }
            | Error::InvalidQuery(_)
            | Error::FormatError(_) => ErrorKind::MalformedInput,
            Error::AbiNotCached(_)
            | Error::InvalidAbi(_)
            | Error::UnknownAction { .. }
            | Error::UnknownType(_)
            | Error::MissingField { .. }
            | Error::TypeMismatch { .. } => ErrorKind::Schema,
            Error::InvalidHandle(_) | Error::NoRoom(_) => ErrorKind::Handle,
            Error::InvalidKey(_)
            | Error::InvalidSignature(_)
            | Error::SigningFailed(_)
            | Error::KeyNotFound(_) => ErrorKind::Crypto,
            Error::AlreadySigned(_) | Error::NotReady(_) => ErrorKind::State,
            Error::NoInput | Error::FileNotFound(_) | Error::IoError { .. } => ErrorKind::Io,
        }
    }

    /// Get the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::MalformedInput => 1,
            ErrorKind::Schema => 2,
            ErrorKind::Handle => 3,
            ErrorKind::Crypto => 4,
            ErrorKind::State => 5,
            ErrorKind::Io => 6,
        }
    }

    pub(crate) fn invalid_value(kind: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidValue {
            kind,
            value: value.into(),
        }
    }

    pub(crate) fn mismatch(ty: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::TypeMismatch {
            ty: ty.into(),
            reason: reason.into(),
        }
    }
}
