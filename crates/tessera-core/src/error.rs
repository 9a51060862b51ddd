use std::fmt;

use serde::{Deserialize, Serialize};

/// Public error taxonomy shared by every Tessera crate.
///
/// Each crate keeps its own error enum; `kind()` on those enums maps onto
/// this list so callers can decide whether to fix the request shape
/// (`InvalidStructure`) or re-fetch store state (`ItemNotFound`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Internal state is inconsistent (corrupted record, failed serialization).
    InvalidState,
    /// Malformed request, missing schema/definition/revocation entry, bad selection.
    InvalidStructure,
    /// Operation issued against a closed or unknown store handle.
    InvalidHandle,
    /// Referenced item is absent from the store.
    ItemNotFound,
    /// Item with the same identifier is already stored.
    ItemAlreadyExists,
    /// Revocation registry has no free indices left.
    RevocationRegistryFull,
    /// A master secret with the same name already exists.
    DuplicateMasterSecret,
    /// Credential index is not part of the registry's issued set.
    CredentialRevoked,
}

impl ErrorKind {
    /// Stable numeric code, compatible with the platform's historical error codes.
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidState => 112,
            Self::InvalidStructure => 113,
            Self::InvalidHandle => 200,
            Self::ItemNotFound => 212,
            Self::ItemAlreadyExists => 213,
            Self::RevocationRegistryFull => 400,
            Self::DuplicateMasterSecret => 404,
            Self::CredentialRevoked => 406,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState => write!(f, "InvalidState"),
            Self::InvalidStructure => write!(f, "InvalidStructure"),
            Self::InvalidHandle => write!(f, "InvalidHandle"),
            Self::ItemNotFound => write!(f, "ItemNotFound"),
            Self::ItemAlreadyExists => write!(f, "ItemAlreadyExists"),
            Self::RevocationRegistryFull => write!(f, "RevocationRegistryFull"),
            Self::DuplicateMasterSecret => write!(f, "DuplicateMasterSecret"),
            Self::CredentialRevoked => write!(f, "CredentialRevoked"),
        }
    }
}

/// Core type errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// Map onto the public taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStructure(_) | Self::InvalidIdentifier(_) => ErrorKind::InvalidStructure,
            Self::Serialization(_) => ErrorKind::InvalidStructure,
        }
    }
}
