use tessera_core::{CoreError, ErrorKind};
use tessera_crypto::CryptoError;

/// Credential system errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("item not found: {0}")]
    NotFound(String),

    #[error("item already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid store handle: {0}")]
    InvalidHandle(String),

    #[error("revocation registry full: {0}")]
    RevocationRegistryFull(String),

    #[error("duplicate master secret: {0}")]
    DuplicateMasterSecret(String),

    #[error("credential revoked: index {0}")]
    CredentialRevoked(u32),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CredentialError {
    /// Map onto the public taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStructure(_) => ErrorKind::InvalidStructure,
            Self::NotFound(_) => ErrorKind::ItemNotFound,
            Self::AlreadyExists(_) => ErrorKind::ItemAlreadyExists,
            Self::InvalidHandle(_) => ErrorKind::InvalidHandle,
            Self::RevocationRegistryFull(_) => ErrorKind::RevocationRegistryFull,
            Self::DuplicateMasterSecret(_) => ErrorKind::DuplicateMasterSecret,
            Self::CredentialRevoked(_) => ErrorKind::CredentialRevoked,
            Self::Crypto(e) => e.kind(),
            Self::Core(e) => e.kind(),
            Self::Serialization(_) => ErrorKind::InvalidState,
        }
    }
}
