use tessera_core::ErrorKind;
use tessera_credentials::CredentialError;
use tessera_crypto::CryptoError;

/// Proof engine errors.
#[derive(Debug, thiserror::Error)]
pub enum ProofError {
    #[error("invalid structure: {0}")]
    InvalidStructure(String),

    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProofError {
    /// Map onto the public taxonomy. Store errors keep their own kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidStructure(_) | Self::Serialization(_) => ErrorKind::InvalidStructure,
            Self::Credential(e) => e.kind(),
            Self::Crypto(e) => e.kind(),
            Self::Internal(_) => ErrorKind::InvalidState,
        }
    }
}
