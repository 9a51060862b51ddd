use tessera_core::ErrorKind;

/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("predicate not satisfied: {0}")]
    PredicateUnsatisfied(String),

    #[error("index {0} is not a member of the accumulator")]
    NotAMember(u32),
}

impl CryptoError {
    /// Map onto the public taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotAMember(_) => ErrorKind::CredentialRevoked,
            _ => ErrorKind::InvalidStructure,
        }
    }
}
