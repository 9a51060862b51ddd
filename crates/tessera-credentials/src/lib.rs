//! Tessera Credentials: issuer, revocation registries, the credential store
//! adapter and the in-memory wallet behind it.

pub mod credential;
pub mod definition;
pub mod error;
pub mod filter;
pub mod issuer;
pub mod master_secret;
pub mod registry;
pub mod revocation;
pub mod store;
pub mod wallet;

pub use credential::{Credential, CredentialInfo, SignedFields};
pub use definition::{CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionValue};
pub use error::CredentialError;
pub use filter::CredentialFilter;
pub use issuer::Issuer;
pub use master_secret::MasterSecret;
pub use registry::WalletRegistry;
pub use revocation::{
    IssuanceType, RevocationRegistry, RevocationRegistryConfig, RevocationRegistryDefinition,
    RevocationRegistryDelta, RevocationState,
};
pub use store::{CredentialHandle, CredentialStore};
pub use wallet::Wallet;
