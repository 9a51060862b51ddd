use serde::{Deserialize, Serialize};

use tessera_core::{CredentialDefinitionId, SchemaId};
use tessera_crypto::PublicKey;

/// Options for creating a credential definition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialDefinitionConfig {
    /// Whether credentials under this definition can be revoked.
    #[serde(default)]
    pub support_revocation: bool,
}

/// Public key material of a credential definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinitionValue {
    pub public_key: PublicKey,
    #[serde(default)]
    pub support_revocation: bool,
}

/// A published credential definition: a schema bound to an issuer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialDefinition {
    pub id: CredentialDefinitionId,
    #[serde(rename = "schemaId")]
    pub schema_id: SchemaId,
    pub issuer_did: String,
    pub tag: String,
    #[serde(rename = "type")]
    pub signature_type: String,
    pub value: CredentialDefinitionValue,
}

impl CredentialDefinition {
    pub fn supports_revocation(&self) -> bool {
        self.value.support_revocation
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.value.public_key
    }
}
