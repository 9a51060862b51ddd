use serde::{Deserialize, Serialize};

use tessera_core::{CredentialDefinitionId, SchemaId};

use crate::credential::CredentialInfo;

/// Constraints on a credential's provenance.
///
/// Every present field must hold; an absent field places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<SchemaId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<CredentialDefinitionId>,
}

impl CredentialFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check the filter against a credential's identifiers.
    pub fn matches(&self, info: &CredentialInfo) -> bool {
        self.matches_ids(&info.schema_id, &info.cred_def_id)
    }

    /// Check the filter against a schema and credential definition identifier pair.
    pub fn matches_ids(&self, schema_id: &SchemaId, cred_def_id: &CredentialDefinitionId) -> bool {
        fn check(expected: Option<&str>, actual: Option<&str>) -> bool {
            match expected {
                None => true,
                Some(expected) => actual == Some(expected),
            }
        }

        check(self.schema_id.as_ref().map(|s| s.as_str()), Some(schema_id.as_str()))
            && check(self.schema_issuer_did.as_deref(), schema_id.issuer_did())
            && check(self.schema_name.as_deref(), schema_id.name())
            && check(self.schema_version.as_deref(), schema_id.version())
            && check(self.issuer_did.as_deref(), cred_def_id.issuer_did())
            && check(
                self.cred_def_id.as_ref().map(|c| c.as_str()),
                Some(cred_def_id.as_str()),
            )
    }
}
