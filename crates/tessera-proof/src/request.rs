//! Proof requests and their restriction filters.

use rand::Rng;
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use tessera_core::{CredentialDefinitionId, NonRevokedInterval, PredicateType, SchemaId};
use tessera_credentials::{CredentialFilter, CredentialInfo};

use crate::error::ProofError;

/// One restriction entry. All present fields must hold.
pub type Filter = CredentialFilter;

/// Which credentials may satisfy a requested item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Restrictions {
    #[default]
    Unrestricted,
    /// Satisfied when any one filter matches.
    AnyOf(Vec<Filter>),
}

impl Restrictions {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }

    pub fn matches(&self, info: &CredentialInfo) -> bool {
        self.matches_ids(&info.schema_id, &info.cred_def_id)
    }

    pub fn matches_ids(&self, schema_id: &SchemaId, cred_def_id: &CredentialDefinitionId) -> bool {
        match self {
            Self::Unrestricted => true,
            Self::AnyOf(filters) => filters.iter().any(|f| f.matches_ids(schema_id, cred_def_id)),
        }
    }
}

impl Serialize for Restrictions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unrestricted => serializer.serialize_none(),
            Self::AnyOf(filters) => filters.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Restrictions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde_json::Value;

        let value = Option::<Value>::deserialize(deserializer)?;
        match value {
            None | Some(Value::Null) => Ok(Self::Unrestricted),
            Some(Value::Array(items)) if items.is_empty() => Ok(Self::Unrestricted),
            Some(Value::Array(items)) => items
                .into_iter()
                .map(serde_json::from_value::<Filter>)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::AnyOf)
                .map_err(de::Error::custom),
            Some(obj @ Value::Object(_)) => serde_json::from_value::<Filter>(obj)
                .map(|f| Self::AnyOf(vec![f]))
                .map_err(de::Error::custom),
            Some(other) => Err(de::Error::custom(format!(
                "restrictions must be an object or a list of objects, got {}",
                other
            ))),
        }
    }
}

/// A requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Restrictions::is_unrestricted")]
    pub restrictions: Restrictions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

/// A requested predicate over a numeric attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateInfo {
    #[serde(alias = "attr_name")]
    pub name: String,
    #[serde(alias = "op")]
    pub p_type: PredicateType,
    #[serde(alias = "value")]
    pub p_value: i64,
    #[serde(default, skip_serializing_if = "Restrictions::is_unrestricted")]
    pub restrictions: Restrictions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

/// A verifier's request for a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub nonce: String,
    pub name: String,
    pub version: String,
    #[serde(default, deserialize_with = "unique_referents")]
    pub requested_attributes: BTreeMap<String, AttributeInfo>,
    #[serde(default, deserialize_with = "unique_referents")]
    pub requested_predicates: BTreeMap<String, PredicateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl ProofRequest {
    /// Parse and validate a request.
    pub fn from_json(json: &str) -> Result<Self, ProofError> {
        let request: Self = serde_json::from_str(json)
            .map_err(|e| ProofError::InvalidStructure(format!("malformed proof request: {}", e)))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<(), ProofError> {
        if self.nonce.is_empty() || !self.nonce.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ProofError::InvalidStructure(format!(
                "nonce must be a decimal string, got {:?}",
                self.nonce
            )));
        }
        if self.requested_attributes.is_empty() && self.requested_predicates.is_empty() {
            return Err(ProofError::InvalidStructure(
                "proof request names no attributes or predicates".into(),
            ));
        }
        let names = self
            .requested_attributes
            .iter()
            .map(|(referent, info)| (referent, &info.name))
            .chain(
                self.requested_predicates
                    .iter()
                    .map(|(referent, info)| (referent, &info.name)),
            );
        for (referent, name) in names {
            if name.trim().is_empty() {
                return Err(ProofError::InvalidStructure(format!(
                    "referent {} has an empty attribute name",
                    referent
                )));
            }
        }
        Ok(())
    }

    /// Interval for an attribute referent, item level first.
    pub fn attribute_interval(&self, referent: &str) -> Option<NonRevokedInterval> {
        self.requested_attributes
            .get(referent)
            .and_then(|info| info.non_revoked)
            .or(self.non_revoked)
    }

    /// Interval for a predicate referent, item level first.
    pub fn predicate_interval(&self, referent: &str) -> Option<NonRevokedInterval> {
        self.requested_predicates
            .get(referent)
            .and_then(|info| info.non_revoked)
            .or(self.non_revoked)
    }
}

/// Fresh 80-bit nonce in decimal.
pub fn generate_nonce() -> String {
    let value: u128 = rand::thread_rng().gen::<u128>() & ((1u128 << 80) - 1);
    value.to_string()
}

/// Deserialize a referent map, rejecting repeated keys.
fn unique_referents<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct ReferentVisitor<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for ReferentVisitor<V> {
        type Value = BTreeMap<String, V>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of referents")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, V>()? {
                if map.contains_key(&key) {
                    return Err(de::Error::custom(format!("duplicate referent {}", key)));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(ReferentVisitor(PhantomData))
}
