use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::CoreError;

/// Marker for schema identifiers: `<did>:2:<name>:<version>`.
const SCHEMA_MARKER: &str = "2";
/// Marker for credential definition identifiers: `<did>:3:CL:<schema_id>:<tag>`.
const CRED_DEF_MARKER: &str = "3";
/// Marker for revocation registry identifiers: `<did>:4:<cred_def_id>:CL_ACCUM:<tag>`.
const REV_REG_MARKER: &str = "4";

/// Signature scheme tag carried by credential definitions.
pub const SIGNATURE_TYPE: &str = "CL";
/// Registry type tag carried by revocation registry identifiers.
pub const REGISTRY_TYPE: &str = "CL_ACCUM";

/// Identifier for a published schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaId(pub String);

impl SchemaId {
    /// Create a schema identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the ledger-style identifier for a schema.
    pub fn build(issuer_did: &str, name: &str, version: &str) -> Self {
        Self(format!(
            "{}:{}:{}:{}",
            issuer_did, SCHEMA_MARKER, name, version
        ))
    }

    /// Get the schema ID string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> Option<Vec<&str>> {
        let parts: Vec<&str> = self.0.split(':').collect();
        if parts.len() == 4 && parts[1] == SCHEMA_MARKER {
            Some(parts)
        } else {
            None
        }
    }

    /// DID of the schema author, if the identifier is fully qualified.
    pub fn issuer_did(&self) -> Option<&str> {
        self.parts().map(|p| p[0])
    }

    /// Schema name, if the identifier is fully qualified.
    pub fn name(&self) -> Option<&str> {
        self.parts().map(|p| p[2])
    }

    /// Schema version, if the identifier is fully qualified.
    pub fn version(&self) -> Option<&str> {
        self.parts().map(|p| p[3])
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a credential definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialDefinitionId(pub String);

impl CredentialDefinitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the ledger-style identifier for a credential definition.
    pub fn build(issuer_did: &str, schema_id: &SchemaId, tag: &str) -> Self {
        Self(format!(
            "{}:{}:{}:{}:{}",
            issuer_did, CRED_DEF_MARKER, SIGNATURE_TYPE, schema_id, tag
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parts(&self) -> Option<Vec<&str>> {
        let parts: Vec<&str> = self.0.split(':').collect();
        if parts.len() >= 5 && parts[1] == CRED_DEF_MARKER && parts[2] == SIGNATURE_TYPE {
            Some(parts)
        } else {
            None
        }
    }

    /// DID of the issuer that owns this definition.
    pub fn issuer_did(&self) -> Option<&str> {
        self.parts().map(|p| p[0])
    }

    /// Schema identifier embedded in the definition identifier.
    pub fn schema_id(&self) -> Option<SchemaId> {
        self.parts()
            .map(|p| SchemaId::new(p[3..p.len() - 1].join(":")))
    }

    /// Tag distinguishing definitions over the same schema.
    pub fn tag(&self) -> Option<&str> {
        self.parts().and_then(|p| p.last().copied())
    }
}

impl fmt::Display for CredentialDefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for a revocation registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RevocationRegistryId(pub String);

impl RevocationRegistryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the ledger-style identifier for a revocation registry.
    pub fn build(issuer_did: &str, cred_def_id: &CredentialDefinitionId, tag: &str) -> Self {
        Self(format!(
            "{}:{}:{}:{}:{}",
            issuer_did, REV_REG_MARKER, cred_def_id, REGISTRY_TYPE, tag
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Credential definition this registry belongs to.
    pub fn cred_def_id(&self) -> Option<CredentialDefinitionId> {
        let parts: Vec<&str> = self.0.split(':').collect();
        if parts.len() >= 5 && parts[1] == REV_REG_MARKER && parts[parts.len() - 2] == REGISTRY_TYPE
        {
            Some(CredentialDefinitionId::new(
                parts[2..parts.len() - 2].join(":"),
            ))
        } else {
            None
        }
    }
}

impl fmt::Display for RevocationRegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Normalize an attribute name for matching: lowercase, whitespace removed.
pub fn normalize_attr_name(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// A published credential schema. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Fully qualified schema identifier.
    pub id: SchemaId,
    /// Human-readable name.
    pub name: String,
    /// Schema version.
    pub version: String,
    /// Ordered attribute names.
    pub attr_names: Vec<String>,
}

impl Schema {
    /// Build a schema, rejecting empty or duplicate attribute names.
    pub fn new(
        issuer_did: &str,
        name: &str,
        version: &str,
        attr_names: &[&str],
    ) -> Result<Self, CoreError> {
        if issuer_did.is_empty() || name.is_empty() || version.is_empty() {
            return Err(CoreError::InvalidStructure(
                "schema issuer, name and version must be non-empty".into(),
            ));
        }
        if attr_names.is_empty() {
            return Err(CoreError::InvalidStructure(
                "schema must have at least one attribute".into(),
            ));
        }

        let mut seen = HashSet::new();
        for attr in attr_names {
            let normalized = normalize_attr_name(attr);
            if normalized.is_empty() {
                return Err(CoreError::InvalidStructure(
                    "attribute names must be non-empty".into(),
                ));
            }
            if !seen.insert(normalized) {
                return Err(CoreError::InvalidStructure(format!(
                    "duplicate attribute name: {}",
                    attr
                )));
            }
        }

        Ok(Self {
            id: SchemaId::build(issuer_did, name, version),
            name: name.to_string(),
            version: version.to_string(),
            attr_names: attr_names.iter().map(|a| a.to_string()).collect(),
        })
    }

    /// DID of the schema author.
    pub fn issuer_did(&self) -> Option<&str> {
        self.id.issuer_did()
    }

    /// Whether the schema declares the attribute (normalized comparison).
    pub fn has_attribute(&self, name: &str) -> bool {
        let wanted = normalize_attr_name(name);
        self.attr_names
            .iter()
            .any(|a| normalize_attr_name(a) == wanted)
    }
}

/// Encode a raw attribute value to the numeric form used in proofs.
///
/// Values that parse as a 32-bit signed integer encode to themselves so that
/// predicates can compare them. Everything else encodes to the decimal form of
/// the first 16 bytes of its BLAKE3 hash.
pub fn encode_attribute_value(raw: &str) -> String {
    if let Ok(n) = raw.parse::<i32>() {
        return n.to_string();
    }
    let digest = blake3::hash(raw.as_bytes());
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest.as_bytes()[..16]);
    u128::from_be_bytes(head).to_string()
}

/// Raw and encoded form of one credential attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeValues {
    pub raw: String,
    pub encoded: String,
}

impl AttributeValues {
    /// Build from a raw value using the standard encoding.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let encoded = encode_attribute_value(&raw);
        Self { raw, encoded }
    }

    /// Encoded value as a number, when it fits one.
    pub fn encoded_as_i64(&self) -> Option<i64> {
        self.encoded.parse::<i64>().ok()
    }

    /// Whether the encoded form is the one the raw value produces.
    pub fn is_consistent(&self) -> bool {
        encode_attribute_value(&self.raw) == self.encoded
    }
}

/// Comparison operator of a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredicateType {
    #[serde(rename = ">=", alias = "GE")]
    GE,
    #[serde(rename = ">", alias = "GT")]
    GT,
    #[serde(rename = "<=", alias = "LE")]
    LE,
    #[serde(rename = "<", alias = "LT")]
    LT,
}

impl PredicateType {
    /// Evaluate `value <op> threshold`.
    pub fn holds(&self, value: i64, threshold: i64) -> bool {
        match self {
            Self::GE => value >= threshold,
            Self::GT => value > threshold,
            Self::LE => value <= threshold,
            Self::LT => value < threshold,
        }
    }

    /// Wire symbol of the operator.
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::GE => ">=",
            Self::GT => ">",
            Self::LE => "<=",
            Self::LT => "<",
        }
    }
}

impl fmt::Display for PredicateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Interval in which a credential must be provably non-revoked (inclusive bounds).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRevokedInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl NonRevokedInterval {
    pub fn contains(&self, timestamp: u64) -> bool {
        self.from.map(|from| timestamp >= from).unwrap_or(true)
            && self.to.map(|to| timestamp <= to).unwrap_or(true)
    }
}
