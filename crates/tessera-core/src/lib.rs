//! Tessera Core: identifiers, schemas, attribute encoding, predicate
//! operators, the shared error taxonomy, and engine configuration.

pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{CoreError, ErrorKind};
pub use types::{
    encode_attribute_value, normalize_attr_name, AttributeValues, CredentialDefinitionId,
    NonRevokedInterval, PredicateType, RevocationRegistryId, Schema, SchemaId,
};
