//! Hex serde helpers for fixed-size byte arrays.

pub mod hex32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

/// Canonical Ristretto scalars as hex.
pub mod scalar {
    use curve25519_dalek::Scalar;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error> {
        super::hex32::serialize(scalar.as_bytes(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Scalar, D::Error> {
        let bytes = super::hex32::deserialize(deserializer)?;
        Option::from(Scalar::from_canonical_bytes(bytes))
            .ok_or_else(|| serde::de::Error::custom("non-canonical scalar"))
    }
}

/// Compressed Ristretto points as hex. Decompression is left to the verifier.
pub mod point {
    use curve25519_dalek::ristretto::CompressedRistretto;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        point: &CompressedRistretto,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        super::hex32::serialize(point.as_bytes(), serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<CompressedRistretto, D::Error> {
        super::hex32::deserialize(deserializer).map(CompressedRistretto)
    }
}
