use serde::{Deserialize, Serialize};

/// BLAKE3 hash (32 bytes).
pub type Hash = [u8; 32];

/// Hash arbitrary data using BLAKE3.
pub fn hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash several byte strings, each prefixed with its length so that
/// `["ab", "c"]` and `["a", "bc"]` never collide.
pub fn hash_parts(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(&(part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// Create a BLAKE3 commitment: H(value || nonce).
pub fn create_commitment(value: &[u8], nonce: &[u8; 32]) -> Hash {
    let mut input = Vec::with_capacity(value.len() + 32);
    input.extend_from_slice(value);
    input.extend_from_slice(nonce);
    hash(&input)
}

/// Verify a BLAKE3 commitment by recomputing H(value || nonce).
pub fn verify_commitment(value: &[u8], nonce: &[u8; 32], commitment: &Hash) -> bool {
    create_commitment(value, nonce) == *commitment
}

fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut combined = Vec::with_capacity(64);
    combined.extend_from_slice(left);
    combined.extend_from_slice(right);
    hash(&combined)
}

/// Compute the Merkle root of a list of hashes.
/// Empty input yields the zero hash; an odd node is paired with itself.
pub fn merkle_root(hashes: &[Hash]) -> Hash {
    if hashes.is_empty() {
        return [0u8; 32];
    }

    let mut current_level: Vec<Hash> = hashes.to_vec();
    while current_level.len() > 1 {
        current_level = current_level
            .chunks(2)
            .map(|chunk| hash_pair(&chunk[0], chunk.get(1).unwrap_or(&chunk[0])))
            .collect();
    }
    current_level[0]
}

/// One step of a Merkle inclusion path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleStep {
    /// Sibling hash at this level.
    #[serde(with = "crate::encoding::hex32")]
    pub sibling: Hash,
    /// Whether the sibling sits to the right of the running node.
    pub sibling_on_right: bool,
}

/// Build the inclusion path for the leaf at `index`.
/// Returns `None` when the index is out of bounds.
pub fn merkle_path(leaves: &[Hash], index: usize) -> Option<Vec<MerkleStep>> {
    if index >= leaves.len() {
        return None;
    }

    let mut path = Vec::new();
    let mut current_level = leaves.to_vec();
    let mut current_index = index;

    while current_level.len() > 1 {
        let (sibling_index, sibling_on_right) = if current_index % 2 == 0 {
            (current_index + 1, true)
        } else {
            (current_index - 1, false)
        };
        let sibling = current_level
            .get(sibling_index)
            .copied()
            .unwrap_or(current_level[current_index]);
        path.push(MerkleStep {
            sibling,
            sibling_on_right,
        });

        current_level = current_level
            .chunks(2)
            .map(|chunk| hash_pair(&chunk[0], chunk.get(1).unwrap_or(&chunk[0])))
            .collect();
        current_index /= 2;
    }

    Some(path)
}

/// Recompute the root from a leaf and its path and compare.
pub fn verify_merkle_path(leaf: &Hash, path: &[MerkleStep], root: &Hash) -> bool {
    let computed = path.iter().fold(*leaf, |node, step| {
        if step.sibling_on_right {
            hash_pair(&node, &step.sibling)
        } else {
            hash_pair(&step.sibling, &node)
        }
    });
    computed == *root
}
