//! BLAKE3 hashing helpers

use relayvote_core::Hash;

const NODE_DOMAIN: &[u8] = b"RELAYVOTE_NODE:";

/// Hash a single byte string
pub fn blake3_hash(data: &[u8]) -> Hash {
    Hash::from_bytes(*blake3::hash(data).as_bytes())
}

/// Hash the concatenation of `parts` without allocating it
pub fn hash_multiple(parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    Hash::from_bytes(*hasher.finalize().as_bytes())
}

/// Hash `parts` under a domain tag.
///
/// The tag is written first, so equal payloads under different tags never
/// collide.
pub fn tagged_hash(domain: &[u8], parts: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(domain);
    for part in parts {
        hasher.update(part);
    }
    Hash::from_bytes(*hasher.finalize().as_bytes())
}

/// Root of a binary Merkle tree over `leaves`.
///
/// An empty tree hashes to [`Hash::ZERO`]; an odd node at any level is
/// paired with itself.
pub fn merkle_root(leaves: &[Hash]) -> Hash {
    match leaves {
        [] => return Hash::ZERO,
        [single] => return *single,
        _ => {}
    }

    let mut level: Vec<Hash> = leaves.to_vec();
    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                tagged_hash(NODE_DOMAIN, &[pair[0].as_bytes(), right.as_bytes()])
            })
            .collect();
    }
    level[0]
}
