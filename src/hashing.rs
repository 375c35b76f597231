//! BLAKE3 helpers for point ids and feature hashing.

use blake3::Hasher;

/// Computes a 64-bit hash of `data` (first 8 bytes of its BLAKE3 digest).
///
/// Used for index point ids and embedding buckets, never for integrity checks.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Stable numeric point id for a rule chunk id.
#[inline]
pub fn chunk_point_id(chunk_id: &str) -> u64 {
    let mut hasher = Hasher::new();
    hasher.update(b"chunk|");
    hasher.update(chunk_id.as_bytes());
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

/// Bucket index and sign for one token in a `dim`-wide hashed feature space.
#[inline]
pub fn feature_bucket(token: &str, dim: usize) -> (usize, f32) {
    let h = hash_to_u64(token.as_bytes());
    let bucket = (h % dim.max(1) as u64) as usize;
    let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
    (bucket, sign)
}
