//! The 64-bit hashing primitive used for every key in the system: content
//! hashes, variant hashes, keyword name hashes, and cache keys.
//!
//! All of them are seeded XXH64. Chained hashes feed the previous digest in
//! as the seed of the next step, which keeps multi-field keys order-sensitive
//! without intermediate buffers.

use xxhash_rust::xxh64::{xxh64, Xxh64};

/// Hash a byte slice with seed 0.
pub fn hash64(data: &[u8]) -> u64 {
    xxh64(data, 0)
}

/// Hash a byte slice with an explicit seed (chaining step).
pub fn hash64_with_seed(data: &[u8], seed: u64) -> u64 {
    xxh64(data, seed)
}

/// Hash a UTF-8 string with seed 0.
pub fn hash64_str(s: &str) -> u64 {
    xxh64(s.as_bytes(), 0)
}

/// Hash a SPIR-V word stream.
///
/// Words are fed in little-endian byte order so the digest does not depend on
/// the host platform.
pub fn hash64_words(words: &[u32]) -> u64 {
    let mut hasher = Xxh64::new(0);
    for word in words {
        hasher.update(&word.to_le_bytes());
    }
    hasher.digest()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_hash_differs_from_unseeded() {
        let data = b"vultra";
        assert_ne!(hash64(data), hash64_with_seed(data, 1));
        assert_eq!(hash64(data), hash64_with_seed(data, 0));
    }

    #[test]
    fn str_hash_matches_byte_hash() {
        assert_eq!(hash64_str("Material"), hash64(b"Material"));
    }

    #[test]
    fn word_hash_is_little_endian_byte_hash() {
        let words = [0x0723_0203u32, 0x0001_0500];
        let mut bytes = Vec::new();
        for w in &words {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        assert_eq!(hash64_words(&words), hash64(&bytes));
    }

    #[test]
    fn chaining_is_order_sensitive() {
        let a = hash64_with_seed(b"b", hash64(b"a"));
        let b = hash64_with_seed(b"a", hash64(b"b"));
        assert_ne!(a, b);
    }
}
