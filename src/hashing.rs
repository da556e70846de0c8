//! A deterministic string hash, used in `crate::random` to derive an independent seed for each
//! named random stream. The hash must not change between runs or platforms, otherwise seeded runs
//! would stop being reproducible.

use xxhash_rust::xxh3::xxh3_64;

/// A convenience method to compute the hash of a `&str`.
#[must_use]
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        let a = hash_str("InfectionRng");
        let b = hash_str("InfectionRng");
        let c = hash_str("RecoveryRng");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
