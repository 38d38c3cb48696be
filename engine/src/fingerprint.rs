//! Content digests for comparing states across runs (replay determinism,
//! golden checks).

use std::io;

use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Digest of a value's JSON encoding.
pub fn json_sha256_hex<T: Serialize>(value: &T) -> io::Result<String> {
    let bytes =
        serde_json::to_vec(value).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(sha256_hex(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_hex_matches_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn json_digest_is_stable_for_equal_values() {
        let a = json_sha256_hex(&vec![1u8, 2, 3]).expect("digest");
        let b = json_sha256_hex(&vec![1u8, 2, 3]).expect("digest");
        let c = json_sha256_hex(&vec![3u8, 2, 1]).expect("digest");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
