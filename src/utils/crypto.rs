// src/utils/crypto.rs
//! Cryptographic utilities shared by the holder and verifier sides.
//!
//! Uses SHA-256 (via `ring`) for all digests and the operating system CSPRNG
//! for nonces and token identifiers.

use crate::error::{AuthError, Result};
use ring::rand::{SecureRandom, SystemRandom};

/// Computes a SHA-256 hash of the input data.
///
/// # Arguments
/// * `data` - Binary data to hash (as bytes slice)
///
/// # Returns
/// Fixed-size 32-byte array (`[u8; 32]`) containing the hash.
pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let digest = ring::digest::digest(&ring::digest::SHA256, data);
    let mut out = [0u8; 32];
    out.copy_from_slice(digest.as_ref());
    out
}

/// Fills `N` bytes from the system CSPRNG.
///
/// # Errors
/// Returns `AuthError::Internal` if the OS random source is unavailable.
/// Callers must fail closed rather than fall back to a weaker source.
pub fn random_bytes<const N: usize>() -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| AuthError::Internal("system random source unavailable".into()))?;
    Ok(buf)
}

/// Encodes bytes as unpadded base64url.
pub fn b64url_encode(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE_NO_PAD)
}

/// Decodes unpadded base64url.
///
/// # Returns
/// - `Some(bytes)` on success
/// - `None` if the input is not valid base64url
pub fn b64url_decode(data: &str) -> Option<Vec<u8>> {
    base64::decode_config(data, base64::URL_SAFE_NO_PAD).ok()
}

/// Compares two byte strings without short-circuiting on the first mismatch.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    ring::constant_time::verify_slices_are_equal(a, b).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_data_known_vector() {
        // SHA-256("abc")
        let expected = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";
        assert_eq!(hex::encode(hash_data(b"abc")), expected);
    }

    #[test]
    fn test_random_bytes_differ() {
        let a = random_bytes::<32>().unwrap();
        let b = random_bytes::<32>().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_b64url_has_no_padding_or_unsafe_chars() {
        let encoded = b64url_encode(&[0xfb, 0xff, 0x01]);
        assert!(!encoded.contains('='));
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));
        assert_eq!(b64url_decode(&encoded).unwrap(), vec![0xfb, 0xff, 0x01]);
        assert!(b64url_decode("not base64!").is_none());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"same", b"same"));
        assert!(!constant_time_eq(b"same", b"diff"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
