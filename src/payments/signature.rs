//! Keyed-MAC computation and verification for provider payloads.
//!
//! VNPay signs with HMAC-SHA512 under a single merchant secret; ZaloPay
//! signs with HMAC-SHA256 under two keys (key1 outbound, key2 inbound).
//! Signatures travel as lowercase hex. Verification always goes through
//! [`constant_time_eq`] so a mismatching MAC cannot be probed byte by byte.

use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

type HmacSha512 = Hmac<Sha512>;
type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA512 over `data`, lowercase hex.
pub fn hmac_sha512_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac =
        HmacSha512::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// HMAC-SHA256 over `data`, lowercase hex.
pub fn hmac_sha256_hex(key: &[u8], data: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time string comparison to prevent timing attacks.
///
/// Inbound signatures are attacker-controlled; an early-exit comparison
/// would leak how many leading bytes matched.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Verify a lowercase-hex HMAC-SHA512 signature over `data`.
pub fn verify_hmac_sha512(key: &[u8], data: &[u8], signature: &str) -> bool {
    constant_time_eq(&hmac_sha512_hex(key, data), &signature.trim().to_lowercase())
}

/// Verify a lowercase-hex HMAC-SHA256 signature over `data`.
pub fn verify_hmac_sha256(key: &[u8], data: &[u8], signature: &str) -> bool {
    constant_time_eq(&hmac_sha256_hex(key, data), &signature.trim().to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip_sha512() {
        let sig = hmac_sha512_hex(b"secret", b"a=1&b=2");
        assert!(verify_hmac_sha512(b"secret", b"a=1&b=2", &sig));
    }

    #[test]
    fn sign_verify_round_trip_sha256() {
        let sig = hmac_sha256_hex(b"key2", b"1|2|3");
        assert!(verify_hmac_sha256(b"key2", b"1|2|3", &sig));
    }

    #[test]
    fn mutated_payload_fails() {
        let sig = hmac_sha512_hex(b"secret", b"a=1&b=2");
        assert!(!verify_hmac_sha512(b"secret", b"a=1&b=3", &sig));
    }

    #[test]
    fn mutated_signature_fails() {
        let mut sig = hmac_sha512_hex(b"secret", b"a=1&b=2");
        let flipped = if sig.ends_with('0') { '1' } else { '0' };
        sig.pop();
        sig.push(flipped);
        assert!(!verify_hmac_sha512(b"secret", b"a=1&b=2", &sig));
    }

    #[test]
    fn wrong_key_fails() {
        let sig = hmac_sha256_hex(b"key1", b"1|2|3");
        assert!(!verify_hmac_sha256(b"key2", b"1|2|3", &sig));
    }

    #[test]
    fn signature_is_lowercase_hex() {
        let sig = hmac_sha512_hex(b"secret", b"payload");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn uppercase_inbound_signature_is_accepted() {
        let sig = hmac_sha256_hex(b"key2", b"data").to_uppercase();
        assert!(verify_hmac_sha256(b"key2", b"data", &sig));
    }

    #[test]
    fn constant_time_eq_basic() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "ab"));
    }
}
