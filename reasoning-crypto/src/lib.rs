//! Secret cipher for per-tenant LLM API keys.
//!
//! A symmetric stream cipher built from SHA-256 as a keystream generator
//! plus an HMAC-SHA256 integrity tag, keyed by the deployment's master
//! secret (`REASONING_SECRET_CIPHER_KEY`). Not an AEAD construction from a
//! standard crate - this mirrors the teacher's webhook HMAC signing
//! (`caliber-api/src/routes/webhooks.rs`) rather than pulling in a new
//! primitive for one call site.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use reasoning_core::{CryptoError, ReasoningError, ReasoningResult};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_SECRET_LEN: usize = 16;

fn check_secret(secret: &str) -> ReasoningResult<()> {
    if secret.len() < MIN_SECRET_LEN {
        return Err(ReasoningError::Crypto(CryptoError::SecretTooShort {
            len: secret.len(),
        }));
    }
    Ok(())
}

/// Derive a keystream of exactly `len` bytes from `SHA-256(secret || nonce
/// || counter_be32)`, concatenating consecutive 32-byte blocks as needed.
fn keystream(secret: &str, nonce: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len + Sha256::output_size());
    let mut counter: u32 = 0;
    while out.len() < len {
        let mut hasher = Sha256::new();
        hasher.update(secret.as_bytes());
        hasher.update(nonce);
        hasher.update(counter.to_be_bytes());
        out.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    out.truncate(len);
    out
}

fn xor_with_keystream(data: &[u8], keystream: &[u8]) -> Vec<u8> {
    data.iter().zip(keystream).map(|(a, b)| a ^ b).collect()
}

fn compute_tag(secret: &str, nonce: &[u8], ciphertext: &[u8]) -> [u8; TAG_LEN] {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts a key of any length");
    mac.update(nonce);
    mac.update(ciphertext);
    let full = mac.finalize().into_bytes();
    let mut tag = [0u8; TAG_LEN];
    tag.copy_from_slice(&full[..TAG_LEN]);
    tag
}

/// Constant-time byte-slice comparison; returns `false` on length mismatch
/// without short-circuiting on the first differing byte.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Encrypt `plaintext` under `secret`, returning a base64url wire token of
/// `nonce || tag || ciphertext`.
pub fn encrypt(secret: &str, plaintext: &str) -> ReasoningResult<String> {
    check_secret(secret)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::rng().fill_bytes(&mut nonce);

    let ks = keystream(secret, &nonce, plaintext.len());
    let ciphertext = xor_with_keystream(plaintext.as_bytes(), &ks);
    let tag = compute_tag(secret, &nonce, &ciphertext);

    let mut wire = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
    wire.extend_from_slice(&nonce);
    wire.extend_from_slice(&tag);
    wire.extend_from_slice(&ciphertext);

    Ok(URL_SAFE_NO_PAD.encode(wire))
}

/// Decrypt a wire token produced by [`encrypt`], verifying its tag in
/// constant time before returning the recovered plaintext.
pub fn decrypt(secret: &str, wire: &str) -> ReasoningResult<String> {
    check_secret(secret)?;

    let raw = URL_SAFE_NO_PAD.decode(wire).map_err(|e| {
        ReasoningError::Crypto(CryptoError::MalformedCiphertext {
            reason: e.to_string(),
        })
    })?;

    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(ReasoningError::Crypto(CryptoError::MalformedCiphertext {
            reason: "token shorter than nonce + tag".to_string(),
        }));
    }

    let (nonce, rest) = raw.split_at(NONCE_LEN);
    let (tag, ciphertext) = rest.split_at(TAG_LEN);

    let expected_tag = compute_tag(secret, nonce, ciphertext);
    if !constant_time_eq(tag, &expected_tag) {
        return Err(ReasoningError::Crypto(CryptoError::InvalidSecretToken));
    }

    let ks = keystream(secret, nonce, ciphertext.len());
    let plaintext_bytes = xor_with_keystream(ciphertext, &ks);

    String::from_utf8(plaintext_bytes).map_err(|e| {
        ReasoningError::Crypto(CryptoError::MalformedCiphertext {
            reason: e.to_string(),
        })
    })
}

/// Mask a secret for display: strings of 8 or fewer characters are masked
/// entirely, longer strings keep their first and last 4 characters.
pub fn mask(plaintext: &str) -> String {
    let chars: Vec<char> = plaintext.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(chars.len() - 8), tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "a-deployment-wide-master-secret";

    #[test]
    fn round_trips_plaintext() {
        let wire = encrypt(SECRET, "sk-deepseek-abc123").unwrap();
        let plaintext = decrypt(SECRET, &wire).unwrap();
        assert_eq!(plaintext, "sk-deepseek-abc123");
    }

    #[test]
    fn round_trips_empty_plaintext() {
        let wire = encrypt(SECRET, "").unwrap();
        assert_eq!(decrypt(SECRET, &wire).unwrap(), "");
    }

    #[test]
    fn different_nonces_yield_different_wire_tokens() {
        let a = encrypt(SECRET, "same-plaintext").unwrap();
        let b = encrypt(SECRET, "same-plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn tampered_ciphertext_fails_verification() {
        let wire = encrypt(SECRET, "sk-deepseek-abc123").unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&wire).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = URL_SAFE_NO_PAD.encode(raw);

        let err = decrypt(SECRET, &tampered).unwrap_err();
        assert!(matches!(
            err,
            ReasoningError::Crypto(CryptoError::InvalidSecretToken)
        ));
    }

    #[test]
    fn rejects_secret_shorter_than_minimum() {
        let err = encrypt("short", "plaintext").unwrap_err();
        assert!(matches!(
            err,
            ReasoningError::Crypto(CryptoError::SecretTooShort { len: 5 })
        ));
    }

    #[test]
    fn rejects_malformed_base64() {
        let err = decrypt(SECRET, "not valid base64url!!").unwrap_err();
        assert!(matches!(
            err,
            ReasoningError::Crypto(CryptoError::MalformedCiphertext { .. })
        ));
    }

    #[test]
    fn mask_hides_short_strings_entirely() {
        assert_eq!(mask("sk-123"), "******");
        assert_eq!(mask("12345678"), "********");
    }

    #[test]
    fn mask_preserves_first_and_last_four_chars() {
        assert_eq!(mask("sk-deepseek-abc123"), "sk-d***********c123");
    }

    #[test]
    fn constant_time_eq_rejects_length_mismatch() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"abcd", b"abcd"));
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    const SECRET: &str = "a-deployment-wide-master-secret";

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn round_trip_holds_for_arbitrary_strings(plaintext in ".{0,200}") {
            let wire = encrypt(SECRET, &plaintext).unwrap();
            let recovered = decrypt(SECRET, &wire).unwrap();
            prop_assert_eq!(recovered, plaintext);
        }
    }
}
