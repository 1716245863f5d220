//! AES-256-CBC codec for member pass payloads.
//!
//! Passes use the OpenSSL passphrase envelope that CryptoJS produces and
//! reads: base64 of `"Salted__" || salt || ciphertext`, with key and IV
//! derived from the secret and salt by `EVP_BytesToKey` (MD5, one round).
//!
//! The salt is fixed by configuration instead of drawn per call, so the
//! output is deterministic. The gate-side verifier relies on that to
//! recompute the expected pass for the current minute (and a few preceding
//! ones) without any lookup. [`decrypt`](CredentialCodec::decrypt) accepts
//! any salt, so randomly salted passes decrypt too.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{Duration, NaiveDateTime};
use openssl::hash::MessageDigest;
use openssl::pkcs5::{bytes_to_key, KeyIvPair};
use openssl::symm::{decrypt, encrypt, Cipher};

use super::plaintext::PassPlaintext;
use crate::error::CryptoError;

pub const DEFAULT_PASS_SECRET: &str = "ccbc-cms-qr-secret-key-2024";
pub const DEFAULT_PASS_IV: &str = "ccbc-cms-qr-iv";

const SALTED_MAGIC: &[u8; 8] = b"Salted__";
const SALT_LEN: usize = 8;

#[derive(Clone)]
pub struct CredentialCodec {
    passphrase: Vec<u8>,
    salt: [u8; SALT_LEN],
}

impl CredentialCodec {
    /// `secret` is the passphrase. The salt is the UTF-8 bytes of `iv`, cut
    /// to 8 bytes and zero-filled when shorter.
    pub fn new(secret: &str, iv: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        let raw = iv.as_bytes();
        let len = raw.len().min(SALT_LEN);
        salt[..len].copy_from_slice(&raw[..len]);

        Self {
            passphrase: secret.as_bytes().to_vec(),
            salt,
        }
    }

    fn cipher() -> Cipher {
        Cipher::aes_256_cbc()
    }

    fn derive(&self, salt: &[u8; SALT_LEN]) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let KeyIvPair { key, iv } = bytes_to_key(
            Self::cipher(),
            MessageDigest::md5(),
            &self.passphrase,
            Some(&salt[..]),
            1,
        )?;
        let iv =
            iv.ok_or_else(|| CryptoError::Cipher("key derivation produced no IV".to_string()))?;
        Ok((key, iv))
    }

    pub fn encrypt(&self, plaintext: &PassPlaintext) -> Result<String, CryptoError> {
        let json = plaintext.to_json()?;
        let (key, iv) = self.derive(&self.salt)?;
        let sealed = encrypt(Self::cipher(), &key, Some(&iv), json.as_bytes())?;

        let mut envelope = Vec::with_capacity(SALTED_MAGIC.len() + SALT_LEN + sealed.len());
        envelope.extend_from_slice(SALTED_MAGIC);
        envelope.extend_from_slice(&self.salt);
        envelope.extend_from_slice(&sealed);
        Ok(STANDARD.encode(envelope))
    }

    /// Like [`encrypt`](Self::encrypt) but yields `""` on failure, which
    /// renderers show as a loading state.
    pub fn encrypt_or_empty(&self, plaintext: &PassPlaintext) -> String {
        match self.encrypt(plaintext) {
            Ok(ciphertext) => ciphertext,
            Err(e) => {
                tracing::warn!(error = %e, code = e.error_code(), "Member pass encryption failed");
                String::new()
            }
        }
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<PassPlaintext, CryptoError> {
        let envelope = STANDARD.decode(ciphertext.trim())?;
        let (salt, sealed) = split_envelope(&envelope)?;
        let (key, iv) = self.derive(&salt)?;
        let opened = decrypt(Self::cipher(), &key, Some(&iv), sealed)?;
        serde_json::from_slice(&opened).map_err(|e| CryptoError::Malformed(e.to_string()))
    }

    /// Whether `ciphertext` is the pass for `worship_id` at any minute in
    /// `[now - lookback_minutes, now]`.
    pub fn matches_window(
        &self,
        ciphertext: &str,
        worship_id: &str,
        now: NaiveDateTime,
        lookback_minutes: u32,
    ) -> bool {
        (0..=i64::from(lookback_minutes)).any(|back| {
            let minute = now - Duration::minutes(back);
            let expected = PassPlaintext::at_minute(worship_id, minute);
            matches!(self.encrypt(&expected), Ok(candidate) if candidate == ciphertext)
        })
    }
}

impl Default for CredentialCodec {
    fn default() -> Self {
        Self::new(DEFAULT_PASS_SECRET, DEFAULT_PASS_IV)
    }
}

impl std::fmt::Debug for CredentialCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialCodec")
            .field("passphrase", &"<redacted>")
            .field("salt", &"<redacted>")
            .finish()
    }
}

fn split_envelope(envelope: &[u8]) -> Result<([u8; SALT_LEN], &[u8]), CryptoError> {
    let header = SALTED_MAGIC.len() + SALT_LEN;
    if envelope.len() <= header || !envelope.starts_with(SALTED_MAGIC) {
        return Err(CryptoError::Malformed("missing Salted__ envelope".to_string()));
    }
    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&envelope[SALTED_MAGIC.len()..header]);
    Ok((salt, &envelope[header..]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_same_minute_same_ciphertext() {
        let codec = CredentialCodec::default();
        let c1 = codec.encrypt(&PassPlaintext::new("1024", "202501011230")).unwrap();
        let c1_again = codec.encrypt(&PassPlaintext::new("1024", "202501011230")).unwrap();
        let c2 = codec.encrypt(&PassPlaintext::new("1024", "202501011231")).unwrap();

        assert_eq!(c1, c1_again);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_known_answer_for_default_key() {
        // Same bytes as `openssl enc -aes-256-cbc -md md5 -S 636362632d636d73`
        // with the default passphrase, i.e. what CryptoJS emits for salt "ccbc-cms".
        let codec = CredentialCodec::default();
        let ciphertext = codec.encrypt(&PassPlaintext::new("1024", "202501011230")).unwrap();
        assert_eq!(
            ciphertext,
            "U2FsdGVkX19jY2JjLWNtcxeVAhrPtwHf9YcQSY8E2Z8/Yc5R3hUL4qX5FmwKwfPQ4E69UJnD5Apbud4gJ4mKRNTEmEg8GDpUaeLXdcIVCOw="
        );
    }

    #[test]
    fn test_decrypts_pass_with_foreign_salt() {
        // Salt 0102030405060708, as a randomly salted CryptoJS pass would carry.
        let codec = CredentialCodec::default();
        let decoded = codec
            .decrypt("U2FsdGVkX18BAgMEBQYHCHGZf3SWhjKkykhYGirsOiuu6ZZH3QDrGnr65TbgPHZDtot42NWVi21kFR2FQY2SPFamSBCo7VPJ+DWfruhdts4=")
            .unwrap();
        assert_eq!(decoded, PassPlaintext::new("777", "202509201630"));
    }

    #[test]
    fn test_output_is_salted_envelope() {
        // 16-byte header plus 55-byte JSON padded to 64 bytes -> 108 base64 chars.
        let codec = CredentialCodec::default();
        let ciphertext = codec.encrypt(&PassPlaintext::new("1024", "202501011230")).unwrap();
        let raw = STANDARD.decode(&ciphertext).unwrap();
        assert_eq!(ciphertext.len(), 108);
        assert_eq!(&raw[..8], b"Salted__");
        assert_eq!(&raw[8..16], b"ccbc-cms");
        assert_eq!(raw.len(), 80);
    }

    #[test]
    fn test_round_trip() {
        let codec = CredentialCodec::default();
        let payload = PassPlaintext::new("未設定", "202501011230");
        let ciphertext = codec.encrypt(&payload).unwrap();
        assert_eq!(codec.decrypt(&ciphertext).unwrap(), payload);
    }

    #[test]
    fn test_different_secret_does_not_decrypt() {
        let ciphertext = CredentialCodec::default()
            .encrypt(&PassPlaintext::new("1024", "202501011230"))
            .unwrap();
        let other = CredentialCodec::new("another-secret", DEFAULT_PASS_IV);
        assert!(other.decrypt(&ciphertext).is_err());
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        let codec = CredentialCodec::default();
        assert!(matches!(
            codec.decrypt("***not base64***"),
            Err(CryptoError::Encoding(_))
        ));
        assert!(matches!(
            codec.decrypt("AAAA"),
            Err(CryptoError::Malformed(_))
        ));
        // Valid envelope, body not a whole cipher block.
        let truncated = STANDARD.encode(b"Salted__ccbc-cmsabc");
        assert!(matches!(
            codec.decrypt(&truncated),
            Err(CryptoError::Cipher(_))
        ));
    }

    #[test]
    fn test_salt_uses_first_eight_iv_bytes() {
        let short = CredentialCodec::new("k", "01234567");
        let long = CredentialCodec::new("k", "01234567-ignored");
        let payload = PassPlaintext::new("1", "202501010000");
        assert_eq!(short.encrypt(&payload).unwrap(), long.encrypt(&payload).unwrap());
        assert_ne!(
            short.encrypt(&payload).unwrap(),
            CredentialCodec::new("k", "7654321").encrypt(&payload).unwrap()
        );
    }

    #[test]
    fn test_matches_window() {
        let codec = CredentialCodec::default();
        let issued = codec.encrypt(&PassPlaintext::at_minute("1024", at(12, 30))).unwrap();

        assert!(codec.matches_window(&issued, "1024", at(12, 30), 0));
        assert!(codec.matches_window(&issued, "1024", at(12, 34), 5));
        assert!(!codec.matches_window(&issued, "1024", at(12, 36), 5));
        assert!(!codec.matches_window(&issued, "2048", at(12, 30), 5));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let rendered = format!("{:?}", CredentialCodec::default());
        assert!(rendered.contains("<redacted>"));
    }
}
