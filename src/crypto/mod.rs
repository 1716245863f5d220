//! Member pass encryption.
//!
//! A pass is `{"worship_id", "current_datetime"}` JSON sealed with
//! AES-256-CBC/PKCS7 in the OpenSSL `Salted__` passphrase envelope under a
//! static secret and salt, then base64 encoded.

pub mod codec;
pub mod plaintext;

pub use codec::{CredentialCodec, DEFAULT_PASS_IV, DEFAULT_PASS_SECRET};
pub use plaintext::{PassPlaintext, PASS_DATETIME_FORMAT};
