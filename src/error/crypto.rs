//! Member pass codec errors.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum CryptoError {
    #[error("Failed to serialize pass payload: {0}")]
    Serialize(String),

    #[error("Cipher failure: {0}")]
    Cipher(String),

    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(String),

    #[error("Decrypted payload is not a pass: {0}")]
    Malformed(String),
}

impl CryptoError {
    pub fn user_message(&self) -> String {
        "The member pass could not be generated.".to_string()
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CryptoError::Serialize(_) => "E_CRYPTO_SERIALIZE",
            CryptoError::Cipher(_) => "E_CRYPTO_CIPHER",
            CryptoError::Encoding(_) => "E_CRYPTO_ENCODING",
            CryptoError::Malformed(_) => "E_CRYPTO_MALFORMED",
        }
    }
}

impl From<openssl::error::ErrorStack> for CryptoError {
    fn from(err: openssl::error::ErrorStack) -> Self {
        CryptoError::Cipher(err.to_string())
    }
}

impl From<base64::DecodeError> for CryptoError {
    fn from(err: base64::DecodeError) -> Self {
        CryptoError::Encoding(err.to_string())
    }
}
