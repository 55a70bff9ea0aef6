//! Symmetric payload codec
//!
//! AES-256-CBC with PKCS7 padding and a fresh random 16-byte IV per call.
//! The wire form is `base64(iv) + ":" + base64(ciphertext)`, carried in a
//! `{ "payload": ... }` envelope by the HTTP pipeline.

use aes::Aes256;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, STANDARD};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CryptoError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Pre-shared key shipped with the portal (base64, unpadded)
pub const DEFAULT_KEY: &str = "aXRlbGluYzIwY3JwdG8zMmF1dGhzZXJ2aWNlMjVrZXk";

/// Decoded form of [`DEFAULT_KEY`]
const DEFAULT_KEY_BYTES: &[u8; KEY_LEN] = b"itelinc20crpto32authservice25key";

/// IV length in bytes
pub const IV_LEN: usize = 16;

/// Key length in bytes (AES-256)
pub const KEY_LEN: usize = 32;

/// Separator between the IV and ciphertext segments
const SEPARATOR: char = ':';

/// Base64 decoder that accepts both padded and unpadded input
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Wire envelope for encrypted bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub payload: String,
}

impl Envelope {
    /// Return the ciphertext if `value` looks like an envelope.
    ///
    /// Only objects whose `payload` is a non-empty string qualify.
    pub fn detect(value: &Value) -> Option<&str> {
        value
            .as_object()
            .and_then(|obj| obj.get("payload"))
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({ "payload": self.payload })
    }
}

/// AES-256-CBC payload codec bound to one key
#[derive(Clone)]
pub struct PayloadCodec {
    key: [u8; KEY_LEN],
}

impl std::fmt::Debug for PayloadCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadCodec")
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Default for PayloadCodec {
    fn default() -> Self {
        Self {
            key: *DEFAULT_KEY_BYTES,
        }
    }
}

impl PayloadCodec {
    /// Create a codec from a base64 key (padding optional)
    pub fn new(key_b64: &str) -> Result<Self, CryptoError> {
        let bytes = LENIENT
            .decode(key_b64.trim())
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;

        let key: [u8; KEY_LEN] = bytes.as_slice().try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("expected {} bytes, got {}", KEY_LEN, bytes.len()))
        })?;

        Ok(Self { key })
    }

    /// Encrypt a UTF-8 string into `base64(iv):base64(ciphertext)`
    pub fn encrypt(&self, plain_text: &str) -> Result<String, CryptoError> {
        let mut iv = [0u8; IV_LEN];
        OsRng
            .try_fill_bytes(&mut iv)
            .map_err(|e| CryptoError::Encryption(format!("IV generation failed: {}", e)))?;

        self.encrypt_with_iv(plain_text, &iv)
    }

    fn encrypt_with_iv(&self, plain_text: &str, iv: &[u8; IV_LEN]) -> Result<String, CryptoError> {
        let cipher = Aes256CbcEnc::new_from_slices(&self.key, iv)
            .map_err(|e| CryptoError::Encryption(e.to_string()))?;
        let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plain_text.as_bytes());

        Ok(format!(
            "{}{}{}",
            STANDARD.encode(iv),
            SEPARATOR,
            STANDARD.encode(ciphertext)
        ))
    }

    /// Decrypt an envelope string produced by [`encrypt`](Self::encrypt) or the server
    pub fn decrypt(&self, envelope: &str) -> Result<String, CryptoError> {
        let (iv_b64, data_b64) = envelope
            .split_once(SEPARATOR)
            .ok_or_else(|| CryptoError::Decryption("missing ':' separator".into()))?;

        let iv = LENIENT
            .decode(iv_b64)
            .map_err(|e| CryptoError::Decryption(format!("IV is not base64: {}", e)))?;
        if iv.len() != IV_LEN {
            return Err(CryptoError::Decryption(format!(
                "IV must be {} bytes, got {}",
                IV_LEN,
                iv.len()
            )));
        }

        let ciphertext = LENIENT
            .decode(data_b64)
            .map_err(|e| CryptoError::Decryption(format!("ciphertext is not base64: {}", e)))?;

        let cipher = Aes256CbcDec::new_from_slices(&self.key, &iv)
            .map_err(|e| CryptoError::Decryption(e.to_string()))?;
        let plain = cipher
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CryptoError::Decryption("bad padding".into()))?;

        let text = String::from_utf8(plain)
            .map_err(|_| CryptoError::Decryption("plaintext is not valid UTF-8".into()))?;
        if text.is_empty() {
            return Err(CryptoError::Decryption("decryption resulted in empty text".into()));
        }

        Ok(text)
    }

    /// Serialize `value` to JSON and wrap it in an envelope
    pub fn encrypt_json<T: Serialize>(&self, value: &T) -> Result<Envelope, CryptoError> {
        let json = serde_json::to_string(value)
            .map_err(|e| CryptoError::Encryption(format!("serialization failed: {}", e)))?;
        Ok(Envelope {
            payload: self.encrypt(&json)?,
        })
    }

    /// Decrypt an envelope string and parse the plaintext as JSON
    pub fn decrypt_json(&self, envelope: &str) -> Result<Value, CryptoError> {
        let text = self.decrypt(envelope)?;
        serde_json::from_str(&text)
            .map_err(|e| CryptoError::Decryption(format!("plaintext is not JSON: {}", e)))
    }
}
