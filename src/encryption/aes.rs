use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::encryption::error::EncryptionError;
use crate::encryption::Payload;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Initialization vector shared by every encrypt and decrypt operation.
///
/// The sandbox API's payload scheme uses this fixed value on both sides of
/// the wire; it must match byte-for-byte or decryption of server responses
/// fails with a padding error. Do not randomize or make configurable.
pub const FIXED_IV: &[u8; 16] = b"SSGAPIInitVector";

fn decode_key(key: &str) -> Result<Vec<u8>, EncryptionError> {
    let raw = base64::decode(key.trim())
        .map_err(|e| EncryptionError::InvalidKey(format!("key is not valid base64: {}", e)))?;
    if raw.len() != 32 {
        return Err(EncryptionError::InvalidKey(format!(
            "key must decode to 32 bytes for AES-256, got {}",
            raw.len()
        )));
    }
    Ok(raw)
}

/// Encrypt a payload with AES-256-CBC/PKCS7 under the fixed IV and return the
/// ciphertext as a base64 string.
///
/// `key` is the base64 encoding of a 256-bit key. Encryption is deterministic:
/// the same key and payload always produce the same ciphertext.
pub fn encrypt<'a, P>(key: &str, plaintext: P) -> Result<String, EncryptionError>
where
    P: Into<Payload<'a>>,
{
    let raw_key = decode_key(key)?;
    let cipher = Aes256CbcEnc::new_from_slices(&raw_key, FIXED_IV)
        .map_err(|e| EncryptionError::EncryptionError(e.to_string()))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(plaintext.into().as_bytes());
    Ok(base64::encode(ciphertext))
}

/// Decrypt a base64 ciphertext produced by [`encrypt`] (or by the sandbox API
/// itself) back to the raw plaintext bytes.
///
/// Fails with a decryption error when the ciphertext was produced under a
/// different key, is truncated, or is not valid base64.
pub fn decrypt<'a, C>(key: &str, ciphertext: C) -> Result<Vec<u8>, EncryptionError>
where
    C: Into<Payload<'a>>,
{
    let raw_key = decode_key(key)?;
    let raw_ct = base64::decode(ciphertext.into().as_bytes()).map_err(|e| {
        EncryptionError::DecryptionError(format!("ciphertext is not valid base64: {}", e))
    })?;
    if raw_ct.is_empty() || raw_ct.len() % 16 != 0 {
        return Err(EncryptionError::DecryptionError(format!(
            "ciphertext length must be a non-zero multiple of 16 bytes, got {}",
            raw_ct.len()
        )));
    }
    let cipher = Aes256CbcDec::new_from_slices(&raw_key, FIXED_IV)
        .map_err(|e| EncryptionError::DecryptionError(e.to_string()))?;
    cipher
        .decrypt_padded_vec_mut::<Pkcs7>(&raw_ct)
        .map_err(|_| EncryptionError::DecryptionError("invalid PKCS7 padding".to_string()))
}

/// [`decrypt`], then decode the plaintext as UTF-8.
pub fn decrypt_text<'a, C>(key: &str, ciphertext: C) -> Result<String, EncryptionError>
where
    C: Into<Payload<'a>>,
{
    let plaintext = decrypt(key, ciphertext)?;
    String::from_utf8(plaintext)
        .map_err(|e| EncryptionError::DecryptionError(format!("plaintext is not UTF-8: {}", e)))
}
