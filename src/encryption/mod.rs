pub mod aes;
pub mod error;

pub use aes::{decrypt, decrypt_text, encrypt, FIXED_IV};
pub use error::EncryptionError;

/// Input to the cipher routines: either text (encoded to UTF-8 bytes before
/// any cryptographic operation) or raw bytes. Callers pick the arm explicitly
/// instead of relying on runtime type coercion.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Text(&'a str),
    Bytes(&'a [u8]),
}

impl<'a> Payload<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            Payload::Text(s) => s.as_bytes(),
            Payload::Bytes(b) => b,
        }
    }
}

impl<'a> From<&'a str> for Payload<'a> {
    fn from(s: &'a str) -> Self {
        Payload::Text(s)
    }
}

impl<'a> From<&'a [u8]> for Payload<'a> {
    fn from(b: &'a [u8]) -> Self {
        Payload::Bytes(b)
    }
}

impl<'a> From<&'a String> for Payload<'a> {
    fn from(s: &'a String) -> Self {
        Payload::Text(s.as_str())
    }
}

impl<'a> From<&'a Vec<u8>> for Payload<'a> {
    fn from(b: &'a Vec<u8>) -> Self {
        Payload::Bytes(b.as_slice())
    }
}
