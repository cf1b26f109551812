//! Base64 encoding and decoding utilities.
//!
//! Invoices travel inside URLs, so they use the URL-safe alphabet without
//! padding. [`RawUrlBase64`] wraps the encoded text.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64;
use std::fmt::Display;

/// A wrapper for URL-safe, unpadded base64 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUrlBase64(pub String);

impl RawUrlBase64 {
    /// Decodes the base64 text to raw binary data.
    ///
    /// # Errors
    ///
    /// Returns an error if the data is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        b64.decode(self.0.as_bytes())
    }

    /// Encodes raw binary data into base64 text.
    pub fn encode<T: AsRef<[u8]>>(input: T) -> Self {
        Self(b64.encode(input.as_ref()))
    }
}

impl AsRef<str> for RawUrlBase64 {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RawUrlBase64 {
    fn from(text: &str) -> Self {
        Self(text.to_owned())
    }
}

impl Display for RawUrlBase64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
