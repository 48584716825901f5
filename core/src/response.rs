//! Completed responses and their decoded views.

use std::str::FromStr;
use std::sync::OnceLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::http::Headers;

/// Byte-to-text decodings accepted by [`Response::text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Invalid sequences become U+FFFD.
    #[default]
    Utf8,
    /// One byte per code point, U+0000 to U+00FF.
    Latin1,
    /// Like `Latin1` with the high bit of every byte cleared.
    Ascii,
    /// Little-endian UTF-16; a dangling odd byte is dropped.
    Utf16Le,
    Base64,
    Hex,
}

impl Encoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            Encoding::Ascii => bytes.iter().map(|&b| char::from(b & 0x7f)).collect(),
            Encoding::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
            Encoding::Base64 => STANDARD.encode(bytes),
            Encoding::Hex => hex::encode(bytes),
        }
    }
}

impl FromStr for Encoding {
    type Err = Error;

    fn from_str(label: &str) -> Result<Self, Error> {
        match label.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "latin1" | "binary" | "iso-8859-1" => Ok(Encoding::Latin1),
            "ascii" => Ok(Encoding::Ascii),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(Encoding::Utf16Le),
            "base64" => Ok(Encoding::Base64),
            "hex" => Ok(Encoding::Hex),
            _ => Err(Error::UnknownEncoding(label.to_string())),
        }
    }
}

/// A fully received response.
///
/// Only the executors construct one after the whole body has arrived, so a
/// `Response` never describes a partial exchange. The decoded views are
/// computed on first use and cached.
#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: String,
    headers: Headers,
    body: Bytes,
    text: OnceLock<String>,
    json: OnceLock<Option<serde_json::Value>>,
}

impl Response {
    pub fn new(status: u16, reason: impl Into<String>, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            reason: reason.into(),
            headers,
            body,
            text: OnceLock::new(),
            json: OnceLock::new(),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Response headers in the order they arrived.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    /// Body decoded as text, UTF-8 unless `encoding` says otherwise.
    ///
    /// The first call decides: its result is cached and every later call
    /// returns it, whatever encoding that call asks for. Use
    /// [`Response::text_with`] to decode with a specific encoding every time.
    pub fn text(&self, encoding: Option<Encoding>) -> &str {
        self.text
            .get_or_init(|| encoding.unwrap_or_default().decode(&self.body))
    }

    /// Decode the body with `encoding`, bypassing the cache.
    pub fn text_with(&self, encoding: Encoding) -> String {
        encoding.decode(&self.body)
    }

    /// Body parsed as JSON, or `None` when it is not valid JSON.
    ///
    /// The bytes are parsed as they are; `_encoding` is accepted for symmetry
    /// with [`Response::text`] and ignored. The outcome is cached.
    pub fn json(&self, _encoding: Option<Encoding>) -> Option<&serde_json::Value> {
        self.json
            .get_or_init(|| serde_json::from_slice(&self.body).ok())
            .as_ref()
    }

    /// Deserialize the body into `T`, `None` on any decode failure. Not cached.
    pub fn json_as<T: DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_slice(&self.body).ok()
    }
}
