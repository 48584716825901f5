//! Error types for request execution.
//!
//! # Design
//! Transport failures keep the underlying `io::Error` so callers can inspect
//! the kind (refused, reset, TLS handshake, ...). Failures of a streaming part
//! source get their own variant carrying the part index, because "the file I
//! attached is unreadable" and "the server hung up" call for different fixes.
//! Malformed JSON is deliberately absent: `Response::json` reports it as
//! `None`.

use std::io;

use thiserror::Error;

/// Errors returned by the request executors.
#[derive(Debug, Error)]
pub enum Error {
    /// Connecting, the TLS handshake, or reading/writing the connection failed.
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// The URL handed to the streaming executor could not be parsed.
    #[error("invalid URL {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The server sent something that is not an HTTP/1.x response.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Reading the file or byte stream of a multipart part failed.
    #[error("multipart part {index}: source failed: {source}")]
    Source {
        index: usize,
        #[source]
        source: io::Error,
    },

    /// A streaming multipart part was given no payload source at all.
    #[error("multipart part {index} has no payload source")]
    EmptyPart { index: usize },

    /// A header name or value would break the request framing.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A text encoding label that `Encoding` does not know.
    #[error("unknown text encoding {0:?}")]
    UnknownEncoding(String),
}

pub type Result<T> = std::result::Result<T, Error>;
