//! Thin async HTTP(S) request helper.
//!
//! # Overview
//! Sends a request, buffers the complete response, and builds
//! multipart/form-data bodies in two flavours: a buffered renderer for small
//! bodies and a streaming executor that writes files and byte streams onto
//! the connection part by part.
//!
//! # Design
//! - `Client` is stateless apart from its connector and configuration; every
//!   call owns one connection for one request/response exchange.
//! - The connection layer sits behind the `Connector` trait: `TcpConnector`
//!   picks plain TCP or rustls from the URL scheme, tests substitute
//!   in-memory streams.
//! - `Response` only exists once the whole body has arrived; its text and
//!   JSON views are computed lazily and cached.
//! - No retries, redirects, timeouts or connection reuse.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod multipart;
pub mod response;
pub mod transport;

pub use client::{multipart_request, request, Client};
pub use config::{ClientConfig, RequestOptions};
pub use error::{Error, Result};
pub use http::{Headers, HttpMethod, HttpRequest};
pub use multipart::{render_multipart_body, BufferedPart, Payload, StreamPart};
pub use response::{Encoding, Response};
pub use transport::{Connector, Scheme, TcpConnector};
