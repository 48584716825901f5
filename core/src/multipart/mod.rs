//! multipart/form-data bodies.
//!
//! Two distinct wire behaviours live here:
//! - [`render_multipart_body`]: buffered, fixed boundary, every payload
//!   base64-encoded.
//! - [`StreamPart`] + [`Client::execute_multipart`](crate::Client::execute_multipart):
//!   random boundary per request, raw payloads, files and readers streamed.

/// `Content-Type` of a part that does not name one.
const DEFAULT_PART_CONTENT_TYPE: &str = "application/octet-stream";

mod buffered;
pub(crate) mod streaming;

pub use buffered::{render_multipart_body, BufferedPart, Payload, BUFFERED_BOUNDARY, BUFFERED_CONTENT_TYPE};
pub use streaming::{Boundary, ByteStream, PartHead, PartSource, StreamPart};
