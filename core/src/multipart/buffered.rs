//! Fully buffered multipart/form-data rendering.
//!
//! Every payload is base64-encoded and the boundary is the fixed
//! `----JustNodeFormBoundary`, so the output is deterministic and meant for
//! small bodies handed to [`Client::execute`](crate::Client::execute).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

use super::DEFAULT_PART_CONTENT_TYPE;

/// Boundary used by [`render_multipart_body`].
pub const BUFFERED_BOUNDARY: &str = "----JustNodeFormBoundary";

/// `Content-Type` value matching [`render_multipart_body`] output.
pub const BUFFERED_CONTENT_TYPE: &str = "multipart/form-data; boundary=----JustNodeFormBoundary";

/// Payload of a buffered part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Encoded as UTF-8, then base64.
    Text(String),
    /// Base64-encoded as is.
    Bytes(Bytes),
    /// Already base64; written verbatim.
    Encoded(String),
}

impl Payload {
    fn to_base64(&self) -> String {
        match self {
            Payload::Text(text) => STANDARD.encode(text.as_bytes()),
            Payload::Bytes(bytes) => STANDARD.encode(bytes),
            Payload::Encoded(encoded) => encoded.clone(),
        }
    }
}

/// One part of a buffered multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferedPart {
    /// Appended to `form-data; `, e.g. `name="avatar"; filename="a.png"`.
    pub disposition: Option<String>,
    /// Defaults to `application/octet-stream`.
    pub content_type: Option<String>,
    pub payload: Payload,
}

impl BufferedPart {
    pub fn new(payload: Payload) -> Self {
        Self {
            disposition: None,
            content_type: None,
            payload,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Payload::Text(text.into()))
    }

    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        Self::new(Payload::Bytes(bytes.into()))
    }

    pub fn encoded(base64: impl Into<String>) -> Self {
        Self::new(Payload::Encoded(base64.into()))
    }

    pub fn disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Render `parts` in order as one multipart body. The closing delimiter has
/// no trailing CRLF.
pub fn render_multipart_body(parts: &[BufferedPart]) -> String {
    let mut body = String::new();
    for part in parts {
        body.push_str("--");
        body.push_str(BUFFERED_BOUNDARY);
        body.push_str("\r\nContent-Disposition: form-data");
        if let Some(disposition) = &part.disposition {
            body.push_str("; ");
            body.push_str(disposition);
        }
        body.push_str("\r\nContent-Type: ");
        body.push_str(part.content_type.as_deref().unwrap_or(DEFAULT_PART_CONTENT_TYPE));
        body.push_str("\r\nContent-Transfer-Encoding: base64\r\n\r\n");
        body.push_str(&part.payload.to_base64());
        body.push_str("\r\n");
    }
    body.push_str("--");
    body.push_str(BUFFERED_BOUNDARY);
    body.push_str("--");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_of(body: &str) -> &str {
        let start = body.find("\r\n\r\n").unwrap() + 4;
        let end = start + body[start..].find("\r\n").unwrap();
        &body[start..end]
    }

    #[test]
    fn empty_list_is_just_the_closing_delimiter() {
        assert_eq!(render_multipart_body(&[]), "------JustNodeFormBoundary--");
    }

    #[test]
    fn bare_text_part_uses_defaults() {
        let body = render_multipart_body(&[BufferedPart::text("hi")]);
        assert!(body.contains("Content-Disposition: form-data\r\n"));
        assert!(body.contains("Content-Type: application/octet-stream\r\n"));
        assert!(body.contains("Content-Transfer-Encoding: base64\r\n"));
        assert_eq!(STANDARD.decode(payload_of(&body)).unwrap(), b"hi");
        assert!(body.ends_with("\r\n------JustNodeFormBoundary--"));
    }

    #[test]
    fn full_layout_of_one_part() {
        let part = BufferedPart::bytes(&b"\x00\x01"[..])
            .disposition(r#"name="blob"; filename="b.bin""#)
            .content_type("image/png");
        assert_eq!(
            render_multipart_body(&[part]),
            "------JustNodeFormBoundary\r\n\
             Content-Disposition: form-data; name=\"blob\"; filename=\"b.bin\"\r\n\
             Content-Type: image/png\r\n\
             Content-Transfer-Encoding: base64\r\n\
             \r\n\
             AAE=\r\n\
             ------JustNodeFormBoundary--"
        );
    }

    #[test]
    fn encoded_payload_is_written_verbatim() {
        let body = render_multipart_body(&[BufferedPart::encoded("not-even-base64")]);
        assert_eq!(payload_of(&body), "not-even-base64");
    }

    #[test]
    fn base64_payload_round_trips_arbitrary_bytes() {
        let samples: Vec<Vec<u8>> = vec![
            vec![],
            vec![0],
            (0..=255).collect(),
            b"\r\n------JustNodeFormBoundary--\r\n".to_vec(),
            (0..1000u32).map(|i| (i * 7 % 251) as u8).collect(),
        ];
        for sample in samples {
            let body = render_multipart_body(&[BufferedPart::bytes(sample.clone())]);
            assert_eq!(STANDARD.decode(payload_of(&body)).unwrap(), sample);
        }
    }

    #[test]
    fn parts_keep_input_order() {
        let body = render_multipart_body(&[
            BufferedPart::text("first").disposition("name=\"a\""),
            BufferedPart::text("second").disposition("name=\"b\""),
        ]);
        let a = body.find("name=\"a\"").unwrap();
        let b = body.find("name=\"b\"").unwrap();
        assert!(a < b);
        assert_eq!(body.matches("------JustNodeFormBoundary\r\n").count(), 2);
    }
}
