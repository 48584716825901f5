//! Streaming multipart/form-data: parts are written straight onto the
//! request as they are produced, so files and byte streams never have to fit
//! in memory.
//!
//! # Part sources
//! A [`StreamPart`] carries up to four payload sources. When more than one is
//! set, the first in the order file, data, base64, stream is used and the
//! rest are ignored with a warning. [`StreamPart::into_source`] performs that
//! resolution into a [`PartSource`].

use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use log::{trace, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use uuid::Uuid;

use super::DEFAULT_PART_CONTENT_TYPE;
use crate::error::{Error, Result};
use crate::transport::wire::RequestWriter;

const COPY_BUFFER: usize = 16 * 1024;

/// A readable byte source supplied by the caller.
pub type ByteStream = Box<dyn AsyncRead + Send + Unpin>;

/// Delimiter token of one streaming multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    /// Nanosecond timestamp plus a random UUID. Fresh on every call.
    pub fn generate() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        Self(format!("JustRequestBoundary{nanos:x}{}", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Content-Type` header value announcing this boundary.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.0)
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a part's payload comes from, once resolved.
pub enum PartSource {
    /// Local file, streamed.
    File(PathBuf),
    /// Sent verbatim.
    Data(Bytes),
    /// Base64 text, sent with `Content-Transfer-Encoding: base64`.
    Base64(String),
    /// Caller's reader, streamed.
    Stream(ByteStream),
}

impl fmt::Debug for PartSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartSource::File(path) => f.debug_tuple("File").field(path).finish(),
            PartSource::Data(data) => f.debug_tuple("Data").field(&data.len()).finish(),
            PartSource::Base64(text) => f.debug_tuple("Base64").field(&text.len()).finish(),
            PartSource::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Header lines of a resolved part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartHead {
    pub disposition: Option<String>,
    pub content_type: Option<String>,
}

/// One part of a streaming multipart body.
#[derive(Default)]
pub struct StreamPart {
    /// Appended to `form-data; ` when present.
    pub disposition: Option<String>,
    /// `Content-Type` of the part; `application/octet-stream` when absent.
    pub content_type: Option<String>,
    pub file: Option<PathBuf>,
    pub data: Option<Bytes>,
    pub base64: Option<String>,
    pub stream: Option<ByteStream>,
}

impl StreamPart {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn data(data: impl Into<Bytes>) -> Self {
        Self {
            data: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn base64(text: impl Into<String>) -> Self {
        Self {
            base64: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn stream(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            stream: Some(Box::new(reader)),
            ..Self::default()
        }
    }

    pub fn disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Pick the payload source by precedence. `index` is the part's
    /// position, used in diagnostics.
    pub fn into_source(self, index: usize) -> Result<(PartHead, PartSource)> {
        let set = [
            self.file.is_some(),
            self.data.is_some(),
            self.base64.is_some(),
            self.stream.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count();
        if set > 1 {
            warn!("multipart part {index} has {set} payload sources; using the first of file/data/base64/stream");
        }
        let head = PartHead {
            disposition: self.disposition,
            content_type: self.content_type,
        };
        let source = if let Some(path) = self.file {
            PartSource::File(path)
        } else if let Some(data) = self.data {
            PartSource::Data(data)
        } else if let Some(text) = self.base64 {
            PartSource::Base64(text)
        } else if let Some(reader) = self.stream {
            PartSource::Stream(reader)
        } else {
            return Err(Error::EmptyPart { index });
        };
        Ok((head, source))
    }
}

impl fmt::Debug for StreamPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamPart")
            .field("disposition", &self.disposition)
            .field("content_type", &self.content_type)
            .field("file", &self.file)
            .field("data", &self.data.as_ref().map(Bytes::len))
            .field("base64", &self.base64.as_ref().map(String::len))
            .field("stream", &self.stream.is_some())
            .finish()
    }
}

/// Write every part and the closing delimiter. The request is left open for
/// the caller to finish.
pub(crate) async fn write_parts<S>(
    writer: &mut RequestWriter<S>,
    boundary: &Boundary,
    parts: Vec<StreamPart>,
) -> Result<()>
where
    S: AsyncWrite + Unpin,
{
    for (index, part) in parts.into_iter().enumerate() {
        let (head, source) = part.into_source(index)?;
        trace!("writing multipart part {index}: {source:?}");

        let mut lines = format!("--{boundary}\r\n");
        if let Some(disposition) = &head.disposition {
            lines.push_str(&format!("Content-Disposition: form-data; {disposition}\r\n"));
        }
        let content_type = head.content_type.as_deref().unwrap_or(DEFAULT_PART_CONTENT_TYPE);
        lines.push_str(&format!("Content-Type: {content_type}\r\n"));

        match source {
            PartSource::Data(data) => {
                lines.push_str("\r\n");
                writer.write(lines.as_bytes()).await?;
                writer.write(&data).await?;
            }
            PartSource::Base64(text) => {
                lines.push_str("Content-Transfer-Encoding: base64\r\n\r\n");
                writer.write(lines.as_bytes()).await?;
                writer.write(text.as_bytes()).await?;
            }
            PartSource::File(path) => {
                lines.push_str("\r\n");
                writer.write(lines.as_bytes()).await?;
                let mut file = File::open(&path)
                    .await
                    .map_err(|source| Error::Source { index, source })?;
                let sent = drain(writer, &mut file, index).await?;
                trace!("part {index}: sent {sent} bytes from {}", path.display());
            }
            PartSource::Stream(mut reader) => {
                lines.push_str("\r\n");
                writer.write(lines.as_bytes()).await?;
                let sent = drain(writer, &mut reader, index).await?;
                trace!("part {index}: sent {sent} bytes from stream");
            }
        }
        writer.write(b"\r\n").await?;
        writer.flush().await?;
    }
    writer.write(format!("--{boundary}--\r\n").as_bytes()).await?;
    Ok(())
}

/// Copy `source` onto the request without ending it. Each read waits for the
/// previous write to be accepted.
async fn drain<S, R>(writer: &mut RequestWriter<S>, source: &mut R, index: usize) -> Result<u64>
where
    S: AsyncWrite + Unpin,
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; COPY_BUFFER];
    let mut total = 0u64;
    loop {
        let n = source
            .read(&mut buf)
            .await
            .map_err(|source| Error::Source { index, source })?;
        if n == 0 {
            return Ok(total);
        }
        writer.write(&buf[..n]).await?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    use crate::http::{Headers, HttpMethod, CONTENT_LENGTH};
    use crate::transport::select;

    async fn render(parts: Vec<StreamPart>, boundary: &Boundary) -> Result<String> {
        // A Content-Length keeps the writer from chunk-framing, so the
        // output is the bare multipart body after the head.
        let headers: Headers = vec![(CONTENT_LENGTH, "0")].into_iter().collect();
        let target = select("http://localhost/").unwrap();
        let mut writer = RequestWriter::start(Vec::new(), &HttpMethod::Post, &target, &headers).await?;
        write_parts(&mut writer, boundary, parts).await?;
        let wire = String::from_utf8(writer.finish().await?).unwrap();
        let start = wire.find("\r\n\r\n").unwrap() + 4;
        Ok(wire[start..].to_string())
    }

    #[test]
    fn boundaries_are_not_reused() {
        let a = Boundary::generate();
        let b = Boundary::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("JustRequestBoundary"));
        assert_eq!(a.content_type(), format!("multipart/form-data; boundary={a}"));
    }

    #[test]
    fn precedence_is_file_data_base64_stream() {
        let part = StreamPart {
            file: Some("a.bin".into()),
            data: Some(Bytes::from_static(b"d")),
            base64: Some("ZA==".into()),
            stream: Some(Box::new(io::Cursor::new(Vec::new()))),
            ..StreamPart::default()
        };
        assert!(matches!(part.into_source(0).unwrap().1, PartSource::File(_)));

        let part = StreamPart {
            data: Some(Bytes::from_static(b"d")),
            base64: Some("ZA==".into()),
            ..StreamPart::default()
        };
        assert!(matches!(part.into_source(0).unwrap().1, PartSource::Data(_)));

        let part = StreamPart {
            base64: Some("ZA==".into()),
            stream: Some(Box::new(io::Cursor::new(Vec::new()))),
            ..StreamPart::default()
        };
        assert!(matches!(part.into_source(0).unwrap().1, PartSource::Base64(_)));
    }

    #[test]
    fn part_without_source_is_rejected() {
        let err = StreamPart::default().disposition("name=\"x\"").into_source(3).unwrap_err();
        assert!(matches!(err, Error::EmptyPart { index: 3 }));
    }

    #[tokio::test]
    async fn inline_parts_layout() {
        let boundary = Boundary("B".to_string());
        let body = render(
            vec![
                StreamPart::data("plain").disposition("name=\"a\""),
                StreamPart::base64("aGk=").disposition("name=\"b\"").content_type("text/plain"),
                StreamPart::data(Bytes::new()),
            ],
            &boundary,
        )
        .await
        .unwrap();
        assert_eq!(
            body,
            "--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\
             Content-Type: application/octet-stream\r\n\r\nplain\r\n\
             --B\r\nContent-Disposition: form-data; name=\"b\"\r\nContent-Type: text/plain\r\n\
             Content-Transfer-Encoding: base64\r\n\r\naGk=\r\n\
             --B\r\nContent-Type: application/octet-stream\r\n\r\n\r\n\
             --B--\r\n"
        );
    }

    #[tokio::test]
    async fn part_without_content_type_is_octet_stream() {
        let body = render(
            vec![StreamPart::data("x").disposition("name=\"a\"")],
            &Boundary("B".to_string()),
        )
        .await
        .unwrap();
        assert_eq!(
            body,
            "--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\
             Content-Type: application/octet-stream\r\n\r\nx\r\n--B--\r\n"
        );
    }

    #[tokio::test]
    async fn stream_part_is_drained_in_full() {
        let payload: Vec<u8> = (0..(COPY_BUFFER * 2 + 17)).map(|i| (i % 256) as u8).collect();
        let boundary = Boundary("B".to_string());
        let headers: Headers = vec![(CONTENT_LENGTH, "0")].into_iter().collect();
        let target = select("http://localhost/").unwrap();
        let mut writer = RequestWriter::start(Vec::new(), &HttpMethod::Post, &target, &headers)
            .await
            .unwrap();
        write_parts(
            &mut writer,
            &boundary,
            vec![StreamPart::stream(io::Cursor::new(payload.clone()))],
        )
        .await
        .unwrap();
        let wire = writer.finish().await.unwrap();
        let start = wire.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let body = &wire[start..];
        let mut expected = b"--B\r\nContent-Type: application/octet-stream\r\n\r\n".to_vec();
        expected.extend_from_slice(&payload);
        expected.extend_from_slice(b"\r\n--B--\r\n");
        assert_eq!(body, &expected[..]);
    }

    #[tokio::test]
    async fn missing_file_is_a_source_error() {
        let boundary = Boundary::generate();
        let err = render(
            vec![
                StreamPart::data("ok"),
                StreamPart::file("/definitely/not/here.bin"),
            ],
            &boundary,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Source { index: 1, ref source } if source.kind() == io::ErrorKind::NotFound));
    }

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<io::Result<()>> {
            std::task::Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "source died")))
        }
    }

    #[tokio::test]
    async fn failing_stream_surfaces_promptly() {
        let err = render(vec![StreamPart::stream(FailingReader)], &Boundary::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Source { index: 0, .. }));
    }
}
