//! HTTP/1.1 framing: request head and body out, complete response in.
//!
//! Requests with a `Content-Length` send their body as is; without one the
//! body is chunk-encoded so parts of unknown size can be streamed. Responses
//! are framed by chunked encoding, `Content-Length`, or connection close, in
//! that order of preference.

use std::io;

use bytes::{Buf, BytesMut};
use log::trace;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::{Error, Result};
use crate::http::{Headers, HttpMethod, CONTENT_LENGTH, TRANSFER_ENCODING};
use crate::response::Response;
use crate::transport::Target;

const READ_CHUNK: usize = 8 * 1024;
const MAX_HEADERS: usize = 100;
const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_LINE_BYTES: usize = 8 * 1024;

/// Outbound half of an exchange: the head is already written, the body is
/// written piecewise, `finish` ends the request.
pub(crate) struct RequestWriter<S> {
    stream: BufWriter<S>,
    chunked: bool,
}

impl<S: AsyncWrite + Unpin> RequestWriter<S> {
    pub(crate) async fn start(
        stream: S,
        method: &HttpMethod,
        target: &Target,
        headers: &Headers,
    ) -> io::Result<Self> {
        let chunked = !headers.contains(CONTENT_LENGTH);
        let mut head = format!("{method} {} HTTP/1.1\r\n", target.path_and_query);
        if !headers.contains("Host") {
            head.push_str(&format!("Host: {}\r\n", target.authority()));
        }
        for (name, value) in headers.iter() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        if chunked && !headers.contains(TRANSFER_ENCODING) {
            head.push_str("Transfer-Encoding: chunked\r\n");
        }
        if !headers.contains("Connection") {
            head.push_str("Connection: close\r\n");
        }
        head.push_str("\r\n");

        let mut stream = BufWriter::new(stream);
        stream.write_all(head.as_bytes()).await?;
        Ok(Self { stream, chunked })
    }

    /// Append body bytes, chunk-framed when the length is unknown.
    pub(crate) async fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if data.is_empty() {
            // A zero-length chunk would end the body early.
            return Ok(());
        }
        if self.chunked {
            self.stream
                .write_all(format!("{:x}\r\n", data.len()).as_bytes())
                .await?;
            self.stream.write_all(data).await?;
            self.stream.write_all(b"\r\n").await
        } else {
            self.stream.write_all(data).await
        }
    }

    /// Push everything buffered so far onto the connection.
    pub(crate) async fn flush(&mut self) -> io::Result<()> {
        self.stream.flush().await
    }

    /// End the request and hand back the connection for reading.
    pub(crate) async fn finish(mut self) -> io::Result<S> {
        if self.chunked {
            self.stream.write_all(b"0\r\n\r\n").await?;
        }
        self.stream.flush().await?;
        Ok(self.stream.into_inner())
    }
}

struct Head {
    status: u16,
    reason: String,
    headers: Headers,
}

enum Framing {
    Empty,
    Length(usize),
    Chunked,
    UntilClose,
}

/// Read one complete response. Interim 1xx responses are skipped.
pub(crate) async fn read_response<S>(stream: &mut S, method: &HttpMethod) -> Result<Response>
where
    S: AsyncRead + Unpin,
{
    let mut inbound = Inbound {
        stream,
        buf: BytesMut::with_capacity(READ_CHUNK),
    };
    let head = loop {
        let head = inbound.head().await?;
        if (100..200).contains(&head.status) && head.status != 101 {
            trace!("skipping interim {} response", head.status);
            continue;
        }
        break head;
    };

    let mut body = BytesMut::new();
    match framing(&head, method)? {
        Framing::Empty => {}
        Framing::Length(len) => inbound.take(len, &mut body).await?,
        Framing::Chunked => inbound.chunked(&mut body).await?,
        Framing::UntilClose => inbound.rest(&mut body).await?,
    }
    trace!("response {} complete, {} body bytes", head.status, body.len());
    Ok(Response::new(head.status, head.reason, head.headers, body.freeze()))
}

fn framing(head: &Head, method: &HttpMethod) -> Result<Framing> {
    if *method == HttpMethod::Head
        || head.status == 204
        || head.status == 304
        || (100..200).contains(&head.status)
    {
        return Ok(Framing::Empty);
    }
    let chunked = head
        .headers
        .get(TRANSFER_ENCODING)
        .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"));
    if chunked {
        return Ok(Framing::Chunked);
    }
    match head.headers.get(CONTENT_LENGTH) {
        Some(len) => len
            .trim()
            .parse()
            .map(Framing::Length)
            .map_err(|_| Error::MalformedResponse(format!("bad Content-Length {len:?}"))),
        None => Ok(Framing::UntilClose),
    }
}

fn closed_early(what: &str) -> Error {
    Error::Transport(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("connection closed {what}"),
    ))
}

struct Inbound<'a, S> {
    stream: &'a mut S,
    buf: BytesMut,
}

impl<S: AsyncRead + Unpin> Inbound<'_, S> {
    async fn fill(&mut self) -> io::Result<usize> {
        self.buf.reserve(READ_CHUNK);
        self.stream.read_buf(&mut self.buf).await
    }

    async fn head(&mut self) -> Result<Head> {
        loop {
            if !self.buf.is_empty() {
                let mut slots = [httparse::EMPTY_HEADER; MAX_HEADERS];
                let mut parsed = httparse::Response::new(&mut slots);
                match parsed.parse(&self.buf) {
                    Ok(httparse::Status::Complete(len)) => {
                        let head = Head {
                            status: parsed.code.unwrap_or_default(),
                            reason: parsed.reason.unwrap_or_default().to_string(),
                            headers: parsed
                                .headers
                                .iter()
                                .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
                                .collect(),
                        };
                        self.buf.advance(len);
                        return Ok(head);
                    }
                    Ok(httparse::Status::Partial) if self.buf.len() > MAX_HEAD_BYTES => {
                        return Err(Error::MalformedResponse("response head too large".to_string()));
                    }
                    Ok(httparse::Status::Partial) => {}
                    Err(e) => return Err(Error::MalformedResponse(e.to_string())),
                }
            }
            if self.fill().await? == 0 {
                return Err(closed_early("before the response head was complete"));
            }
        }
    }

    async fn line(&mut self) -> Result<BytesMut> {
        loop {
            if let Some(end) = self.buf.windows(2).position(|w| w == b"\r\n") {
                let line = self.buf.split_to(end);
                self.buf.advance(2);
                return Ok(line);
            }
            if self.buf.len() > MAX_LINE_BYTES {
                return Err(Error::MalformedResponse("chunk framing line too long".to_string()));
            }
            if self.fill().await? == 0 {
                return Err(closed_early("inside chunk framing"));
            }
        }
    }

    async fn take(&mut self, len: usize, body: &mut BytesMut) -> Result<()> {
        let mut remaining = len;
        loop {
            let n = remaining.min(self.buf.len());
            body.extend_from_slice(&self.buf.split_to(n));
            remaining -= n;
            if remaining == 0 {
                return Ok(());
            }
            if self.fill().await? == 0 {
                return Err(closed_early("before the end of the body"));
            }
        }
    }

    async fn chunked(&mut self, body: &mut BytesMut) -> Result<()> {
        loop {
            let line = self.line().await?;
            let size = std::str::from_utf8(&line)
                .ok()
                .and_then(|s| s.split(';').next())
                .and_then(|hex| usize::from_str_radix(hex.trim(), 16).ok())
                .ok_or_else(|| Error::MalformedResponse("bad chunk size".to_string()))?;
            if size == 0 {
                // Trailers are read and dropped.
                while !self.line().await?.is_empty() {}
                return Ok(());
            }
            self.take(size, body).await?;
            if !self.line().await?.is_empty() {
                return Err(Error::MalformedResponse("chunk not followed by CRLF".to_string()));
            }
        }
    }

    async fn rest(&mut self, body: &mut BytesMut) -> Result<()> {
        loop {
            body.extend_from_slice(&self.buf.split());
            match self.fill().await {
                Ok(0) => return Ok(()),
                Ok(_) => {}
                // TLS peers that skip close_notify; the close still ends the body.
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    trace!("connection cut without close_notify, treating as end of body");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
