//! Request executors.
//!
//! # Design
//! `Client` holds a connector and its configuration and carries no mutable
//! state between calls, so it can be cloned and shared freely. Every call
//! opens its own connection, writes one request, reads one complete
//! response, and drops the connection. Nothing is retried.

use bytes::Bytes;
use log::debug;

use crate::config::{ClientConfig, RequestOptions};
use crate::error::Result;
use crate::http::{implied_content_length, Headers, HttpMethod, HttpRequest, CONTENT_LENGTH, CONTENT_TYPE};
use crate::multipart::streaming::{write_parts, Boundary, StreamPart};
use crate::response::Response;
use crate::transport::wire::{read_response, RequestWriter};
use crate::transport::{self, Connector, TcpConnector};

/// Async HTTP(S) client.
#[derive(Debug, Clone, Default)]
pub struct Client<C = TcpConnector> {
    connector: C,
    config: ClientConfig,
}

impl Client {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            connector: TcpConnector,
            config,
        }
    }
}

impl<C: Connector> Client<C> {
    /// Use `connector` instead of plain TCP/TLS connections.
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Send `request` with its whole body and buffer the whole response.
    ///
    /// `Content-Length` is computed from the body when the request does not
    /// set it. The URL is only checked when connecting, so a malformed one
    /// fails as `Error::Transport` with kind `InvalidInput`.
    pub async fn execute(&self, request: HttpRequest) -> Result<Response> {
        let HttpRequest {
            method,
            url,
            mut headers,
            body,
        } = request.with_content_length();
        self.apply_defaults(&mut headers);
        method.validate()?;
        headers.validate()?;

        let target = transport::resolve(&url)?;
        debug!("{method} {url}");
        let stream = self.connector.connect(&target, self.config.tls.clone()).await?;
        let mut writer = RequestWriter::start(stream, &method, &target, &headers).await?;
        if let Some(body) = &body {
            writer.write(body).await?;
        }
        self.complete(writer, &method, &url).await
    }

    /// Like [`Client::execute`], but adds the computed `Content-Length` to
    /// the caller's `headers` as well.
    pub async fn request(
        &self,
        method: HttpMethod,
        url: &str,
        headers: &mut Headers,
        body: Option<Bytes>,
    ) -> Result<Response> {
        if let Some(len) = implied_content_length(headers, body.as_ref()) {
            headers.set(CONTENT_LENGTH, len.to_string());
        }
        let request = HttpRequest {
            method,
            url: url.to_string(),
            headers: headers.clone(),
            body,
        };
        self.execute(request).await
    }

    /// Send a multipart/form-data request whose parts are written onto the
    /// connection one at a time, in order.
    ///
    /// A fresh boundary is generated and announced in `Content-Type`,
    /// replacing any value in `headers`. `options` is applied last and wins
    /// over everything else. The URL is validated before any I/O; a bad one
    /// fails as `Error::InvalidUrl`. Without a caller-supplied
    /// `Content-Length` the body is sent chunked.
    pub async fn execute_multipart(
        &self,
        method: HttpMethod,
        url: &str,
        mut headers: Headers,
        parts: Vec<StreamPart>,
        options: RequestOptions,
    ) -> Result<Response> {
        let boundary = Boundary::generate();
        headers.set(CONTENT_TYPE, boundary.content_type());
        let RequestOptions {
            method: method_override,
            headers: extra_headers,
            tls,
        } = options;
        let method = method_override.unwrap_or(method);
        headers.merge(extra_headers);
        self.apply_defaults(&mut headers);
        method.validate()?;
        headers.validate()?;

        let target = transport::select(url)?;
        debug!("{method} {url} (multipart, {} parts, boundary {boundary})", parts.len());
        let tls = tls.or_else(|| self.config.tls.clone());
        let stream = self.connector.connect(&target, tls).await?;
        let mut writer = RequestWriter::start(stream, &method, &target, &headers).await?;
        write_parts(&mut writer, &boundary, parts).await?;
        self.complete(writer, &method, url).await
    }

    fn apply_defaults(&self, headers: &mut Headers) {
        if let Some(user_agent) = &self.config.user_agent {
            if !headers.contains("User-Agent") {
                headers.set("User-Agent", user_agent.as_str());
            }
        }
    }

    async fn complete(
        &self,
        writer: RequestWriter<C::Stream>,
        method: &HttpMethod,
        url: &str,
    ) -> Result<Response> {
        let mut stream = writer.finish().await?;
        let response = read_response(&mut stream, method).await?;
        debug!(
            "{method} {url} -> {} ({} bytes)",
            response.status(),
            response.body().len()
        );
        Ok(response)
    }
}

/// Send one request with the default client. The computed `Content-Length`
/// is written back into `headers`.
pub async fn request(
    method: HttpMethod,
    url: &str,
    headers: &mut Headers,
    body: Option<Bytes>,
) -> Result<Response> {
    Client::new().request(method, url, headers, body).await
}

/// Send a streaming multipart request with the default client.
pub async fn multipart_request(
    method: HttpMethod,
    url: &str,
    headers: Headers,
    parts: Vec<StreamPart>,
    options: RequestOptions,
) -> Result<Response> {
    Client::new()
        .execute_multipart(method, url, headers, parts, options)
        .await
}
