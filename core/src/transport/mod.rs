//! Transport selection and connection setup.
//!
//! # Design
//! The executors talk HTTP/1.1 over whatever byte stream a [`Connector`]
//! hands them. [`TcpConnector`] is the real one (plain TCP for `http://`,
//! rustls for `https://`); tests plug in in-memory connectors to observe the
//! exact bytes on the wire.

mod stream;
mod tls;
pub(crate) mod wire;

use std::future::Future;
use std::io;
use std::sync::Arc;

use log::debug;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::rustls;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::error::Error;

pub use stream::HttpStream;
pub use tls::default_tls_config;

/// Which transport a URL asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Plain,
    Tls,
}

impl Scheme {
    /// Pick the transport from the scheme prefix alone. Anything that is not
    /// a TLS scheme goes out in plaintext.
    pub fn of(url: &str) -> Scheme {
        let scheme = url.split_once("://").map_or("", |(scheme, _)| scheme);
        if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("wss") {
            Scheme::Tls
        } else {
            Scheme::Plain
        }
    }

    pub fn default_port(self) -> u16 {
        match self {
            Scheme::Plain => 80,
            Scheme::Tls => 443,
        }
    }
}

/// Where a request goes: parsed from an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    /// Request-target for the request line, never empty.
    pub path_and_query: String,
}

impl Target {
    /// Value for the `Host` header; the port is left out when it is the
    /// scheme's default.
    pub fn authority(&self) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        if self.port == self.scheme.default_port() {
            host
        } else {
            format!("{host}:{}", self.port)
        }
    }
}

/// Parse `url` into a [`Target`], reporting failures as `InvalidUrl`.
pub fn select(url: &str) -> Result<Target, Error> {
    parse_target(url).map_err(|reason| Error::InvalidUrl {
        url: url.to_string(),
        reason,
    })
}

/// Parse `url` the way the connection layer does: a bad URL is an I/O
/// failure of kind `InvalidInput`.
pub(crate) fn resolve(url: &str) -> io::Result<Target> {
    parse_target(url).map_err(|reason| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("invalid URL {url:?}: {reason}"))
    })
}

fn parse_target(url: &str) -> Result<Target, String> {
    let parsed = Url::parse(url).map_err(|e| e.to_string())?;
    let host = match parsed.host_str() {
        Some(host) if !host.is_empty() => host.trim_start_matches('[').trim_end_matches(']'),
        _ => return Err("URL has no host".to_string()),
    };
    let scheme = Scheme::of(parsed.as_str());
    let port = parsed.port().unwrap_or_else(|| scheme.default_port());
    let mut path_and_query = parsed.path().to_string();
    if path_and_query.is_empty() {
        path_and_query.push('/');
    }
    if let Some(query) = parsed.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }
    Ok(Target {
        scheme,
        host: host.to_string(),
        port,
        path_and_query,
    })
}

/// Opens the byte stream a request is written to and its response read from.
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Connect to `target`. `tls` overrides the default rustls configuration
    /// for TLS targets.
    fn connect(
        &self,
        target: &Target,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> impl Future<Output = io::Result<Self::Stream>> + Send;
}

/// TCP, wrapped in TLS when the target's scheme asks for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Stream = HttpStream;

    async fn connect(
        &self,
        target: &Target,
        tls: Option<Arc<rustls::ClientConfig>>,
    ) -> io::Result<HttpStream> {
        let tcp = TcpStream::connect((target.host.as_str(), target.port)).await?;
        tcp.set_nodelay(true)?;
        match target.scheme {
            Scheme::Plain => {
                debug!("connected to {}:{}", target.host, target.port);
                Ok(HttpStream::Plain(tcp))
            }
            Scheme::Tls => {
                let config = match tls {
                    Some(config) => config,
                    None => default_tls_config()?,
                };
                let server_name = ServerName::try_from(target.host.clone())
                    .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "invalid host name"))?;
                let tls = TlsConnector::from(config).connect(server_name, tcp).await?;
                debug!("TLS established with {}:{}", target.host, target.port);
                Ok(HttpStream::Tls(Box::new(tls)))
            }
        }
    }
}
