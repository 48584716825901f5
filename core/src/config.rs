//! Client-wide and per-request settings.

use std::sync::Arc;

use tokio_rustls::rustls;

use crate::http::{Headers, HttpMethod};

/// Settings shared by every request a [`Client`](crate::Client) sends.
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Sent as `User-Agent` unless the request sets its own.
    pub user_agent: Option<String>,
    /// TLS settings for `https` URLs; the built-in Mozilla roots otherwise.
    pub tls: Option<Arc<rustls::ClientConfig>>,
}

impl ClientConfig {
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn tls(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// Extra options for one streaming multipart request. Everything set here
/// wins over what the executor derived from its arguments.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: Option<HttpMethod>,
    /// Merged over the request headers, including the generated
    /// `Content-Type`.
    pub headers: Headers,
    pub tls: Option<Arc<rustls::ClientConfig>>,
}

impl RequestOptions {
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.set(name, value);
        self
    }

    pub fn tls(mut self, tls: Arc<rustls::ClientConfig>) -> Self {
        self.tls = Some(tls);
        self
    }
}
