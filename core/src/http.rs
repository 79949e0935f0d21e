//! HTTP exchange types and the transport seam.
//!
//! # Design
//! Requests and responses are plain data. An `Invocation` builds an
//! `HttpRequest`, hands it to a [`Transport`] and decodes the `HttpResponse`
//! it gets back, so the envelope and decoding logic never depend on a
//! particular HTTP stack. [`UreqTransport`] is the default implementation;
//! tests substitute their own.

use std::time::Duration;

use tracing::debug;

use crate::error::ClientError;

/// Proxy endpoint derived from the effective configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
}

/// Per-exchange transport options. `None` means "transport default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportSettings {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub connection_manager_timeout: Option<Duration>,
    pub proxy: Option<ProxySettings>,
}

/// A GraphQL POST described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub settings: TransportSettings,
}

/// The raw answer to an `HttpRequest`. The body is kept as bytes: text
/// decoding happens after the status check.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Performs exactly one HTTP exchange.
///
/// Implementations report any status as data: only failures that prevent a
/// status from being received (connect, timeout, proxy, body read) are
/// errors.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError>;
}

/// Blocking transport backed by `ureq`.
///
/// A fresh agent is configured for every call from the request's
/// `TransportSettings`; it and its connection are dropped when `send`
/// returns, whichever way it returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    fn agent(settings: &TransportSettings) -> Result<ureq::Agent, ClientError> {
        let proxy = match &settings.proxy {
            Some(ProxySettings { host, port }) => {
                let proxy = ureq::Proxy::new(&format!("http://{host}:{port}"))
                    .map_err(ClientError::transport)?;
                Some(proxy)
            }
            None => None,
        };

        let mut config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .proxy(proxy);
        if let Some(timeout) = settings.connect_timeout {
            config = config.timeout_connect(Some(timeout));
        }
        if let Some(timeout) = settings.read_timeout {
            config = config
                .timeout_recv_response(Some(timeout))
                .timeout_recv_body(Some(timeout));
        }
        // ureq does not queue for pooled connections; the closest bounded
        // phase before a connection is handed out is name resolution.
        if let Some(timeout) = settings.connection_manager_timeout {
            config = config.timeout_resolve(Some(timeout));
        }
        Ok(config.build().new_agent())
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse, ClientError> {
        let agent = Self::agent(&request.settings)?;

        let mut builder = agent.post(&request.uri);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder
            .send(request.body.as_bytes())
            .map_err(ClientError::transport)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
                (name.as_str().to_string(), value)
            })
            .collect();
        // The full body is read whatever its size.
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(ClientError::transport)?;
        debug!(status, bytes = body.len(), "received HTTP response");

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_accepts_full_settings() {
        let settings = TransportSettings {
            connect_timeout: Some(Duration::from_millis(500)),
            read_timeout: Some(Duration::from_secs(2)),
            connection_manager_timeout: Some(Duration::from_millis(1500)),
            proxy: Some(ProxySettings {
                host: "localhost".to_string(),
                port: 8080,
            }),
        };
        assert!(UreqTransport::agent(&settings).is_ok());
    }

    #[test]
    fn agent_applies_each_timeout() {
        let settings = TransportSettings {
            connect_timeout: Some(Duration::from_millis(500)),
            read_timeout: Some(Duration::from_secs(2)),
            connection_manager_timeout: Some(Duration::from_millis(1500)),
            proxy: None,
        };
        let agent = UreqTransport::agent(&settings).unwrap();
        let timeouts = agent.config().timeouts();
        assert_eq!(timeouts.connect, Some(Duration::from_millis(500)));
        assert_eq!(timeouts.recv_response, Some(Duration::from_secs(2)));
        assert_eq!(timeouts.recv_body, Some(Duration::from_secs(2)));
        assert_eq!(timeouts.resolve, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn agent_accepts_defaults() {
        assert!(UreqTransport::agent(&TransportSettings::default()).is_ok());
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        // Bind then drop a listener to get a port nobody is listening on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let request = HttpRequest {
            uri: format!("http://127.0.0.1:{port}/graphql"),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: r#"{"query":"{ people { id } }"}"#.to_string(),
            settings: TransportSettings {
                connect_timeout: Some(Duration::from_millis(500)),
                ..TransportSettings::default()
            },
        };
        let err = UreqTransport.send(request).unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert_eq!(err.status(), None);
    }
}
