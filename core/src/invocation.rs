//! Request building and the single HTTP exchange behind `invoke()`.
//!
//! # Design
//! `InvocationBuilder` accumulates variables, headers and invocation-level
//! options. `build()` freezes them into an `Invocation`, which is immutable
//! and cheap to clone: its configuration scope and transport are shared
//! through `Arc`. Each `invoke()` derives transport settings from the
//! effective configuration, serializes the envelope, performs exactly one
//! exchange and decodes the answer. Nothing is retried.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use ureq::http::{HeaderName, HeaderValue};
use url::Url;

use crate::config::{ConfigKey, ConfigValue, Configuration, DEFAULT_HTTP_PROXY_PORT};
use crate::error::ClientError;
use crate::http::{HttpRequest, ProxySettings, Transport, TransportSettings};
use crate::response::Response;

/// JSON body of a GraphQL POST.
#[derive(Serialize)]
struct Envelope<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Map<String, Value>>,
}

/// Accumulates one request against a [`Target`](crate::Target).
pub struct InvocationBuilder {
    config: Configuration,
    uri: Url,
    document: String,
    variables: Map<String, Value>,
    headers: BTreeMap<String, String>,
    transport: Arc<dyn Transport>,
}

impl InvocationBuilder {
    pub(crate) fn new(
        config: Configuration,
        uri: Url,
        document: String,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            config,
            uri,
            document,
            variables: Map::new(),
            headers: BTreeMap::new(),
            transport,
        }
    }

    /// Set a variable. A repeated name overwrites the earlier value.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Set a variable from any serializable value.
    pub fn try_variable<T: Serialize + ?Sized>(
        mut self,
        name: impl Into<String>,
        value: &T,
    ) -> Result<Self, ClientError> {
        let value = serde_json::to_value(value)
            .map_err(|e| ClientError::SerializationError(e.to_string()))?;
        self.variables.insert(name.into(), value);
        Ok(self)
    }

    /// Set a request header. A repeated name overwrites the earlier value.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Override a transport option for this invocation only.
    pub fn property(mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> Self {
        self.config.set(key, value);
        self
    }

    pub fn configuration(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    pub fn build(self) -> Invocation {
        Invocation {
            config: Arc::new(self.config),
            uri: self.uri,
            document: self.document,
            variables: self.variables,
            headers: self.headers,
            transport: self.transport,
        }
    }

    /// Shorthand for `build().invoke()`.
    pub fn invoke(self) -> Result<Response, ClientError> {
        self.build().invoke()
    }

    /// Shorthand for `build().invoke_async()`.
    #[cfg(feature = "async")]
    pub async fn invoke_async(self) -> Result<Response, ClientError> {
        self.build().invoke_async().await
    }
}

/// A fully specified GraphQL request, ready to be sent.
#[derive(Clone)]
pub struct Invocation {
    config: Arc<Configuration>,
    uri: Url,
    document: String,
    variables: Map<String, Value>,
    headers: BTreeMap<String, String>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invocation")
            .field("uri", &self.uri.as_str())
            .field("document", &self.document)
            .field("variables", &self.variables)
            .field("headers", &self.headers)
            .field("config", &self.config.effective())
            .finish()
    }
}

impl Invocation {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    pub fn variables(&self) -> &Map<String, Value> {
        &self.variables
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn configuration(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// The JSON body sent for this invocation. `variables` is omitted when
    /// none were set.
    pub fn envelope(&self) -> Result<String, ClientError> {
        let envelope = Envelope {
            query: &self.document,
            variables: (!self.variables.is_empty()).then_some(&self.variables),
        };
        serde_json::to_string(&envelope).map_err(|e| ClientError::SerializationError(e.to_string()))
    }

    /// Transport options derived from the effective configuration.
    pub fn transport_settings(&self) -> TransportSettings {
        derive_settings(&self.config)
    }

    /// The request handed to the transport. A header name or value that
    /// HTTP cannot carry is an argument error.
    pub fn http_request(&self) -> Result<HttpRequest, ClientError> {
        for (name, value) in &self.headers {
            check_header(name, value)?;
        }
        let has_content_type = self
            .headers
            .keys()
            .any(|name| name.eq_ignore_ascii_case("content-type"));
        let mut headers = Vec::with_capacity(self.headers.len() + 1);
        if !has_content_type {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        headers.extend(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));

        Ok(HttpRequest {
            uri: self.uri.to_string(),
            headers,
            body: self.envelope()?,
            settings: self.transport_settings(),
        })
    }

    /// Perform the exchange on the calling thread.
    ///
    /// Returns a `Response` for any 200 answer with a JSON object body,
    /// including one that only carries GraphQL errors. A non-200 status is
    /// `ClientError::HttpError`; no `Response` is produced for it.
    pub fn invoke(&self) -> Result<Response, ClientError> {
        let request = self.http_request()?;
        debug!(request = %request.body, "GraphQL request");

        let response = self.transport.send(request)?;
        info!(uri = %self.uri, status = response.status, "GraphQL exchange completed");

        Response::from_http(response)
    }

    /// Run [`invoke`](Self::invoke) on tokio's blocking pool.
    ///
    /// Dropping the future does not stop the exchange already in flight.
    #[cfg(feature = "async")]
    pub async fn invoke_async(self) -> Result<Response, ClientError> {
        tokio::task::spawn_blocking(move || self.invoke())
            .await
            .map_err(ClientError::transport)?
    }
}

fn check_header(name: &str, value: &str) -> Result<(), ClientError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| ClientError::invalid(format!("invalid header name {name:?}: {e}")))?;
    HeaderValue::from_str(value)
        .map_err(|e| ClientError::invalid(format!("invalid value for header {name}: {e}")))?;
    Ok(())
}

fn derive_settings(config: &Configuration) -> TransportSettings {
    TransportSettings {
        connect_timeout: duration(config, ConfigKey::HttpConnectTimeout),
        read_timeout: duration(config, ConfigKey::HttpReadTimeout),
        connection_manager_timeout: duration(config, ConfigKey::HttpConnectionManagerTimeout),
        proxy: proxy(config),
    }
}

fn duration(config: &Configuration, key: ConfigKey) -> Option<std::time::Duration> {
    let value = config.get(key)?;
    match value.as_duration() {
        Some(duration) => {
            debug!("{key}={}", duration.as_millis());
            Some(duration)
        }
        None => {
            warn!(value = ?value, "ignoring unusable {key}");
            None
        }
    }
}

fn proxy(config: &Configuration) -> Option<ProxySettings> {
    let host = match config.get(ConfigKey::HttpProxyName)? {
        ConfigValue::Text(host) => host.clone(),
        other => {
            warn!(value = ?other, "ignoring unusable {}", ConfigKey::HttpProxyName);
            return None;
        }
    };
    debug!("{}={host}", ConfigKey::HttpProxyName);

    let port = config
        .get(ConfigKey::HttpProxyPort)
        .and_then(ConfigValue::as_integer)
        .filter(|port| *port > 0)
        .and_then(|port| u16::try_from(port).ok())
        .unwrap_or(DEFAULT_HTTP_PROXY_PORT);
    debug!("{}={port}", ConfigKey::HttpProxyPort);

    Some(ProxySettings { host, port })
}
