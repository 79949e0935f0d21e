//! Entry points of the builder chain: `ClientBuilder`, `Client`, `Target`.
//!
//! # Design
//! `Client` holds the root configuration scope and the transport; it makes
//! no network access itself. `Client::target` validates the endpoint and
//! opens a child scope for it, and `Target::request` opens another child
//! scope for one invocation. Scopes are seeded at creation time: later
//! changes to a parent are not seen by children that already exist.

use std::sync::Arc;

use url::Url;

use crate::config::{ConfigKey, ConfigValue, Configuration, TimeUnit, Timeout};
use crate::error::ClientError;
use crate::http::{Transport, UreqTransport};
use crate::invocation::InvocationBuilder;

/// Builds a [`Client`]. Timeouts are validated here, before any
/// configuration is written.
pub struct ClientBuilder {
    config: Configuration,
    transport: Arc<dyn Transport>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            config: Configuration::new(),
            transport: Arc::new(UreqTransport),
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time allowed to establish the connection.
    pub fn connect_timeout(mut self, magnitude: i64, unit: TimeUnit) -> Result<Self, ClientError> {
        let timeout = Timeout::new(magnitude, unit)?;
        self.config.set(ConfigKey::HttpConnectTimeout, timeout);
        Ok(self)
    }

    /// Time allowed to wait for data once connected.
    pub fn read_timeout(mut self, magnitude: i64, unit: TimeUnit) -> Result<Self, ClientError> {
        let timeout = Timeout::new(magnitude, unit)?;
        self.config.set(ConfigKey::HttpReadTimeout, timeout);
        Ok(self)
    }

    pub fn property(mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> Self {
        self.config.set(key, value);
        self
    }

    pub fn configuration(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// Replace the default `ureq` transport.
    pub fn transport(self, transport: impl Transport + 'static) -> Self {
        self.shared_transport(Arc::new(transport))
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    pub fn build(self) -> Client {
        Client {
            config: Arc::new(self.config),
            transport: self.transport,
        }
    }
}

/// Root of the builder chain.
#[derive(Clone)]
pub struct Client {
    config: Arc<Configuration>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config.effective())
            .finish_non_exhaustive()
    }
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// A client with an empty configuration and the `ureq` transport.
    pub fn new() -> Self {
        ClientBuilder::new().build()
    }

    /// Bind an endpoint. The URI must be absolute with an `http` or `https`
    /// scheme; nothing is sent yet.
    pub fn target(&self, uri: &str) -> Result<Target, ClientError> {
        let illegal = || ClientError::invalid(format!("Illegal URI target value: {uri}"));
        let url = Url::parse(uri).map_err(|_| illegal())?;
        if !matches!(url.scheme(), "http" | "https") || !url.has_host() {
            return Err(illegal());
        }

        Ok(Target {
            config: Arc::new(Configuration::child_of(&self.config)),
            uri: url,
            transport: Arc::clone(&self.transport),
        })
    }

    /// Set a client-level option. Targets created before the call keep the
    /// values they were created with.
    pub fn property(&mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> &mut Self {
        Arc::make_mut(&mut self.config).set(key, value);
        self
    }

    pub fn configuration(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.config.get(key)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// An endpoint plus its own configuration scope. Reusable for any number
/// of invocations.
#[derive(Clone)]
pub struct Target {
    config: Arc<Configuration>,
    uri: Url,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Target")
            .field("uri", &self.uri.as_str())
            .field("config", &self.config.effective())
            .finish_non_exhaustive()
    }
}

impl Target {
    pub fn uri(&self) -> &Url {
        &self.uri
    }

    /// Set a target-level option, consuming and returning the target.
    pub fn property(mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a target-level option in place. Invocation builders created
    /// before the call keep the values they were created with.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> &mut Self {
        Arc::make_mut(&mut self.config).set(key, value);
        self
    }

    pub fn configuration(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.config.get(key)
    }

    /// Start an invocation of `document`. The text is sent verbatim; it is
    /// not checked against GraphQL syntax.
    pub fn request(&self, document: impl Into<String>) -> InvocationBuilder {
        InvocationBuilder::new(
            Configuration::child_of(&self.config),
            self.uri.clone(),
            document.into(),
            Arc::clone(&self.transport),
        )
    }
}
