//! Transport options and their scope chain.
//!
//! # Design
//! A `Configuration` holds its own values plus an optional, shared parent
//! snapshot. Lookups fall back through the parents; writes only ever touch
//! the local map. Client, Target and Invocation each own one scope, and a
//! child is created from an `Arc` of its parent. The owning scope mutates
//! through `Arc::make_mut`, so a parent changed after a child exists is
//! cloned rather than written through: the child keeps the values it was
//! seeded with.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ClientError;

/// Port used when a proxy host is configured without a usable port.
pub const DEFAULT_HTTP_PROXY_PORT: u16 = 3128;

/// Symbolic name of a transport option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    /// Time to establish the connection with the remote host.
    HttpConnectTimeout,
    /// Time to wait for data once connected.
    HttpReadTimeout,
    /// Time to wait for a connection from the transport's pool.
    ///
    /// `UreqTransport` has no pool queue to wait on; it applies this value
    /// to host name resolution, the step before a connection is opened.
    HttpConnectionManagerTimeout,
    HttpProxyName,
    HttpProxyPort,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 5] = [
        ConfigKey::HttpConnectTimeout,
        ConfigKey::HttpReadTimeout,
        ConfigKey::HttpConnectionManagerTimeout,
        ConfigKey::HttpProxyName,
        ConfigKey::HttpProxyPort,
    ];

    /// Dotted property name of the key.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKey::HttpConnectTimeout => "http.connect.timeout",
            ConfigKey::HttpReadTimeout => "http.read.timeout",
            ConfigKey::HttpConnectionManagerTimeout => "http.connection.manager.timeout",
            ConfigKey::HttpProxyName => "http.proxy.hostname",
            ConfigKey::HttpProxyPort => "http.proxy.port",
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ClientError::invalid(format!("unknown configuration key: {s}")))
    }
}

/// Unit of a timeout magnitude.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Milliseconds,
    Seconds,
    Minutes,
}

impl TimeUnit {
    fn millis(&self) -> u64 {
        match self {
            TimeUnit::Milliseconds => 1,
            TimeUnit::Seconds => 1_000,
            TimeUnit::Minutes => 60_000,
        }
    }
}

/// A positive timeout, normalized to milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timeout {
    millis: u64,
}

impl Timeout {
    /// Fails with `InvalidArgument` when `magnitude` is zero or negative, or
    /// when the normalized value does not fit in milliseconds.
    pub fn new(magnitude: i64, unit: TimeUnit) -> Result<Self, ClientError> {
        if magnitude <= 0 {
            return Err(ClientError::invalid(format!(
                "Timeout value should be positive {magnitude}"
            )));
        }
        let millis = (magnitude as u64)
            .checked_mul(unit.millis())
            .ok_or_else(|| ClientError::invalid(format!("Timeout value overflows {magnitude}")))?;
        Ok(Self { millis })
    }

    pub fn from_millis(millis: i64) -> Result<Self, ClientError> {
        Self::new(millis, TimeUnit::Milliseconds)
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_millis(self.millis)
    }
}

/// Value stored under a [`ConfigKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Timeout(Timeout),
    Text(String),
    Integer(i64),
}

impl ConfigValue {
    /// Timeouts as-is; positive integers are read as milliseconds.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            ConfigValue::Timeout(timeout) => Some(timeout.as_duration()),
            ConfigValue::Integer(ms) if *ms > 0 => Some(Duration::from_millis(*ms as u64)),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ConfigValue::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl From<Timeout> for ConfigValue {
    fn from(value: Timeout) -> Self {
        ConfigValue::Timeout(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        ConfigValue::Integer(value)
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        ConfigValue::Integer(value.into())
    }
}

impl From<u16> for ConfigValue {
    fn from(value: u16) -> Self {
        ConfigValue::Integer(value.into())
    }
}

/// One scope of transport options.
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    parent: Option<Arc<Configuration>>,
    values: BTreeMap<ConfigKey, ConfigValue>,
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty scope that falls back to `parent` for unset keys.
    pub fn child_of(parent: &Arc<Configuration>) -> Self {
        Self {
            parent: Some(Arc::clone(parent)),
            values: BTreeMap::new(),
        }
    }

    /// Writes `value` in this scope only and returns the value it shadows
    /// locally, if any.
    pub fn set(&mut self, key: ConfigKey, value: impl Into<ConfigValue>) -> Option<ConfigValue> {
        self.values.insert(key, value.into())
    }

    /// Removes a local value, uncovering the parent's value again.
    pub fn unset(&mut self, key: ConfigKey) -> Option<ConfigValue> {
        self.values.remove(&key)
    }

    /// Effective value: this scope first, then the parent chain.
    pub fn get(&self, key: ConfigKey) -> Option<&ConfigValue> {
        match self.values.get(&key) {
            Some(value) => Some(value),
            None => self.parent.as_deref().and_then(|parent| parent.get(key)),
        }
    }

    /// Value set in this scope, ignoring parents.
    pub fn get_local(&self, key: ConfigKey) -> Option<&ConfigValue> {
        self.values.get(&key)
    }

    /// Every effective key/value pair, ordered by key.
    pub fn effective(&self) -> BTreeMap<ConfigKey, &ConfigValue> {
        ConfigKey::ALL
            .into_iter()
            .filter_map(|key| self.get(key).map(|value| (key, value)))
            .collect()
    }
}
