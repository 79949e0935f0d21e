//! GraphQL response model and typed extraction.
//!
//! # Design
//! A `Response` only exists for a 200 answer whose body is a JSON object.
//! `data` and `errors` are decoded independently: a response may carry
//! both (partial success), either, or neither. Server-reported errors are
//! data here, never a `ClientError`.
//!
//! Typed extraction goes through serde. The binding policy is:
//!
//! | situation                              | outcome                        |
//! |----------------------------------------|--------------------------------|
//! | payload field missing from the DTO     | ignored                        |
//! | DTO field missing from the payload     | default, with `#[serde(default)]` or `Option` |
//! | type mismatch                          | `DeserializationError`         |

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::http::HttpResponse;

const MAX_LOG_LENGTH: usize = 128;

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<Location>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Map<String, Value>>,
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(path) = &self.path {
            write!(f, " (at ")?;
            for (i, segment) in path.iter().enumerate() {
                match segment {
                    PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                    PathSegment::Field(name) => write!(f, ".{name}")?,
                    PathSegment::Index(idx) => write!(f, "[{idx}]")?,
                }
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Position in the request document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

/// Step in an error path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

/// Decoded answer to one invocation.
#[derive(Debug, Clone, Default)]
pub struct Response {
    headers: BTreeMap<String, String>,
    data: Option<Map<String, Value>>,
    errors: Vec<GraphQLError>,
}

impl Response {
    /// Decode a raw exchange.
    ///
    /// Any status other than 200 is a transport failure carrying the body,
    /// whatever its encoding. Otherwise headers are copied first, then the
    /// body is read as UTF-8 JSON object text and its `errors` and `data`
    /// members are decoded.
    pub fn from_http(response: HttpResponse) -> Result<Self, ClientError> {
        check_status(&response, 200)?;

        let mut decoded = Response::default();
        for (name, value) in response.headers {
            decoded.add_header(name, value);
        }

        let body = String::from_utf8(response.body).map_err(|e| {
            ClientError::DeserializationError(format!("response body is not UTF-8: {e}"))
        })?;
        debug!(body = %truncate(&body), "GraphQL response");
        let mut root: Map<String, Value> = serde_json::from_str(&body)?;

        if let Some(errors) = root.remove("errors") {
            warn!("GraphQL errors element detected");
            if !errors.is_null() {
                decoded.errors = Vec::<GraphQLError>::deserialize(errors)?;
            }
        }

        match root.remove("data") {
            Some(Value::Object(data)) => decoded.data = Some(data),
            Some(Value::Null) => warn!("data element is null"),
            Some(other) => {
                return Err(ClientError::DeserializationError(format!(
                    "data element is not an object: {}",
                    truncate(&other.to_string())
                )))
            }
            None => {}
        }

        Ok(decoded)
    }

    /// True iff `data` was present and not null.
    pub fn has_data(&self) -> bool {
        self.data.is_some()
    }

    /// True iff the server reported at least one error.
    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// Errors in the order the server sent them.
    pub fn errors(&self) -> &[GraphQLError] {
        &self.errors
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Bind the top-level data field `field` into a `T`.
    pub fn as_data_object<T: DeserializeOwned>(&self, field: &str) -> Result<T, ClientError> {
        let value = self.data_field(field)?;
        T::deserialize(value).map_err(|e| {
            ClientError::DeserializationError(format!("field `{field}`: {e}"))
        })
    }

    /// Bind every element of the array under `field`. The first element
    /// that fails to bind fails the whole extraction.
    pub fn as_data_list<T: DeserializeOwned>(&self, field: &str) -> Result<Vec<T>, ClientError> {
        let items = self.data_field(field)?.as_array().ok_or_else(|| {
            ClientError::DeserializationError(format!("field `{field}` is not an array"))
        })?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                T::deserialize(item).map_err(|e| {
                    ClientError::DeserializationError(format!("field `{field}`[{i}]: {e}"))
                })
            })
            .collect()
    }

    fn data_field(&self, field: &str) -> Result<&Value, ClientError> {
        let data = self.data.as_ref().ok_or(ClientError::NoData)?;
        data.get(field)
            .ok_or_else(|| ClientError::FieldNotFound(field.to_string()))
    }

    fn add_header(&mut self, name: String, value: String) {
        self.headers
            .entry(name.to_ascii_lowercase())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
}

/// Reject any status other than `expected`.
fn check_status(response: &HttpResponse, expected: u16) -> Result<(), ClientError> {
    if response.status == expected {
        return Ok(());
    }
    Err(ClientError::HttpError {
        status: response.status,
        body: String::from_utf8_lossy(&response.body).into_owned(),
    })
}

fn truncate(text: &str) -> String {
    match text.char_indices().nth(MAX_LOG_LENGTH) {
        Some((end, _)) => format!("{} etc...", &text[..end]),
        None => text.to_string(),
    }
}
