//! Blocking GraphQL-over-HTTP client.
//!
//! # Overview
//! A fluent chain builds one request and performs one synchronous exchange:
//!
//! ```no_run
//! use gql_core::{Client, TimeUnit};
//! # fn main() -> Result<(), gql_core::ClientError> {
//! let client = Client::builder()
//!     .connect_timeout(500, TimeUnit::Milliseconds)?
//!     .read_timeout(2, TimeUnit::Seconds)?
//!     .build();
//!
//! let response = client
//!     .target("http://localhost:3000/graphql")?
//!     .request("query($personId: Int!) { person(id: $personId) { id surname } }")
//!     .variable("personId", 50)
//!     .header("Authorization", "Bearer: JWT")
//!     .invoke()?;
//!
//! if response.has_error() {
//!     for error in response.errors() {
//!         eprintln!("{error}");
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design
//! - Client, Target and Invocation each own a configuration scope seeded
//!   from their parent; narrower scopes shadow, never write back.
//! - The HTTP exchange sits behind the `Transport` trait; `UreqTransport`
//!   is the default and tests plug in their own.
//! - Local failures are `ClientError`s. Errors reported by the server are
//!   data on `Response`, so partial success stays visible to the caller.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod invocation;
pub mod response;

pub use client::{Client, ClientBuilder, Target};
pub use config::{ConfigKey, ConfigValue, Configuration, TimeUnit, Timeout, DEFAULT_HTTP_PROXY_PORT};
pub use error::{ClientError, ErrorKind};
pub use http::{
    HttpRequest, HttpResponse, ProxySettings, Transport, TransportSettings, UreqTransport,
};
pub use invocation::{Invocation, InvocationBuilder};
pub use response::{GraphQLError, Location, PathSegment, Response};
