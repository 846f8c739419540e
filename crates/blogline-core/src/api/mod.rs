//! REST API client module for the blog backend.
//!
//! This module provides the `SessionClient`, which sends every request
//! through the stored bearer token and transparently refreshes it, plus
//! typed wrappers for the post, comment, social and taxonomy endpoints.
//!
//! Transport is abstracted behind the `Transport` trait; `HttpTransport`
//! is the `reqwest` implementation.

pub mod client;
pub mod error;
pub mod posts;
pub mod social;
pub mod taxonomy;
pub mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{RefreshFailurePolicy, SessionClient};
pub use error::{ApiError, FieldErrors};
pub use transport::{
    ApiRequest, ApiResponse, AuthMode, FormValue, HttpTransport, RequestBody, Transport,
    DEFAULT_TIMEOUT_SECS,
};
