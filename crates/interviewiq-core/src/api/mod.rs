//! REST API client module for InterviewIQ services.
//!
//! This module provides the `ApiClient` for signing in and for reading and
//! writing users, interviews and form submissions, on top of the
//! `AuthPipeline`, which attaches the bearer token and silently refreshes
//! it once when the server answers 401.
//!
//! The HTTP layer sits behind the `Transport` trait; `ReqwestTransport` is
//! the production implementation.

pub mod client;
pub mod error;
pub mod pipeline;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{ApiClient, ProfileUpdate};
pub use error::ApiError;
pub use pipeline::{ApiRequest, AuthPipeline};
pub use transport::{ReqwestTransport, Transport, TransportError};
