//! InterviewIQ core library.
//!
//! Session handling for the InterviewIQ client:
//!
//! - [`auth`]: the credential store, its storage backends and the route guard
//! - [`api`]: the authenticated request pipeline and typed API client
//! - [`forms`]: validation that runs before anything is sent
//! - [`models`]: users, interviews and form submissions
//! - [`config`]: API location, endpoint paths and storage selection

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Credential, CredentialStore, GuardOutcome, Route, RouteGuard};
pub use config::Config;
