//! Authentication module for managing the signed-in session.
//!
//! This module provides:
//! - `CredentialStore`: the current access/refresh tokens and user profile
//! - `CredentialBackend`: durable slot storage (session file, OS keychain, memory)
//! - `RouteGuard`: per-navigation admission decisions based on the store
//!
//! A credential is created by login or registration, replaced when a
//! token is refreshed, and destroyed on logout or when a refresh fails.

pub mod backend;
pub mod credentials;
pub mod guard;

pub use backend::{CredentialBackend, FileBackend, KeyringBackend, MemoryBackend, Slots};
pub use credentials::{Credential, CredentialStore};
pub use guard::{Access, GuardOutcome, Route, RouteGuard};
