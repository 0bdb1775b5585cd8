//! Logto integration: the HTTP client for the OIDC token endpoint and the
//! Management API's personal-access-token resources.

pub mod client;

pub use client::{LogtoClient, LogtoError};
