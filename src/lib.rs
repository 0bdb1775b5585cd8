//! PAT dashboard backend, library crate.
//!
//! The binary in `main.rs` wires these modules into the server and CLI;
//! integration tests in `tests/` drive them directly.

pub mod api;
pub mod app;
pub mod auth;
pub mod cache;
pub mod cli;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod logto;
pub mod models;
pub mod rpc;
pub mod settings;
