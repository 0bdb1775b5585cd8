//! Plain REST endpoints outside the RPC surface.

pub mod data;
