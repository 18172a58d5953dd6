//! JSON-RPC API Layer
//!
//! Chat-adapter boundary for Roster: one JSON-RPC 2.0 method per engine verb.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
