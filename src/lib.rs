//! gridserve - HTTP/1.x engine for the simulator's service endpoints
//!
//! Request parsing, body framing, response writing and handler dispatch.

pub mod config;
pub mod handlers;
pub mod http;
pub mod server;
