//! HTTP/1.x protocol engine.
//!
//! This module implements HTTP/1.0 and HTTP/1.1 request parsing, response
//! framing and keep-alive handling over any async byte stream.
//!
//! # Architecture
//!
//! - **`parser`**: Reads the request line and header block into a [`request::Request`]
//! - **`body`**: Length-bounded and gzip-decoding request body readers
//! - **`exchange`**: Binds a request to its connection and owns its one response
//! - **`response`**: Header latch and fixed-length or close-delimited body writers
//! - **`writer`**: Serializes status lines, header blocks and error responses
//! - **`router`**: Exact, content-type and prefix handler tables
//! - **`connection`**: The per-connection state machine
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │    Idle     │ ← Wait for the first byte of a request
//!        └──────┬──────┘
//!               │ Data available
//!               ▼
//!        ┌──────────────────┐
//!        │    Parsing       │ ← Request line + headers (error → 4xx/505, Closed)
//!        └──────┬───────────┘
//!               │ Request parsed
//!               ▼
//!        ┌──────────────────┐
//!        │   Dispatching    │ ← Handler runs, response is closed
//!        └──────┬───────────┘
//!               │ Step returned
//!               ├─ Continue → Idle (same connection)
//!               └─ Close → Closed
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gridserve::handlers::Echo;
//! use gridserve::http::connection::{Connection, Settings};
//! use gridserve::http::router::Router;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let router = Arc::new(Router::new());
//!     router.add_handler("/echo", Echo);
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     loop {
//!         let (socket, _addr) = listener.accept().await?;
//!         let router = router.clone();
//!         tokio::spawn(async move {
//!             let mut conn = Connection::new(socket, router, Settings::default());
//!             if let Err(e) = conn.run().await {
//!                 eprintln!("Connection error: {}", e);
//!             }
//!         });
//!     }
//! }
//! ```

pub mod body;
pub mod connection;
pub mod error;
pub mod exchange;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod router;
pub mod writer;
