//! An embedded asynchronous HTTP/1.1 server
//!
//! This crate provides a small HTTP/1.1 server built on top of tokio, focused
//! on two things: low-garbage, attack-resistant parsing of client requests,
//! and bounded-memory lifecycle management of many simultaneous connections.
//!
//! # Features
//!
//! - Incremental request parsing over arbitrarily chunked input: a request
//!   split across any number of TCP segments parses exactly like one that
//!   arrived whole
//! - Hard byte bound on buffered header data, so a peer that never sends a
//!   line terminator cannot grow the server's memory
//! - ISO-8859-1 header decoding (header values are not guaranteed UTF-8)
//! - Connection registry with a dedicated idle reaper: connections inactive
//!   beyond a configurable threshold are closed in oldest-first order
//! - Exact, single-allocation response serialization
//! - Clean error taxonomy: `400` / `413` / `505` for protocol violations,
//!   `500` for handler faults, each terminal for its connection
//!
//! # Example
//!
//! ```no_run
//! use std::error::Error;
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use nano_http::handler::make_handler;
//! use nano_http::protocol::{Request, Response, StatusCode};
//! use nano_http::server::HttpServer;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = HttpServer::builder()
//!         .port(8080)
//!         .bind()
//!         .await
//!         .expect("bind server error");
//!
//!     let handler = Arc::new(make_handler(hello_world));
//!     server.run(handler).await;
//! }
//!
//! async fn hello_world(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
//!     let body = "Hello World!\r\n";
//!     let mut response = Response::new(StatusCode::OK);
//!     response.set_header("Content-Length", body.len().to_string());
//!     response.attach_body(Bytes::from_static(body.as_bytes()));
//!     Ok(response)
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`codec`]: incremental line scanning, request decoding, response
//!   serialization
//! - [`protocol`]: request/response containers, status catalog, error types
//! - [`connection`]: per-connection request/response processing
//! - [`server`]: accept loop, connection registry and idle reaper
//! - [`handler`]: the request handler contract
//!
//! # Parsing model
//!
//! Parsing is a composition of three layers. An inner line scanner extracts
//! `CRLF`-terminated lines from chunked input and bridges lines split across
//! chunk borders; an HTTP line decoder screens each candidate line for
//! forbidden control characters and decodes it; a state machine interprets
//! the decoded lines and accumulates them into a request. Protocol decisions
//! hook into the scanner through a small trait instead of inheritance, so
//! each layer can be exercised on its own.
//!
//! # Limitations
//!
//! - HTTP/1.x only; the request line's version must start with `HTTP/1.`
//! - No TLS (use a reverse proxy for HTTPS)
//! - No chunked transfer-encoding; request bodies are left in the buffer for
//!   the caller rather than decoded
//! - One in-flight request per connection; pipelined data is parsed only
//!   after the current response is written

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod server;

mod utils;
pub(crate) use utils::ensure;
