//! Per-connection request processing.
//!
//! [`ClientConnection`] owns one accepted socket for its whole lifetime: it
//! reads requests through the request decoder, invokes the handler, writes
//! responses back and enforces the error policy (a malformed request or a
//! handler fault is answered once, then the connection is closed).

mod client_connection;

pub use client_connection::ClientConnection;
