//! Wire-level parsing and serialization.
//!
//! The parsing side is a stack of three layers, composed rather than
//! inherited from each other:
//!
//! - [`LineScanner`]: splits arbitrarily chunked bytes into `CRLF` lines,
//!   bounded in memory, with protocol decisions injected via [`ScanHooks`]
//! - [`HttpLineDecoder`]: layers HTTP character rules and ISO-8859-1 decoding
//!   on top of the scanner
//! - [`RequestDecoder`]: the request-line/header state machine; implements
//!   [`tokio_util::codec::Decoder`] so it can drive a `FramedRead`
//!
//! The serialization side is the single pure function [`format_response`],
//! which turns a [`crate::protocol::Response`] into its exact header bytes.

mod line;
pub use line::LineScanner;
pub use line::ScanHooks;

mod http_line;
pub use http_line::HttpLineDecoder;

mod request_decoder;
pub use request_decoder::RequestDecoder;

mod response_formatter;
pub use response_formatter::format_response;
