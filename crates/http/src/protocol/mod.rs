//! Protocol value types and the error taxonomy.
//!
//! This module holds everything that crosses the boundary between the wire
//! codecs and user code:
//!
//! - [`Request`]: immutable request handed to handlers, with the internal
//!   [`RequestBuilder`] accumulator behind it
//! - [`Response`]: status, headers and optional body produced by handlers
//! - [`StatusCode`]: the validated status catalog with default reason phrases
//! - [`HttpError`] / [`ParseError`] / [`SendError`]: the failure taxonomy;
//!   every parse failure carries the status code the peer is told about

mod request;
pub use request::Request;
pub(crate) use request::RequestBuilder;

mod response;
pub use response::Response;

mod status;
pub use status::InvalidStatusCode;
pub use status::StatusClass;
pub use status::StatusCode;

mod error;
pub use error::HttpError;
pub use error::ParseError;
pub use error::SendError;
