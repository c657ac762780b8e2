//! HTTP response container.

use bytes::Bytes;

use crate::protocol::StatusCode;

/// A response produced by a request handler, consumed once by the serializer.
///
/// Headers keep their insertion order on the wire; setting a name that is
/// already present overwrites the old value in place. The status message is
/// optional: when absent, the serializer falls back to the default reason
/// phrase for the status code, or to an empty string for unregistered codes.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    version: String,
    message: Option<String>,
    headers: Vec<(String, String)>,
    body: Option<Bytes>,
}

impl Response {
    /// Creates an `HTTP/1.1` response with the given status code.
    pub fn new(status: StatusCode) -> Self {
        Self { status, version: "HTTP/1.1".to_owned(), message: None, headers: Vec::new(), body: None }
    }

    /// Creates a response carrying an explicit status message.
    ///
    /// Handlers mostly rely on the default reason phrase; an explicit message
    /// is useful for telling the client what went wrong on error responses.
    pub fn with_message(status: StatusCode, message: impl Into<String>) -> Self {
        let mut response = Self::new(status);
        response.message = Some(message.into());
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn status_message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Sets a header, overwriting an earlier value without changing its
    /// position in the output order.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing_value)) => *existing_value = value,
            None => self.headers.push((name, value)),
        }
    }

    /// Headers in the order they will appear on the wire.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Attaches body bytes that the connection transmits after the header
    /// block. The serializer itself never touches the body.
    pub fn attach_body(&mut self, body: Bytes) {
        self.body = Some(body);
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_keep_insertion_order() {
        let mut response = Response::new(StatusCode::OK);
        response.set_header("Server", "nano-http");
        response.set_header("Content-Type", "text/plain");
        response.set_header("Content-Length", "0");

        let names: Vec<&str> = response.headers().iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, ["Server", "Content-Type", "Content-Length"]);
    }

    #[test]
    fn duplicate_header_overwrites_in_place() {
        let mut response = Response::new(StatusCode::OK);
        response.set_header("Server", "one");
        response.set_header("Content-Type", "text/plain");
        response.set_header("Server", "two");

        assert_eq!(response.headers().len(), 2);
        assert_eq!(response.headers()[0], ("Server".to_owned(), "two".to_owned()));
    }
}
