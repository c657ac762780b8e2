//! HTTP request container and its mutable accumulator.
//!
//! [`Request`] is the immutable value handed to request handlers once a full
//! header block has been parsed. [`RequestBuilder`] is the scratch state the
//! decoder fills line by line; it is owned by exactly one decoder and is
//! recycled between requests on a kept-alive connection instead of being
//! reallocated.

use std::collections::HashMap;

/// A complete, immutable HTTP request.
///
/// Header names are kept with the exact casing the client sent; each name maps
/// to a single combined value (continuation lines have already been folded in
/// by the parser). Insertion order is not preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    uri: String,
    version: String,
    headers: HashMap<String, String>,
}

impl Request {
    /// Request method, e.g. `GET` or `POST`.
    ///
    /// The parser does not restrict the method to the well-known set; any
    /// token the client sent is reported as-is.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The URI the client is addressing, verbatim from the request line.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Protocol version string, always of the form `HTTP/1.<minor>`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// All headers sent with the request.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Looks up a single header value by its exact (case-sensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Collects request-line parts and header fields while a request is parsed.
///
/// Header values are stored as `Option<String>`: a header that appeared with
/// only whitespace after the colon exists with no value yet, and may still
/// receive text from a continuation line on the next parse step.
#[derive(Debug, Default)]
pub(crate) struct RequestBuilder {
    pub(crate) method: String,
    pub(crate) uri: String,
    pub(crate) version: String,
    headers: HashMap<String, Option<String>>,
}

impl RequestBuilder {
    pub(crate) fn new() -> Self {
        Default::default()
    }

    /// Clears all collected state, keeping the header map's backing storage.
    pub(crate) fn reset(&mut self) {
        self.method.clear();
        self.uri.clear();
        self.version.clear();
        self.headers.clear();
    }

    /// Records a header field, or extends one that is already on record.
    ///
    /// A `None` value registers the bare field name. When the field already
    /// holds text, later fragments are appended to the same entry; this is
    /// what folds continuation lines into their parent header.
    pub(crate) fn add_header(&mut self, name: &str, value: Option<&str>) {
        match self.headers.get_mut(name) {
            Some(stored) => match (stored.as_mut(), value) {
                (None, value) => *stored = value.map(str::to_owned),
                (Some(stored), Some(value)) => stored.push_str(value),
                (Some(_), None) => {}
            },
            None => {
                self.headers.insert(name.to_owned(), value.map(str::to_owned));
            }
        }
    }

    /// Condenses the collected state into an immutable [`Request`].
    ///
    /// Value-less headers come out as an empty string; the client sent the
    /// field, so it must be visible to the handler.
    pub(crate) fn build(&self) -> Request {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone().unwrap_or_default()))
            .collect();

        Request { method: self.method.clone(), uri: self.uri.clone(), version: self.version.clone(), headers }
    }
}
