//! HTTP request decoder: a line-driven state machine.
//!
//! This is the top layer of the parsing stack. The [`HttpLineDecoder`] hands
//! it decoded header lines, and the state machine interprets them as request
//! line, header fields, header continuations and the header-terminating blank
//! line, accumulating everything in a [`RequestBuilder`] until a complete
//! [`Request`] can be produced.
//!
//! The decoder implements [`tokio_util::codec::Decoder`], so it plugs into a
//! `FramedRead` like any other frame format. After a request is yielded,
//! bytes that followed the header block (the beginning of a request body, or
//! a pipelined follow-up request) stay in the read buffer; the connection
//! layer decides what to do with them and calls [`RequestDecoder::reset`]
//! before parsing the next request.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::http_line::HttpLineDecoder;
use crate::ensure;
use crate::protocol::{ParseError, Request, RequestBuilder};

/// States the request decoder moves through while consuming lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Before the request line; a single stray blank line is tolerated.
    AwaitingRequestLineOrCrlf,
    /// A stray blank line was consumed; the request line must follow now.
    AwaitingRequestLine,
    /// Request line received; expecting header fields or the end of headers.
    AwaitingHeaderOrEnd,
    /// Header block complete; remaining bytes are not ours to interpret.
    AwaitingBody,
}

/// Decodes a byte stream into [`Request`] values, one per header block.
#[derive(Debug)]
pub struct RequestDecoder {
    line_decoder: HttpLineDecoder,
    builder: RequestBuilder,
    state: ParserState,
    /// Name of the most recent header field, the target for continuations.
    current_field_name: Option<String>,
}

impl RequestDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self {
            line_decoder: HttpLineDecoder::new(max_header_bytes),
            builder: RequestBuilder::new(),
            state: ParserState::AwaitingRequestLineOrCrlf,
            current_field_name: None,
        }
    }

    /// Returns to the initial state so the next request on the same
    /// connection parses exactly as it would on a fresh decoder.
    pub fn reset(&mut self) {
        self.state = ParserState::AwaitingRequestLineOrCrlf;
        self.current_field_name = None;
        self.builder.reset();
        self.line_decoder.reset();
    }

    /// Splits the request line at the first and the last space.
    ///
    /// Nothing in the protocol forbids further spaces inside the URI, so the
    /// method ends at the first space and the version begins at the last one;
    /// whatever sits in between is the URI, spaces included.
    fn parse_request_line(&mut self, line: &str) -> Result<(), ParseError> {
        let uri_delimiter = match line.find(' ') {
            Some(index) => index,
            None => return Err(ParseError::bad_request("request line is missing an URI")),
        };

        let version_delimiter = line.rfind(' ').unwrap_or(uri_delimiter);
        ensure!(
            version_delimiter != uri_delimiter,
            ParseError::bad_request("request line does not specify HTTP version")
        );

        self.builder.method.push_str(&line[..uri_delimiter]);
        self.builder.uri.push_str(&line[uri_delimiter + 1..version_delimiter]);
        self.builder.version.push_str(&line[version_delimiter + 1..]);

        // Only HTTP/1.x shares the request layout this parser understands;
        // later protocol generations changed the framing itself.
        ensure!(
            self.builder.version.starts_with("HTTP/1."),
            ParseError::unsupported_version(&self.builder.version)
        );

        Ok(())
    }

    fn parse_header_line(&mut self, line: &str) -> Result<(), ParseError> {
        // A line starting with whitespace continues the previous header's
        // value rather than opening a new field.
        if line.starts_with([' ', '\t']) {
            ensure!(
                self.current_field_name.is_some(),
                ParseError::bad_request("first message header is preceded by whitespace")
            );
            self.push_header_value(line, 1);
            return Ok(());
        }

        let value_delimiter = match line.find(':') {
            Some(index) => index,
            None => return Err(ParseError::bad_request("message header field omits value")),
        };

        let field_name = &line[..value_delimiter];
        ensure!(!field_name.is_empty(), ParseError::bad_request("message header contains unnamed field"));
        ensure!(
            !field_name.ends_with([' ', '\t']),
            ParseError::bad_request("message header field name is followed by whitespace")
        );

        self.current_field_name = Some(field_name.to_owned());
        self.push_header_value(line, value_delimiter + 1);
        Ok(())
    }

    /// Records the value text starting at `value_index` under the current
    /// field name, trimming surrounding whitespace.
    ///
    /// A value that is entirely whitespace records the field without a value;
    /// a continuation line may still supply one later.
    fn push_header_value(&mut self, line: &str, value_index: usize) {
        let value = line[value_index..].trim_matches([' ', '\t']);
        let name = match self.current_field_name.as_deref() {
            Some(name) => name,
            None => return,
        };

        if value.is_empty() {
            self.builder.add_header(name, None);
        } else {
            self.builder.add_header(name, Some(value));
        }
    }
}

impl Decoder for RequestDecoder {
    type Item = Request;
    type Error = ParseError;

    /// Consumes lines from `src` until a request completes or input runs dry.
    ///
    /// Once a request has been returned, further bytes are considered body
    /// data appended to it and are deliberately left in `src` untouched.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.state == ParserState::AwaitingBody {
            return Ok(None);
        }

        loop {
            let line = match self.line_decoder.decode_line(src)? {
                Some(line) => line,
                None => return Ok(None),
            };

            match self.state {
                // The request line, or the stray CR LF some clients send
                // ahead of it; the latter is skipped exactly once.
                ParserState::AwaitingRequestLineOrCrlf if line.is_empty() => {
                    self.state = ParserState::AwaitingRequestLine;
                }

                ParserState::AwaitingRequestLineOrCrlf | ParserState::AwaitingRequestLine => {
                    self.parse_request_line(&line)?;
                    self.current_field_name = None;
                    self.state = ParserState::AwaitingHeaderOrEnd;
                }

                ParserState::AwaitingHeaderOrEnd => {
                    if line.is_empty() {
                        self.state = ParserState::AwaitingBody;
                        return Ok(Some(self.builder.build()));
                    }
                    self.parse_header_line(&line)?;
                }

                // Guarded at the top of decode; lines are never read here.
                ParserState::AwaitingBody => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decoder() -> RequestDecoder {
        RequestDecoder::new(1024)
    }

    fn crlf(text: &str) -> BytesMut {
        BytesMut::from(text.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn decodes_a_complete_request() {
        let mut buf = crlf(indoc! {"
            GET /index.html HTTP/1.1
            Host: 127.0.0.1:8080
            User-Agent: curl/7.79.1
            Accept: */*

        "});

        let request = decoder().decode(&mut buf).unwrap().unwrap();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.uri(), "/index.html");
        assert_eq!(request.version(), "HTTP/1.1");
        assert_eq!(request.headers().len(), 3);
        assert_eq!(request.header("Host"), Some("127.0.0.1:8080"));
        assert_eq!(request.header("User-Agent"), Some("curl/7.79.1"));
        assert_eq!(request.header("Accept"), Some("*/*"));
        assert!(buf.is_empty());
    }

    #[test]
    fn needs_more_data_until_the_blank_line() {
        let mut decoder = decoder();
        let mut buf = crlf("GET / HTTP/1.1\nHost: example.org\n");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        let mut rest = crlf("\n");
        assert!(decoder.decode(&mut rest).unwrap().is_some());
    }

    #[test]
    fn split_feeding_parses_identically_to_whole_feeding() {
        let message = b"GET /split/test HTTP/1.1\r\nHost: example.org\r\nAccept: */*\r\n\r\n";

        let mut whole_buf = BytesMut::from(&message[..]);
        let expected = decoder().decode(&mut whole_buf).unwrap().unwrap();

        for split_at in 1..message.len() {
            let mut parser = decoder();
            let mut first = BytesMut::from(&message[..split_at]);
            let mut result = parser.decode(&mut first).unwrap();

            let mut second = first;
            second.extend_from_slice(&message[split_at..]);
            if result.is_none() {
                result = parser.decode(&mut second).unwrap();
            }

            assert_eq!(result.as_ref(), Some(&expected), "split at byte {split_at} diverged");
        }
    }

    #[test]
    fn leftover_bytes_stay_in_the_buffer() {
        let mut buf = BytesMut::from(&b"POST /upload HTTP/1.1\r\nContent-Length: 4\r\n\r\nbody"[..]);
        let mut parser = decoder();

        let request = parser.decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.method(), "POST");
        assert_eq!(&buf[..], b"body");

        // Until reset, anything that follows belongs to the request body.
        assert!(parser.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"body");
    }

    #[test]
    fn tolerates_one_stray_leading_crlf() {
        let mut buf = crlf("\nGET / HTTP/1.1\n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.method(), "GET");
    }

    #[test]
    fn second_stray_crlf_is_rejected() {
        let mut buf = crlf("\n\nGET / HTTP/1.1\n\n");
        let result = decoder().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn missing_uri_is_rejected() {
        let mut buf = crlf("GET\n\n");
        match decoder().decode(&mut buf) {
            Err(ParseError::BadRequest { reason }) => assert!(reason.contains("URI")),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn missing_version_is_rejected() {
        let mut buf = crlf("GET /x\n\n");
        match decoder().decode(&mut buf) {
            Err(ParseError::BadRequest { reason }) => assert!(reason.contains("version")),
            other => panic!("expected bad request, got {other:?}"),
        }
    }

    #[test]
    fn unsupported_version_is_a_distinct_error() {
        let mut buf = crlf("GET / HTTP/2.0\n\n");
        let result = decoder().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::UnsupportedVersion { .. })));
    }

    #[test]
    fn any_http_1_minor_version_is_accepted() {
        let mut buf = crlf("GET / HTTP/1.0\n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.version(), "HTTP/1.0");
    }

    #[test]
    fn uri_may_contain_internal_spaces() {
        let mut buf = crlf("GET /a path with spaces HTTP/1.1\n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.uri(), "/a path with spaces");
    }

    #[test]
    fn continuation_line_extends_the_previous_header() {
        let mut buf = crlf("GET / HTTP/1.1\nX-Foo: bar\n baz\n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.header("X-Foo"), Some("barbaz"));
    }

    #[test]
    fn continuation_after_value_less_header_supplies_the_value() {
        let mut buf = crlf("GET / HTTP/1.1\nX-Empty:   \n continued\n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.header("X-Empty"), Some("continued"));
    }

    #[test]
    fn whitespace_only_value_becomes_empty_string() {
        let mut buf = crlf("GET / HTTP/1.1\nX-Empty: \t \n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.header("X-Empty"), Some(""));
    }

    #[test]
    fn header_values_are_trimmed() {
        let mut buf = crlf("GET / HTTP/1.1\nHost:   example.org  \n\n");
        let request = decoder().decode(&mut buf).unwrap().unwrap();
        assert_eq!(request.header("Host"), Some("example.org"));
    }

    #[test]
    fn continuation_without_a_previous_header_is_rejected() {
        let mut buf = crlf("GET / HTTP/1.1\n folded\n\n");
        let result = decoder().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn header_without_colon_is_rejected() {
        let mut buf = crlf("GET / HTTP/1.1\nNoColonHere\n\n");
        let result = decoder().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn unnamed_header_is_rejected() {
        let mut buf = crlf("GET / HTTP/1.1\n: value\n\n");
        let result = decoder().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn header_name_ending_in_whitespace_is_rejected() {
        let mut buf = crlf("GET / HTTP/1.1\nHost : example.org\n\n");
        let result = decoder().decode(&mut buf);
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn reset_allows_parsing_a_second_request() {
        let mut parser = decoder();

        let mut first = crlf("GET /first HTTP/1.1\nHost: example.org\n\n");
        let first_request = parser.decode(&mut first).unwrap().unwrap();
        assert_eq!(first_request.uri(), "/first");

        parser.reset();

        let second_message = "GET /second HTTP/1.1\nAccept: */*\n\n";
        let mut second = crlf(second_message);
        let on_reused = parser.decode(&mut second).unwrap().unwrap();

        let mut fresh_buf = crlf(second_message);
        let on_fresh = decoder().decode(&mut fresh_buf).unwrap().unwrap();
        assert_eq!(on_reused, on_fresh);
    }

    #[test]
    fn oversized_header_block_is_rejected_across_chunks() {
        let mut parser = RequestDecoder::new(64);

        let mut first = BytesMut::from(&b"GET / HTTP/1.1\r\nX-Padding: aaaaaaaaaaaaaaaaaaaaaaaa"[..]);
        assert!(parser.decode(&mut first).unwrap().is_none());

        let mut second = BytesMut::from(&[b'a'; 32][..]);
        let result = parser.decode(&mut second);
        assert!(matches!(result, Err(ParseError::EntityTooLarge { max_size: 64 })));
    }
}
