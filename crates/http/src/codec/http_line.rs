//! HTTP-flavored line decoding on top of the raw [`LineScanner`].
//!
//! Two concerns are layered onto the scanner here: every candidate line is
//! screened for control characters the protocol forbids, and completed lines
//! are decoded as ISO-8859-1. The single-byte encoding matters because header
//! values are not guaranteed to be valid UTF-8; with ISO-8859-1 every byte
//! maps to exactly one character, so decoding can never fail or be ambiguous.

use bytes::BytesMut;

use crate::codec::line::{LineScanner, ScanHooks};
use crate::protocol::ParseError;

const SP: u8 = 32;
const HT: u8 = 9;
const DEL: u8 = 127;

/// Yields decoded header lines from chunked input, enforcing HTTP rules.
#[derive(Debug)]
pub struct HttpLineDecoder {
    scanner: LineScanner,
    max_header_bytes: usize,
}

impl HttpLineDecoder {
    pub fn new(max_header_bytes: usize) -> Self {
        Self { scanner: LineScanner::new(max_header_bytes), max_header_bytes }
    }

    pub fn reset(&mut self) {
        self.scanner.reset();
    }

    /// Extracts and decodes the next line, consuming scanned bytes from `src`.
    ///
    /// Returns `Ok(None)` when the line is not complete yet.
    pub fn decode_line(&mut self, src: &mut BytesMut) -> Result<Option<String>, ParseError> {
        let mut hooks = HttpScanHooks { max_header_bytes: self.max_header_bytes };
        match self.scanner.next_line(src, &mut hooks)? {
            Some(line) => Ok(Some(decode_latin1(&line))),
            None => Ok(None),
        }
    }
}

/// Maps scanner events onto the HTTP error taxonomy and screens line bytes.
struct HttpScanHooks {
    max_header_bytes: usize,
}

impl ScanHooks for HttpScanHooks {
    type Error = ParseError;

    fn message_too_large(&mut self) -> ParseError {
        ParseError::entity_too_large(self.max_header_bytes)
    }

    fn lone_carriage_return(&mut self) -> ParseError {
        ParseError::bad_request("invalid character in request header")
    }

    fn verify_potential_line(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        for &byte in bytes {
            // All control characters except SP and HT are disallowed inside
            // a header line. SP is not a control character to begin with, but
            // spelling it out keeps the rule readable.
            let is_control = byte < 32 || byte == DEL;
            if is_control && byte != SP && byte != HT {
                return Err(ParseError::bad_request("invalid character in request header"));
            }
        }
        Ok(())
    }
}

/// Decodes ISO-8859-1 bytes: each byte is exactly the code point of one char.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&byte| char::from(byte)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_lines(decoder: &mut HttpLineDecoder, chunk: &[u8]) -> Result<Vec<String>, ParseError> {
        let mut src = BytesMut::from(chunk);
        let mut lines = Vec::new();
        while let Some(line) = decoder.decode_line(&mut src)? {
            lines.push(line);
        }
        Ok(lines)
    }

    #[test]
    fn decodes_an_example_request() {
        let mut decoder = HttpLineDecoder::new(1024);
        let lines = collect_lines(&mut decoder, b"GET / HTTP/1.1\r\nHost: example.org\r\n\r\n").unwrap();
        assert_eq!(lines, ["GET / HTTP/1.1", "Host: example.org", ""]);
    }

    #[test]
    fn decodes_latin1_header_values() {
        let mut decoder = HttpLineDecoder::new(1024);
        // 0xE9 is 'é' in ISO-8859-1 and invalid as a UTF-8 single byte.
        let lines = collect_lines(&mut decoder, b"X-Name: caf\xE9\r\n").unwrap();
        assert_eq!(lines, ["X-Name: café"]);
    }

    #[test]
    fn rejects_control_characters() {
        let mut decoder = HttpLineDecoder::new(1024);
        let result = collect_lines(&mut decoder, b"GET /\x01 HTTP/1.1\r\n");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn rejects_the_delete_character() {
        let mut decoder = HttpLineDecoder::new(1024);
        let result = collect_lines(&mut decoder, b"GET /\x7f HTTP/1.1\r\n");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn allows_space_and_horizontal_tab() {
        let mut decoder = HttpLineDecoder::new(1024);
        let lines = collect_lines(&mut decoder, b"X-Padded: \tvalue with spaces\r\n").unwrap();
        assert_eq!(lines, ["X-Padded: \tvalue with spaces"]);
    }

    #[test]
    fn rejects_invalid_characters_before_line_completion() {
        let mut decoder = HttpLineDecoder::new(1024);
        // No CR LF in sight, the illegal byte alone triggers the rejection.
        let result = collect_lines(&mut decoder, b"GET /\x02");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }

    #[test]
    fn oversized_header_reports_the_configured_limit() {
        let mut decoder = HttpLineDecoder::new(32);
        let result = collect_lines(&mut decoder, &[b'a'; 64]);
        assert!(matches!(result, Err(ParseError::EntityTooLarge { max_size: 32 })));
    }

    #[test]
    fn lone_carriage_return_is_a_bad_request() {
        let mut decoder = HttpLineDecoder::new(1024);
        let result = collect_lines(&mut decoder, b"GET / HTTP/1.1\rX");
        assert!(matches!(result, Err(ParseError::BadRequest { .. })));
    }
}
