//! Serialization of a [`Response`] into its exact wire bytes.
//!
//! The serializer is a pure function over the response: no state, no
//! incremental buffer growth. The total output length is computed first and
//! the header block is written into a single buffer of exactly that size.
//! Text is encoded as ISO-8859-1 to mirror the request side; characters
//! outside that repertoire degrade to `?`.
//!
//! Only the header block is produced here. A body attached to the response is
//! transmitted separately by the connection layer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::Response;

const CR: u8 = b'\r';
const LF: u8 = b'\n';
const SP: u8 = b' ';
const COLON: u8 = b':';

/// Formats the status line and headers of `response` as HTTP/1.1 wire bytes.
///
/// Layout: `<Version> SP <3-digit code> SP <StatusMessage> CRLF`, one
/// `<Name>: <Value> CRLF` per header in insertion order, and a final `CRLF`.
/// The status message falls back to the default reason phrase of the status
/// code, or to an empty string for codes without a registered phrase.
pub fn format_response(response: &Response) -> Bytes {
    let message = match response.status_message() {
        Some(message) => message,
        None => response.status().default_reason().unwrap_or(""),
    };

    // Fixed delimiters: SP + code + SP + CRLF for the status line, plus the
    // CRLF that terminates the header block.
    let mut combined_length = 1 + 3 + 1 + 2 + 2;
    combined_length += latin1_length(response.version());
    combined_length += latin1_length(message);

    // ": " and CRLF per header field.
    for (name, value) in response.headers() {
        combined_length += latin1_length(name) + latin1_length(value) + 4;
    }

    let mut dst = BytesMut::with_capacity(combined_length);

    put_latin1(&mut dst, response.version());
    dst.put_u8(SP);

    let code = response.status().as_u16();
    dst.put_u8(b'0' + (code / 100) as u8);
    dst.put_u8(b'0' + (code / 10 % 10) as u8);
    dst.put_u8(b'0' + (code % 10) as u8);
    dst.put_u8(SP);

    put_latin1(&mut dst, message);
    dst.put_u8(CR);
    dst.put_u8(LF);

    for (name, value) in response.headers() {
        put_latin1(&mut dst, name);
        dst.put_u8(COLON);
        dst.put_u8(SP);
        put_latin1(&mut dst, value);
        dst.put_u8(CR);
        dst.put_u8(LF);
    }

    dst.put_u8(CR);
    dst.put_u8(LF);

    debug_assert_eq!(dst.len(), combined_length);
    dst.freeze()
}

/// Number of bytes `text` occupies in ISO-8859-1: one per character.
fn latin1_length(text: &str) -> usize {
    text.chars().count()
}

fn put_latin1(dst: &mut BytesMut, text: &str) {
    for character in text.chars() {
        let code_point = character as u32;
        dst.put_u8(if code_point <= 0xFF { code_point as u8 } else { b'?' });
    }
}
