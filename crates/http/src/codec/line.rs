//! Incremental extraction of `CRLF`-terminated lines from a chunked stream.
//!
//! The scanner is fed whatever the socket delivered, one [`BytesMut`] chunk at
//! a time, and chops it into lines. A line that arrives whole inside a single
//! chunk is handed out without copying; a line that straddles chunk borders is
//! bridged through an internal store buffer. Total buffered-but-unterminated
//! data is bounded, so a peer that never sends a line break cannot grow the
//! server's memory.
//!
//! The scanner itself knows nothing about HTTP. Protocol rules plug in
//! through [`ScanHooks`]: which bytes are allowed inside a line, and which
//! error values to produce for an oversized message or a carriage return that
//! is not followed by a line feed. Hooks see candidate data *before* a line
//! completes, so a forbidden byte is rejected as soon as it is received.

use bytes::{Buf, Bytes, BytesMut};

const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Protocol-specific decisions injected into [`LineScanner`].
pub trait ScanHooks {
    type Error;

    /// Produces the error for a message that exceeded the size bound.
    fn message_too_large(&mut self) -> Self::Error;

    /// Produces the error for a `CR` that is not followed by a `LF`.
    fn lone_carriage_return(&mut self) -> Self::Error;

    /// Inspects candidate line bytes, possibly before the line is complete.
    ///
    /// Called for every scanned region excluding the `CR LF` itself, so data
    /// containing bytes the protocol forbids is rejected without waiting for
    /// the line terminator.
    fn verify_potential_line(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

/// Extracts `CRLF`-terminated lines from arbitrarily chunked input.
#[derive(Debug)]
pub struct LineScanner {
    /// Upper bound on the accumulated size of the scanned message.
    max_message_bytes: usize,
    /// Carries a partial line across chunk borders.
    stored: BytesMut,
    /// Whether `stored` ends with a `CR` whose `LF` has not arrived yet.
    stored_ends_with_cr: bool,
    /// Bytes of the current message consumed so far, terminators included.
    accumulated: usize,
}

impl LineScanner {
    pub fn new(max_message_bytes: usize) -> Self {
        Self { max_message_bytes, stored: BytesMut::new(), stored_ends_with_cr: false, accumulated: 0 }
    }

    /// Restores the initial state, keeping the store buffer's capacity.
    pub fn reset(&mut self) {
        self.stored.clear();
        self.stored_ends_with_cr = false;
        self.accumulated = 0;
    }

    /// Attempts to extract the next line from `src`, consuming scanned bytes.
    ///
    /// Returns `Ok(None)` when more input is needed; the unterminated tail has
    /// then been moved into the internal store, leaving `src` empty. Returns
    /// the line without its `CR LF` otherwise. Unscanned bytes following a
    /// returned line stay in `src` untouched, so the caller decides whether
    /// they are another line or opaque payload.
    pub fn next_line<H: ScanHooks>(&mut self, src: &mut BytesMut, hooks: &mut H) -> Result<Option<Bytes>, H::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        // A CR at the very end of the previous chunk may be a line break split
        // in two; the verdict is the first byte of this chunk.
        if self.stored_ends_with_cr {
            let is_line_feed = src[0] == LF;
            self.accumulated += 1;
            src.advance(1);
            self.stored_ends_with_cr = false;

            if !is_line_feed {
                self.stored.clear();
                return Err(hooks.lone_carriage_return());
            }

            let line = Bytes::copy_from_slice(&self.stored[..self.stored.len() - 1]);
            self.stored.clear();
            return Ok(Some(line));
        }

        self.scan_for_line_ending(src, hooks)
    }

    fn scan_for_line_ending<H: ScanHooks>(
        &mut self,
        src: &mut BytesMut,
        hooks: &mut H,
    ) -> Result<Option<Bytes>, H::Error> {
        // Never look further than the size bound allows.
        let safe_len = src.len().min(self.max_message_bytes.saturating_sub(self.accumulated));

        match src[..safe_len].iter().position(|&byte| byte == CR) {
            None => {
                // Verify before the size check: a byte-by-byte parser would
                // stumble over an invalid character first.
                hooks.verify_potential_line(&src[..safe_len])?;

                // No CR in the scanned data. Once it comes within one byte of
                // the bound, no terminated line can complete anymore; this
                // also covers the case where safe_len was capped.
                if self.accumulated + safe_len >= self.max_message_bytes.saturating_sub(1) {
                    return Err(hooks.message_too_large());
                }

                self.take_over(src);
                Ok(None)
            }
            Some(cr_index) => self.parse_potential_line(src, cr_index, hooks),
        }
    }

    fn parse_potential_line<H: ScanHooks>(
        &mut self,
        src: &mut BytesMut,
        cr_index: usize,
        hooks: &mut H,
    ) -> Result<Option<Bytes>, H::Error> {
        hooks.verify_potential_line(&src[..cr_index])?;

        if self.accumulated + cr_index >= self.max_message_bytes.saturating_sub(1) {
            return Err(hooks.message_too_large());
        }

        // The CR is the final byte received so far: whether a LF follows can
        // only be decided once the next chunk arrives.
        if cr_index + 1 >= src.len() {
            self.take_over(src);
            self.stored_ends_with_cr = true;
            return Ok(None);
        }

        let is_line_feed = src[cr_index + 1] == LF;
        let consumed = cr_index + 2;
        self.accumulated += consumed;

        if !is_line_feed {
            src.advance(consumed);
            self.stored.clear();
            return Err(hooks.lone_carriage_return());
        }

        if self.stored.is_empty() {
            // The complete line sits in the received chunk: no copy needed.
            let mut line = src.split_to(consumed);
            line.truncate(cr_index);
            Ok(Some(line.freeze()))
        } else {
            // Line began in an earlier chunk; stitch both halves together.
            self.stored.extend_from_slice(&src[..cr_index]);
            src.advance(consumed);
            let line = Bytes::copy_from_slice(&self.stored);
            self.stored.clear();
            Ok(Some(line))
        }
    }

    /// Moves all received data into the store buffer to await the next chunk.
    fn take_over(&mut self, src: &mut BytesMut) {
        self.accumulated += src.len();
        self.stored.extend_from_slice(src);
        src.clear();
    }
}
