//! Per-connection request/response processing.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::FramedRead;
use tracing::{error, info};

use crate::codec::{RequestDecoder, format_response};
use crate::handler::Handler;
use crate::protocol::{HttpError, Request, Response, SendError, StatusCode};

/// Handles all requests arriving on one client connection.
///
/// The connection reads requests through a `FramedRead` over the
/// [`RequestDecoder`], passes each completed [`Request`] to the handler and
/// writes the formatted [`Response`] back, followed by its body if one is
/// attached. Requests are strictly sequential: the decoder is reset after a
/// response is written, and whatever bytes are already buffered are parsed as
/// the next request.
///
/// Any parse failure or handler fault is terminal: the matching error
/// response is sent once and the connection is closed.
pub struct ClientConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    writer: W,
}

impl<R, W> ClientConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W, max_header_bytes: usize) -> Self {
        Self { framed_read: FramedRead::new(reader, RequestDecoder::new(max_header_bytes)), writer }
    }

    /// Processes requests until the peer disconnects or a failure ends the
    /// connection.
    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(request)) => {
                    if !self.do_process(request, &handler).await? {
                        return Ok(());
                    }
                    // Ready for the next request on this connection; bytes
                    // that already arrived stay buffered in the framed read.
                    self.framed_read.decoder_mut().reset();
                }

                Some(Err(parse_error)) => {
                    error!(cause = %parse_error, "can't parse request, rejecting connection");
                    let response = Response::with_message(parse_error.status(), parse_error.to_string());
                    self.send_response(&response).await?;
                    return Err(parse_error.into());
                }

                None => {
                    info!("peer closed the connection");
                    return Ok(());
                }
            }
        }
    }

    /// Runs the handler for one request. Returns whether the connection may
    /// be kept alive for a follow-up request.
    async fn do_process<H>(&mut self, request: Request, handler: &Arc<H>) -> Result<bool, HttpError>
    where
        H: Handler,
    {
        match handler.call(request).await {
            Ok(response) => {
                self.send_response(&response).await?;
                Ok(true)
            }
            Err(e) => {
                let cause = e.into();
                error!(cause = %cause, "request handler failed, dropping connection");
                let response = Response::with_message(StatusCode::INTERNAL_SERVER_ERROR, cause.to_string());
                self.send_response(&response).await?;
                Ok(false)
            }
        }
    }

    async fn send_response(&mut self, response: &Response) -> Result<(), SendError> {
        let header_block = format_response(response);
        self.writer.write_all(&header_block).await.map_err(SendError::io)?;

        // The serializer only produces the header block; an attached body is
        // transmitted as-is behind it.
        if let Some(body) = response.body() {
            self.writer.write_all(body).await.map_err(SendError::io)?;
        }

        self.writer.flush().await.map_err(SendError::io)?;
        Ok(())
    }
}
