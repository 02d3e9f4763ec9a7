//! Connection handling
//!
//! Manages individual client connections, parsing RESP commands
//! and sending responses.

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::protocol::{RespEncoder, RespError, RespParser, RespValue};
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

/// Connection handler
pub struct Connection<S> {
    /// Client stream, usually a `TcpStream`
    stream: S,

    /// Read buffer
    read_buffer: BytesMut,

    /// Write buffer
    write_buffer: BytesMut,

    /// Bytes consumed by complete commands so far
    consumed: u64,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new connection handler
    pub fn new(stream: S) -> Self {
        Connection {
            stream,
            read_buffer: BytesMut::with_capacity(4096),
            write_buffer: BytesMut::with_capacity(4096),
            consumed: 0,
        }
    }

    /// Handle the connection
    ///
    /// Reads commands from the client, dispatches them in arrival order and
    /// sends responses. Returns Ok(()) when the client closes the stream on a
    /// command boundary. A malformed command gets an error reply, then the
    /// connection is dropped: there is no way to find the next command.
    pub async fn handle(&mut self, dispatcher: Arc<Dispatcher>) -> Result<()> {
        loop {
            // Drain every complete command already buffered
            loop {
                let before = self.read_buffer.len();
                match RespParser::parse(&mut self.read_buffer) {
                    Ok(Some(value)) => {
                        self.consumed += (before - self.read_buffer.len()) as u64;
                        debug!("Parsed command: {}", value);

                        let response = dispatcher.dispatch(value);

                        debug!("Response: {}", response);

                        self.send_response(&response).await?;
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let e = e.offset_by(self.consumed);
                        warn!("Protocol error: {}", e);
                        let error_response = RespValue::error(format!("ERR Protocol error: {}", e));
                        self.send_response(&error_response).await?;
                        return Err(e.into());
                    }
                }
            }

            // Read data from the socket
            let n = self.stream.read_buf(&mut self.read_buffer).await?;

            // Connection closed
            if n == 0 {
                if self.read_buffer.is_empty() {
                    return Ok(());
                }
                return Err(RespError::Truncated {
                    position: self.consumed + self.read_buffer.len() as u64,
                }
                .into());
            }

            debug!("Read {} bytes", n);
        }
    }

    /// Send a response to the client
    async fn send_response(&mut self, response: &RespValue) -> Result<()> {
        self.write_buffer.clear();
        RespEncoder::encode_to(&mut self.write_buffer, response);

        self.stream.write_all(&self.write_buffer).await?;
        self.stream.flush().await?;

        Ok(())
    }
}
