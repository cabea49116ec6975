//! Stdio transport for newline-delimited JSON-RPC messages.

use crate::error::{McpError, ProtocolError, Result};
use crate::protocol::types::{JsonRpcRequest, JsonRpcResponse, Message};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

/// Transport trait for MCP communication.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Next message, or `None` at end of stream.
    async fn read_message(&self) -> Result<Option<Message>>;
    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()>;
}

/// Line-oriented reader/writer pair shared by the stdio and serverless loops.
pub struct LineChannel<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Read the next non-blank line, or `None` at EOF.
    pub async fn read_line(&self) -> Result<Option<String>> {
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line).await {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    trace!("Received line: {}", line);
                    return Ok(Some(line.to_string()));
                }
                Err(e) => {
                    error!("Error reading input: {}", e);
                    return Err(McpError::Io(e));
                }
            }
        }
    }

    pub async fn write_line(&self, content: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        trace!("Sending line: {}", content);
        writer.write_all(content.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    pub fn into_writer(self) -> W {
        self.writer.into_inner()
    }
}

/// Stdio-based transport for MCP.
pub struct StdioTransport {
    channel: LineChannel<BufReader<Stdin>, Stdout>,
}

impl StdioTransport {
    pub fn new() -> Self {
        Self {
            channel: LineChannel::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout()),
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse one line as a request first, then as a response.
pub fn parse_message(line: &str) -> Result<Message> {
    match serde_json::from_str::<JsonRpcRequest>(line) {
        Ok(request) => {
            debug!("Received request: method={}", request.method);
            Ok(Message::Request(request))
        }
        Err(_) => match serde_json::from_str::<JsonRpcResponse>(line) {
            Ok(response) => {
                debug!("Received response: id={:?}", response.id);
                Ok(Message::Response(response))
            }
            Err(e) => {
                error!("Failed to parse message: {}", e);
                Err(McpError::Protocol(ProtocolError::ParseError))
            }
        },
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn read_message(&self) -> Result<Option<Message>> {
        let Some(line) = self.channel.read_line().await? else {
            return Ok(None);
        };
        parse_message(&line).map(Some)
    }

    async fn write_response(&self, response: &JsonRpcResponse) -> Result<()> {
        let json = serde_json::to_string(response)?;
        debug!("Sending response: id={:?}", response.id);
        self.channel.write_line(&json).await
    }
}
