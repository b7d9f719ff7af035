//! IPC transport implementations
//!
//! Messages are JSON envelopes, one per line.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::IpcError;
use crate::protocol::{MessageEnvelope, IPC_PROTOCOL_VERSION};

/// IPC transport trait for different communication mechanisms
#[async_trait]
pub trait IpcTransport: Send + Sync {
    /// Send a message to the other end
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError>;

    /// Receive a message from the other end
    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError>;

    /// Close the transport
    async fn close(&mut self) -> Result<(), IpcError>;
}

/// Newline-delimited JSON over any byte stream pair
pub struct StreamTransport<R, W> {
    reader: Option<BufReader<R>>,
    writer: Option<W>,
}

/// Transport over a TCP connection (loopback worker or remote runner)
pub type TcpTransport = StreamTransport<OwnedReadHalf, OwnedWriteHalf>;

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Some(BufReader::new(reader)),
            writer: Some(writer),
        }
    }
}

impl TcpTransport {
    /// Wrap an established TCP connection
    pub fn from_stream(stream: TcpStream) -> Self {
        let (reader, writer) = stream.into_split();
        Self::new(reader, writer)
    }

    /// Open a connection to `address`
    pub async fn connect(address: &str) -> Result<Self, IpcError> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| IpcError::ConnectFailed {
                address: address.to_string(),
                reason: e.to_string(),
            })?;
        stream.set_nodelay(true)?;
        Ok(Self::from_stream(stream))
    }
}

#[async_trait]
impl<R, W> IpcTransport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn send<T: Serialize + Send + Sync>(
        &mut self,
        message: &MessageEnvelope<T>,
    ) -> Result<(), IpcError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| IpcError::IoError("writer already closed".to_string()))?;

        let json = serde_json::to_string(message)
            .map_err(|e| IpcError::SerializationError(e.to_string()))?;

        let message_with_newline = format!("{}\n", json);
        writer
            .write_all(message_with_newline.as_bytes())
            .await
            .map_err(|e| IpcError::IoError(e.to_string()))?;

        writer
            .flush()
            .await
            .map_err(|e| IpcError::IoError(e.to_string()))?;

        Ok(())
    }

    async fn receive<T: for<'de> Deserialize<'de> + Send>(
        &mut self,
    ) -> Result<MessageEnvelope<T>, IpcError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| IpcError::IoError("reader already closed".to_string()))?;

        let mut line = String::new();
        reader
            .read_line(&mut line)
            .await
            .map_err(|e| IpcError::IoError(e.to_string()))?;

        if line.is_empty() {
            return Err(IpcError::ConnectionClosed);
        }

        line.truncate(line.trim_end().len());

        let envelope: MessageEnvelope<T> = serde_json::from_str(&line)
            .map_err(|e| IpcError::DeserializationError(e.to_string()))?;

        if envelope.protocol_version != IPC_PROTOCOL_VERSION {
            return Err(IpcError::ProtocolVersionMismatch {
                expected: IPC_PROTOCOL_VERSION,
                actual: envelope.protocol_version,
            });
        }

        Ok(envelope)
    }

    async fn close(&mut self) -> Result<(), IpcError> {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.shutdown().await;
        }
        let _ = self.reader.take();
        Ok(())
    }
}
