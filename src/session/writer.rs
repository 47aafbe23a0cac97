//! Outbound side of a session.

use std::io::ErrorKind;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{NetconfError, Result};
use crate::protocol::encode_message;
use crate::rpc::RpcElement;

/// Boxed transport write half.
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Serializes elements, frames them and writes them to the transport.
///
/// Owned by the processing task, so replies leave in dispatch order.
pub struct MessageWriter {
    inner: BoxedWriter,
    sent: usize,
}

impl MessageWriter {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            inner: Box::new(writer),
            sent: 0,
        }
    }

    /// Write one framed element and flush.
    pub async fn send(&mut self, element: &RpcElement) -> Result<()> {
        let bytes = encode_message(element);
        tracing::trace!("Sending <{}> ({} bytes)", element.root_name(), bytes.len());

        self.inner.write_all(&bytes).await.map_err(closed_or_io)?;
        self.inner.flush().await.map_err(closed_or_io)?;
        self.sent += 1;
        Ok(())
    }

    /// Number of elements written so far.
    pub fn sent(&self) -> usize {
        self.sent
    }

    /// Shut the write half down, signalling end of stream to the peer.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await?;
        Ok(())
    }
}

fn closed_or_io(e: std::io::Error) -> NetconfError {
    match e.kind() {
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            NetconfError::ConnectionClosed
        }
        _ => NetconfError::Io(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{Operation, Query};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_send_writes_framed_xml() {
        let (client, mut server) = tokio::io::duplex(4096);
        let mut writer = MessageWriter::new(client);

        writer
            .send(&Query::new("3", Operation::Lock).into())
            .await
            .unwrap();
        writer.shutdown().await.unwrap();

        let mut out = String::new();
        server.read_to_string(&mut out).await.unwrap();
        assert!(out.contains(r#"<rpc message-id="3" xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"><lock/></rpc>"#));
        assert!(out.ends_with("</rpc>]]>]]>\n"));
        assert_eq!(writer.sent(), 1);
    }

    #[tokio::test]
    async fn test_send_to_closed_peer_fails() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);

        let mut writer = MessageWriter::new(client);
        let result = writer.send(&Query::new("1", Operation::Get).into()).await;
        assert!(matches!(result, Err(NetconfError::ConnectionClosed)));
        assert_eq!(writer.sent(), 0);
    }
}
