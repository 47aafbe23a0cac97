//! Plain TCP listener used in place of an SSH `netconf` subsystem.
//!
//! # Example
//!
//! ```ignore
//! use netconf_emu::transport::TcpTransport;
//!
//! let listener = TcpTransport::bind("127.0.0.1:0").await?;
//! let (reader, writer, peer) = listener.accept().await?;
//! ```

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, ToSocketAddrs};

use crate::error::Result;

/// TCP listener handing out split connections.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Bind to `addr`. Port 0 picks a free port.
    pub async fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener })
    }

    /// Accept a single connection.
    ///
    /// Returns the read half, the write half and the peer address.
    pub async fn accept(&self) -> Result<(OwnedReadHalf, OwnedWriteHalf, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok((reader, writer, peer))
    }

    /// Get the bound address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}
