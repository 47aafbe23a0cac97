//! Transport module - stream sources for sessions.
//!
//! Sessions run over any `AsyncRead`/`AsyncWrite` pair. This module provides
//! a TCP listener for hosts that do not sit behind an SSH server.

mod tcp;

pub use tcp::TcpTransport;
