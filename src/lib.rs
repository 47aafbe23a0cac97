//! # netconf-emu
//!
//! NETCONF 1.0 message engine for emulating network devices in tests.
//!
//! This crate turns a raw duplex byte stream into typed NETCONF messages and
//! drives each connection through the protocol lifecycle: capability
//! handshake, request/reply and graceful close. Replies come from a
//! scriptable behaviour table, so a test can make the "device" fail a given
//! operation once or forever.
//!
//! ## Architecture
//!
//! - **Framing** (`]]>]]>` delimited): [`protocol::FrameReader`]
//! - **Parsing**: [`protocol::ContentParser`], one [`rpc::RpcElement`] per frame
//! - **Hand-off**: [`queue::MessageQueue`] between the I/O and processing tasks
//! - **Protocol rules**: [`session`], replying from the [`BehaviourRegistry`]
//!   or with defaults
//!
//! The library emits `tracing` events and never installs a subscriber.
//!
//! ## Example
//!
//! ```ignore
//! use netconf_emu::rpc::{ErrorSeverity, ErrorTag, ErrorType, Operation, Query, Reply, RpcError};
//! use netconf_emu::{Behaviour, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::builder().store_messages(true).build();
//!
//!     // Fail the next discard-changes only
//!     let error = RpcError::new(ErrorType::Application, ErrorTag::OperationFailed, ErrorSeverity::Error);
//!     server.register_behaviour(Behaviour::consuming(
//!         Query::new("0", Operation::DiscardChanges),
//!         Reply::new("0").with_error(error),
//!     ));
//!
//!     let (reader, writer) = tokio::io::split(connect_channel().await?);
//!     let exit = server.serve(reader, writer, |_| {}).wait().await;
//!     println!("session {}, {} messages", exit, server.stored_messages()?.len());
//!     Ok(())
//! }
//! ```

pub mod behaviour;
pub mod config;
pub mod error;
pub mod protocol;
pub mod provider;
pub mod queue;
pub mod rpc;
pub mod server;
pub mod session;
pub mod transport;

pub use behaviour::{Behaviour, BehaviourRegistry, MessageStore};
pub use config::{ServerConfig, SessionConfig};
pub use error::{NetconfError, Result};
pub use provider::{ConfigProvider, FileConfig, StaticConfig};
pub use server::{Server, ServerBuilder, ServerHandle, SessionHost};
pub use session::{Session, SessionExit, SessionState};
