//! Server builder and host.
//!
//! The [`ServerBuilder`] collects host settings, scripted behaviours and the
//! configuration source. The resulting [`Server`] is a cheap handle shared by
//! every session it starts:
//! 1. [`Server::serve`] runs a session on any duplex stream (an SSH channel,
//!    an in-memory pipe)
//! 2. [`Server::bind`] accepts plain TCP connections and serves each one
//!
//! # Example
//!
//! ```ignore
//! use netconf_emu::rpc::{ErrorSeverity, ErrorTag, ErrorType, Operation, Query, Reply, RpcError};
//! use netconf_emu::{Behaviour, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let error = RpcError::new(ErrorType::Application, ErrorTag::OperationFailed, ErrorSeverity::Error);
//!     let server = Server::builder()
//!         .store_messages(true)
//!         .behaviour(Behaviour::new(
//!             Query::new("0", Operation::GetRouteInfo),
//!             Reply::new("0").with_error(error),
//!         ))
//!         .build();
//!
//!     let handle = server.bind("127.0.0.1:8300").await?;
//!     println!("listening on {}", handle.local_addr());
//!     tokio::signal::ctrl_c().await?;
//!     handle.stop().await;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::ToSocketAddrs;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::behaviour::{Behaviour, BehaviourRegistry, MessageStore};
use crate::config::{ServerConfig, SessionConfig};
use crate::error::Result;
use crate::provider::{ConfigProvider, FileConfig, StaticConfig};
use crate::rpc::RpcElement;
use crate::session::{Session, SessionExit};
use crate::transport::TcpTransport;

/// What a session needs from the process hosting it.
pub trait SessionHost: Send + Sync + 'static {
    /// Scripted replies consulted for ordinary queries.
    fn behaviours(&self) -> &BehaviourRegistry;

    /// Record a received element. No-op when the host does not store messages.
    fn store_message(&self, element: &RpcElement);

    /// Source of the `get-config` payload.
    fn config_provider(&self) -> &dyn ConfigProvider;
}

/// Builder for configuring and creating a [`Server`].
pub struct ServerBuilder {
    config: ServerConfig,
    behaviours: Vec<Behaviour>,
    provider: Option<Arc<dyn ConfigProvider>>,
}

impl ServerBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::from_config(ServerConfig::default())
    }

    /// Start from loaded settings.
    pub fn from_config(config: ServerConfig) -> Self {
        Self {
            config,
            behaviours: Vec::new(),
            provider: None,
        }
    }

    /// Record every received message.
    ///
    /// Default: false
    pub fn store_messages(mut self, enabled: bool) -> Self {
        self.config.store_messages = enabled;
        self
    }

    /// Register a scripted behaviour. Earlier registrations take precedence.
    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.behaviours.push(behaviour);
        self
    }

    /// Set the source of the `get-config` payload.
    ///
    /// Default: the configured file, or the built-in router config.
    pub fn config_provider<P: ConfigProvider>(mut self, provider: P) -> Self {
        let provider: Arc<dyn ConfigProvider> = Arc::new(provider);
        self.provider = Some(provider);
        self
    }

    /// Set how long a stopping session may take before its tasks are aborted.
    ///
    /// Default: 2 seconds
    pub fn grace_period(mut self, grace_period: Duration) -> Self {
        self.config.session.grace_period = grace_period;
        self
    }

    /// Set the largest accepted message.
    ///
    /// Default: 16 MiB
    pub fn max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.config.session.max_frame_size = max_frame_size;
        self
    }

    /// Build the server.
    pub fn build(self) -> Server {
        let provider: Arc<dyn ConfigProvider> = match (self.provider, &self.config.config_file) {
            (Some(provider), _) => provider,
            (None, Some(path)) => Arc::new(FileConfig::new(path)),
            (None, None) => Arc::new(StaticConfig::default()),
        };

        let store = if self.config.store_messages {
            MessageStore::enabled()
        } else {
            MessageStore::disabled()
        };

        let registry = BehaviourRegistry::new();
        for behaviour in self.behaviours {
            registry.register(behaviour);
        }

        Server {
            inner: Arc::new(Shared {
                registry,
                store,
                provider,
                session: self.config.session,
            }),
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

struct Shared {
    registry: BehaviourRegistry,
    store: MessageStore,
    provider: Arc<dyn ConfigProvider>,
    session: SessionConfig,
}

/// A NETCONF device emulator.
///
/// Cloning is cheap; clones share behaviours and stored messages.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Shared>,
}

impl Server {
    /// Create a new server builder.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Run a session on a stream pair.
    ///
    /// `teardown` runs once when the session has ended.
    pub fn serve<R, W, F>(&self, reader: R, writer: W, teardown: F) -> Session
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
        F: FnOnce(SessionExit) + Send + 'static,
    {
        let host: Arc<dyn SessionHost> = Arc::new(self.clone());
        Session::spawn(host, reader, writer, &self.inner.session, teardown)
    }

    /// Accept TCP connections on `addr` and serve each one.
    pub async fn bind(&self, addr: impl ToSocketAddrs) -> Result<ServerHandle> {
        let transport = TcpTransport::bind(addr).await?;
        let local_addr = transport.local_addr()?;
        let cancel = CancellationToken::new();

        tracing::info!("Listening on {}", local_addr);
        let task = tokio::spawn(accept_loop(self.clone(), transport, cancel.clone()));

        Ok(ServerHandle {
            local_addr,
            cancel,
            task,
        })
    }

    /// Add a behaviour visible to running and future sessions.
    pub fn register_behaviour(&self, behaviour: Behaviour) {
        self.inner.registry.register(behaviour);
    }

    /// The shared behaviour registry.
    pub fn behaviours(&self) -> &BehaviourRegistry {
        &self.inner.registry
    }

    /// Every message received so far, across all sessions.
    ///
    /// # Errors
    ///
    /// [`NetconfError::StoreDisabled`](crate::NetconfError::StoreDisabled)
    /// when the server was built without message storing.
    pub fn stored_messages(&self) -> Result<Vec<RpcElement>> {
        self.inner.store.messages()
    }

    /// Stored messages as JSON.
    pub fn stored_messages_json(&self) -> Result<String> {
        self.inner.store.to_json()
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.inner.session
    }
}

impl SessionHost for Server {
    fn behaviours(&self) -> &BehaviourRegistry {
        &self.inner.registry
    }

    fn store_message(&self, element: &RpcElement) {
        self.inner.store.store(element);
    }

    fn config_provider(&self) -> &dyn ConfigProvider {
        self.inner.provider.as_ref()
    }
}

/// A running TCP listener.
pub struct ServerHandle {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, shut down open sessions and wait for them to end.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Accept loop failed: {}", e);
        }
    }
}

async fn accept_loop(server: Server, transport: TcpTransport, cancel: CancellationToken) {
    let mut sessions: Vec<Session> = Vec::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = transport.accept() => match accepted {
                Ok((reader, writer, peer)) => {
                    tracing::info!("Connection from {}", peer);
                    sessions.retain(|session| !session.is_finished());
                    sessions.push(server.serve(reader, writer, move |exit| {
                        tracing::info!("Session from {} ended: {} ({})", peer, exit, exit.code());
                    }));
                }
                Err(e) => tracing::warn!("Accept failed: {}", e),
            },
        }
    }

    tracing::info!("Listener stopped, closing {} sessions", sessions.len());
    for session in &sessions {
        session.shutdown();
    }
    for session in sessions {
        session.wait().await;
    }
}
