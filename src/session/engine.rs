//! Protocol rules applied to each dequeued element.

use std::sync::Arc;

use rand_core::{OsRng, RngCore};

use super::state::{SessionState, SessionStatus};
use super::writer::MessageWriter;
use crate::error::Result;
use crate::rpc::{Hello, Operation, Query, Reply, RpcElement};
use crate::server::SessionHost;

/// First message-id used for close-session requests sent by the server.
const FIRST_CLOSE_MESSAGE_ID: u64 = 100;

/// Per-session dispatcher. Owned by the processing task.
pub(crate) struct Engine {
    host: Arc<dyn SessionHost>,
    status: SessionStatus,
    writer: MessageWriter,
    session_id: Option<String>,
    next_message_id: u64,
}

impl Engine {
    pub(crate) fn new(host: Arc<dyn SessionHost>, status: SessionStatus, writer: MessageWriter) -> Self {
        Self {
            host,
            status,
            writer,
            session_id: None,
            next_message_id: FIRST_CLOSE_MESSAGE_ID,
        }
    }

    pub(crate) fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub(crate) fn writer(&self) -> &MessageWriter {
        &self.writer
    }

    pub(crate) fn writer_mut(&mut self) -> &mut MessageWriter {
        &mut self.writer
    }

    /// Apply the protocol rules to one element.
    ///
    /// # Errors
    ///
    /// Transport write failures and configuration provider failures. Both are
    /// fatal to the session.
    pub(crate) async fn handle(&mut self, element: RpcElement) -> Result<()> {
        if self.status.get().is_closed() {
            tracing::debug!("Session closed, discarding <{}>", element.root_name());
            return Ok(());
        }

        self.host.store_message(&element);

        match element {
            RpcElement::Hello(hello) => self.on_hello(hello).await,
            RpcElement::Query(query) => self.on_query(query).await,
            RpcElement::Reply(reply) => {
                self.on_reply(reply);
                Ok(())
            }
        }
    }

    async fn on_hello(&mut self, hello: Hello) -> Result<()> {
        if self.status.get() >= SessionState::HelloReceived {
            tracing::warn!("Second hello received, closing session");
            let message_id = self.next_message_id.to_string();
            self.next_message_id += 1;
            self.writer.send(&Query::close_session(message_id).into()).await?;
            self.status.advance(SessionState::ClosingSession);
            return Ok(());
        }

        tracing::debug!("Client hello with {} capabilities", hello.capabilities.len());
        let session_id = OsRng.next_u32().to_string();
        self.writer.send(&Hello::server(session_id.clone()).into()).await?;
        tracing::info!("Session {} established", session_id);
        self.session_id = Some(session_id);
        self.status.advance(SessionState::HelloReceived);
        Ok(())
    }

    async fn on_query(&mut self, query: Query) -> Result<()> {
        if self.status.get() < SessionState::HelloReceived {
            tracing::warn!(
                "Query {} (<{}>) before hello, discarding",
                query.message_id,
                query.operation
            );
            return Ok(());
        }

        let reply = match query.operation {
            Operation::CloseSession => {
                tracing::info!("Close requested by client ({})", query.message_id);
                self.status.advance(SessionState::ClosingSession);
                self.writer.send(&Reply::ok_for(&query).into()).await?;
                self.status.advance(SessionState::SessionClosed);
                return Ok(());
            }
            Operation::GetConfig => {
                let configuration = self.host.config_provider().configuration().await?;
                Reply::config_for(&query, configuration)
            }
            _ => match self.host.behaviours().match_query(&query) {
                Some(reply) => {
                    tracing::debug!("Scripted reply for <{}> ({})", query.operation, query.message_id);
                    reply
                }
                None => Reply::ok_for(&query),
            },
        };

        self.writer.send(&reply.into()).await
    }

    fn on_reply(&mut self, reply: Reply) {
        match self.status.get() {
            SessionState::ClosingSession => {
                tracing::info!("Close confirmed by client ({})", reply.message_id);
                self.status.advance(SessionState::SessionClosed);
            }
            SessionState::Init => {
                tracing::warn!("Reply {} before hello, discarding", reply.message_id);
            }
            state => {
                tracing::warn!("Unexpected reply {} in state {}, ignoring", reply.message_id, state);
            }
        }
    }

    pub(crate) fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}
