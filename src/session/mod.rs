//! Session runtime: one NETCONF conversation over a duplex stream.
//!
//! A session runs two tasks joined by a [`MessageQueue`]:
//!
//! ```text
//! reader ─► FrameReader ─► ContentParser ─► MessageQueue ─► Engine ─► MessageWriter ─► writer
//!           (I/O task)                                      (processing task)
//! ```
//!
//! A supervisor task owns both. When either ends, it cancels the other,
//! gives it the configured grace period, aborts it if it is still running,
//! marks the session closed and runs the teardown callback exactly once.

mod engine;
mod state;
mod writer;

pub use state::{SessionState, SessionStatus};
pub use writer::{BoxedWriter, MessageWriter};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SessionConfig;
use crate::error::Result;
use crate::protocol::{ContentParser, FrameReader};
use crate::queue::MessageQueue;
use crate::rpc::RpcElement;
use crate::server::SessionHost;
use engine::Engine;

/// How a session ended, reported to the teardown callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionExit {
    /// Orderly end: close-session, end of stream or a stop request.
    Closed,
    /// A framing, transport or configuration error ended the session.
    Failed,
}

impl SessionExit {
    /// Process-style exit code: 0 for `Closed`, 1 for `Failed`.
    pub fn code(self) -> i32 {
        match self {
            SessionExit::Closed => 0,
            SessionExit::Failed => 1,
        }
    }
}

impl fmt::Display for SessionExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionExit::Closed => f.write_str("closed"),
            SessionExit::Failed => f.write_str("failed"),
        }
    }
}

/// Handle to a running session.
///
/// Dropping the handle does not stop the session.
pub struct Session {
    status: SessionStatus,
    cancel: CancellationToken,
    supervisor: JoinHandle<SessionExit>,
}

impl Session {
    /// Start a session on the given stream halves.
    ///
    /// `teardown` is called once, after both tasks have stopped.
    pub fn spawn<R, W, F>(
        host: Arc<dyn SessionHost>,
        reader: R,
        writer: W,
        config: &SessionConfig,
        teardown: F,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
        F: FnOnce(SessionExit) + Send + 'static,
    {
        let status = SessionStatus::new();
        let cancel = CancellationToken::new();
        let queue = Arc::new(MessageQueue::new());
        queue.add_listener(Arc::new(|element: &RpcElement| {
            tracing::trace!("Message received: <{}>", element.root_name());
        }));

        let frames = FrameReader::with_max_frame_size(config.max_frame_size);
        let read_task = tokio::spawn(read_loop(
            reader,
            frames,
            queue.clone(),
            status.clone(),
            cancel.clone(),
        ));

        let engine = Engine::new(host, status.clone(), MessageWriter::new(writer));
        let process_task = tokio::spawn(process_loop(engine, queue, cancel.clone()));

        let supervisor = tokio::spawn(supervise(
            read_task,
            process_task,
            status.clone(),
            cancel.clone(),
            config.grace_period,
            teardown,
        ));

        Self {
            status,
            cancel,
            supervisor,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.status.get()
    }

    /// Shared status, for observing state changes.
    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    /// Ask both tasks to stop. Already queued messages are still processed.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Whether the teardown has already run.
    pub fn is_finished(&self) -> bool {
        self.supervisor.is_finished()
    }

    /// Wait for the session to end.
    pub async fn wait(self) -> SessionExit {
        match self.supervisor.await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!("Session supervisor failed: {}", e);
                SessionExit::Failed
            }
        }
    }
}

/// I/O task: frames and parses input until end of stream, a stop request or
/// session close.
async fn read_loop<R>(
    mut reader: R,
    mut frames: FrameReader,
    queue: Arc<MessageQueue>,
    status: SessionStatus,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut parser = ContentParser::new();

    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = status.wait_closed() => return Ok(()),
            frame = frames.next_frame(&mut reader) => frame?,
        };

        match frame {
            Some(text) => {
                tracing::trace!("Parsing message:\n{}", text);
                parser.feed(&text, &queue)?;
            }
            None => {
                tracing::debug!("Input stream closed");
                return Ok(());
            }
        }
    }
}

/// Processing task: dispatches queued elements in order.
async fn process_loop(
    mut engine: Engine,
    queue: Arc<MessageQueue>,
    cancel: CancellationToken,
) -> Result<()> {
    let result = dispatch(&mut engine, &queue, &cancel).await;

    let dropped = queue.len();
    if dropped > 0 {
        tracing::debug!("Discarding {} queued messages", dropped);
    }
    if let Err(e) = engine.writer_mut().shutdown().await {
        tracing::debug!("Output shutdown failed: {}", e);
    }
    tracing::debug!(
        "Processor for session {} stopped after {} messages sent",
        engine.session_id().unwrap_or("-"),
        engine.writer().sent()
    );
    result
}

async fn dispatch(engine: &mut Engine, queue: &MessageQueue, cancel: &CancellationToken) -> Result<()> {
    loop {
        if engine.status().get().is_closed() {
            return Ok(());
        }

        tokio::select! {
            biased;
            element = queue.dequeue() => engine.handle(element).await?,
            _ = cancel.cancelled() => {
                while let Some(element) = queue.try_dequeue() {
                    if engine.status().get().is_closed() {
                        break;
                    }
                    engine.handle(element).await?;
                }
                return Ok(());
            }
        }
    }
}

async fn supervise<F>(
    mut read_task: JoinHandle<Result<()>>,
    mut process_task: JoinHandle<Result<()>>,
    status: SessionStatus,
    cancel: CancellationToken,
    grace_period: Duration,
    teardown: F,
) -> SessionExit
where
    F: FnOnce(SessionExit),
{
    let mut failed = false;

    let reader_done = tokio::select! {
        result = &mut read_task => {
            failed |= task_failed("Read loop", result);
            true
        }
        result = &mut process_task => {
            failed |= task_failed("Message processor", result);
            false
        }
    };
    let remaining = if reader_done { process_task } else { read_task };

    cancel.cancel();
    failed |= finish_within(remaining, grace_period).await;

    status.advance(SessionState::SessionClosed);
    let exit = if failed {
        SessionExit::Failed
    } else {
        SessionExit::Closed
    };
    tracing::info!("Session ended ({})", exit);
    teardown(exit);
    exit
}

/// Wait up to `grace_period` for `task`, aborting it afterwards.
///
/// Returns `true` when the task failed or had to be aborted.
async fn finish_within(mut task: JoinHandle<Result<()>>, grace_period: Duration) -> bool {
    match tokio::time::timeout(grace_period, &mut task).await {
        Ok(result) => task_failed("Session task", result),
        Err(_) => {
            tracing::warn!("Session task still running after {:?}, aborting", grace_period);
            task.abort();
            true
        }
    }
}

fn task_failed(name: &str, result: std::result::Result<Result<()>, tokio::task::JoinError>) -> bool {
    match result {
        Ok(Ok(())) => false,
        Ok(Err(e)) => {
            tracing::error!("{} error: {}", name, e);
            true
        }
        Err(e) => {
            tracing::error!("{} panicked or was cancelled: {}", name, e);
            true
        }
    }
}
