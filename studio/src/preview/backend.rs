//! Sandbox backends hosting the isolated execution context.
//!
//! The session driver never touches a concrete runtime: it hands a backend
//! one document and gets back a context whose only surface is a channel of
//! envelopes. [`ProcessBackend`] runs a configured runtime command as a
//! child process; [`ScriptedBackend`] plays back a fixed message sequence
//! for tests and headless embedding.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::preview::protocol::{BoundaryEnvelope, BoundaryMessage, SANDBOX_LINE_PREFIX};

/// Result type for sandbox operations
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Errors raised while standing up an execution context
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Failed to launch sandbox runtime '{command}': {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },

    #[error("Sandbox runtime '{command}' exposes no {stream} pipe")]
    MissingPipe {
        command: String,
        stream: &'static str,
    },

    #[error("Failed to deliver document to sandbox: {0}")]
    DocumentDelivery(#[from] std::io::Error),
}

/// Keeps the context's host-side resource alive; dropping it is teardown.
#[derive(Debug)]
enum ContextGuard {
    /// Child spawned with `kill_on_drop`, so the drop kills it.
    Process(Child),
    Task(JoinHandle<()>),
    Detached,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        if let ContextGuard::Task(handle) = self {
            handle.abort();
        }
    }
}

/// A live isolated execution context.
///
/// The host holds no reference into the context itself; this channel of
/// envelopes is the entire interaction surface.
#[derive(Debug)]
pub struct SandboxContext {
    context_id: String,
    envelopes: mpsc::UnboundedReceiver<BoundaryEnvelope>,
    _guard: ContextGuard,
}

impl SandboxContext {
    /// A context fed by an externally owned channel, with no teardown of
    /// its own. Embedders that pump messages themselves use this.
    pub fn detached(
        context_id: impl Into<String>,
        envelopes: mpsc::UnboundedReceiver<BoundaryEnvelope>,
    ) -> Self {
        Self {
            context_id: context_id.into(),
            envelopes,
            _guard: ContextGuard::Detached,
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Next envelope, or `None` once the context has exited.
    pub async fn recv(&mut self) -> Option<BoundaryEnvelope> {
        self.envelopes.recv().await
    }
}

/// Where sandboxed execution actually happens.
#[async_trait]
pub trait SandboxBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Stand up a fresh context executing `document`. The context echoes
    /// `context_id` on every envelope it emits.
    async fn launch(&self, document: &str, context_id: &str) -> SandboxResult<SandboxContext>;
}

/// Extract an envelope from one line of sandbox stdout.
///
/// Lines without the protocol prefix are ordinary runtime output; lines
/// with the prefix but unparseable JSON are treated the same way.
pub(crate) fn parse_protocol_line(line: &str) -> Option<BoundaryEnvelope> {
    let payload = line.trim().strip_prefix(SANDBOX_LINE_PREFIX)?;
    serde_json::from_str(payload).ok()
}

/// Runs the document in a child process.
///
/// The document travels over stdin (EOF marks it complete); protocol lines
/// come back prefixed on stdout. The child gets its own process group so
/// teardown kills descendants too.
#[derive(Debug, Clone)]
pub struct ProcessBackend {
    command: String,
    args: Vec<String>,
}

impl ProcessBackend {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl SandboxBackend for ProcessBackend {
    fn name(&self) -> &str {
        "process"
    }

    async fn launch(&self, document: &str, context_id: &str) -> SandboxResult<SandboxContext> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|e| SandboxError::Launch {
            command: self.command.clone(),
            source: e,
        })?;

        let mut stdin = child.stdin.take().ok_or_else(|| SandboxError::MissingPipe {
            command: self.command.clone(),
            stream: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or_else(|| SandboxError::MissingPipe {
            command: self.command.clone(),
            stream: "stdout",
        })?;

        // Start draining stdout before writing the document so a chatty
        // runtime cannot deadlock both pipes.
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(envelope) = parse_protocol_line(&line) {
                    if tx.send(envelope).is_err() {
                        break;
                    }
                }
            }
            // EOF drops the sender, which the session driver observes as
            // the context exiting.
        });

        stdin.write_all(document.as_bytes()).await?;
        stdin.shutdown().await?;
        drop(stdin);

        Ok(SandboxContext {
            context_id: context_id.to_string(),
            envelopes: rx,
            _guard: ContextGuard::Process(child),
        })
    }
}

/// Plays back a scripted message sequence instead of executing anything.
#[derive(Debug, Clone)]
pub struct ScriptedBackend {
    turns: Vec<(Duration, BoundaryMessage)>,
    hold_open: bool,
}

impl ScriptedBackend {
    /// Context that plays `turns`, then exits (the channel closes).
    pub fn new(turns: Vec<(Duration, BoundaryMessage)>) -> Self {
        Self {
            turns,
            hold_open: false,
        }
    }

    /// Context that plays `turns`, then stays alive without ever
    /// reporting — how a hung runtime looks from the host side.
    pub fn holding_open(turns: Vec<(Duration, BoundaryMessage)>) -> Self {
        Self {
            turns,
            hold_open: true,
        }
    }

    /// A context that loads and reports `READY` with the given time.
    pub fn ready(load_time_ms: u64) -> Self {
        Self::new(vec![
            (Duration::ZERO, BoundaryMessage::LoadStart),
            (
                Duration::from_millis(10),
                BoundaryMessage::Ready { load_time_ms },
            ),
        ])
    }

    /// A context that loads and then reports the given error.
    pub fn erroring(error: impl Into<String>) -> Self {
        Self::new(vec![
            (Duration::ZERO, BoundaryMessage::LoadStart),
            (
                Duration::from_millis(10),
                BoundaryMessage::Error {
                    error: error.into(),
                    details: None,
                },
            ),
        ])
    }

    /// A context that starts loading and never reports.
    pub fn silent() -> Self {
        Self::holding_open(vec![(Duration::ZERO, BoundaryMessage::LoadStart)])
    }

    /// A context that starts loading and then dies without reporting.
    pub fn crashing() -> Self {
        Self::new(vec![(Duration::ZERO, BoundaryMessage::LoadStart)])
    }
}

#[async_trait]
impl SandboxBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn launch(&self, _document: &str, context_id: &str) -> SandboxResult<SandboxContext> {
        let (tx, rx) = mpsc::unbounded_channel();
        let turns = self.turns.clone();
        let id = context_id.to_string();
        let hold_open = self.hold_open;

        let handle = tokio::spawn(async move {
            for (delay, message) in turns {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                if tx.send(BoundaryEnvelope::new(id.clone(), message)).is_err() {
                    return;
                }
            }
            if hold_open {
                std::future::pending::<()>().await;
            }
        });

        Ok(SandboxContext {
            context_id: context_id.to_string(),
            envelopes: rx,
            _guard: ContextGuard::Task(handle),
        })
    }
}
