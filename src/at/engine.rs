//! Request/reply correlation over a half-duplex AT channel.
//!
//! The channel is strictly request/response: one command goes out, the
//! engine suspends until the reply is classified or a deadline elapses, and
//! only then may the next command be issued. Exclusive access is enforced by
//! construction: every operation takes `&mut self`, so an engine instance
//! cannot be shared without external serialization.
//!
//! The wait itself is a small state machine (`Idle`, `AwaitingReply`,
//! `Resolved`) with a single transition function driven by "reply arrived"
//! and "deadline elapsed" events. Before each wait the pending request's
//! default failure is set to `Timeout`; a classified reply is the only thing
//! that replaces it.

use std::sync::Arc;

use bytes::BytesMut;
use log::{debug, trace, warn};
use tokio::sync::watch;
use tokio::time::{sleep_until, Duration, Instant};

use crate::at::lines::LineIndex;
use crate::at::reply::{classify, Reply, ReplyClass};
use crate::config::ProtocolConfig;
use crate::error::LinkError;
use crate::logutil::{escape_log, hex_snippet};
use crate::transport::AtTransport;

/// Single octet that leaves raw/edit mode and commits the chunk.
pub const RAW_TERMINATOR: u8 = 0x1A;

/// What ends the current wait.
enum WaitMode {
    /// A reply whose terminal line classifies (OK / ERROR / +CMS ERROR).
    Classified,
    /// The raw-mode prompt after a write-header command: any complete line
    /// or a `>` byte, regardless of classification.
    EditPrompt,
}

enum WaitState {
    Idle,
    AwaitingReply,
    Resolved(Result<Reply, LinkError>),
}

enum WaitEvent {
    ReplyArrived(Reply),
    DeadlineElapsed,
}

/// The one outstanding exchange. Created per wait, destroyed on resolution;
/// `default_failure` starts as `Timeout` and is what a lapsed deadline
/// yields.
struct PendingRequest {
    default_failure: Option<LinkError>,
}

impl PendingRequest {
    fn new() -> Self {
        PendingRequest {
            default_failure: Some(LinkError::Timeout),
        }
    }

    /// The only place wait state changes. Resolved states absorb further
    /// events so a late reply cannot overwrite a timeout outcome.
    fn resolve(&mut self, state: WaitState, event: WaitEvent) -> WaitState {
        match (state, event) {
            (WaitState::AwaitingReply, WaitEvent::ReplyArrived(reply)) => {
                WaitState::Resolved(Ok(reply))
            }
            (WaitState::AwaitingReply, WaitEvent::DeadlineElapsed) => WaitState::Resolved(Err(
                self.default_failure.take().unwrap_or(LinkError::Timeout),
            )),
            (resolved, _) => resolved,
        }
    }
}

fn has_complete_line(buf: &[u8]) -> bool {
    let mut seen_content = false;
    for &b in buf {
        if b == b'\r' || b == b'\n' {
            if seen_content {
                return true;
            }
        } else {
            seen_content = true;
        }
    }
    false
}

/// Whether the accumulated bytes form a whole reply for this wait mode.
fn reply_complete(buf: &[u8], mode: &WaitMode) -> bool {
    match mode {
        WaitMode::Classified => {
            // Only judge whole lines; a result token split across reads must
            // not classify early.
            if !matches!(buf.last(), Some(&b'\r') | Some(&b'\n')) {
                return false;
            }
            let lines = LineIndex::parse(buf);
            classify(buf, &lines) != ReplyClass::Unrecognized
        }
        WaitMode::EditPrompt => buf.contains(&b'>') || has_complete_line(buf),
    }
}

/// Half-duplex AT protocol engine: one transport, one outstanding request.
///
/// Owns the receive buffer, the edit-mode flag, and the cached calendar scan
/// position; all of it is mutated only through `&mut self` operations, so
/// there is never a second in-flight exchange.
pub struct AtEngine<T> {
    transport: T,
    protocol: ProtocolConfig,
    rx_buf: BytesMut,
    edit_mode: bool,
    calendar_scan_pos: u32,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

/// Cloneable handle that aborts any in-progress wait. The interrupted wait
/// (and every wait after it) resolves as a `Timeout` failure.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn signal(&self) {
        let _ = self.tx.send(true);
    }
}

impl<T: AtTransport> AtEngine<T> {
    pub fn new(transport: T, protocol: ProtocolConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        AtEngine {
            transport,
            protocol,
            rx_buf: BytesMut::with_capacity(4096),
            edit_mode: false,
            calendar_scan_pos: 0,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown_tx),
        }
    }

    pub fn protocol(&self) -> &ProtocolConfig {
        &self.protocol
    }

    pub(crate) fn calendar_scan_pos(&self) -> u32 {
        self.calendar_scan_pos
    }

    pub(crate) fn set_calendar_scan_pos(&mut self, pos: u32) {
        self.calendar_scan_pos = pos;
    }

    /// Send `command` and suspend until a classified reply or the deadline.
    ///
    /// A lapsed deadline reissues the command up to `retries` times before
    /// yielding `Timeout`. Definitive rejections (ERROR, +CMS ERROR) come
    /// back as a classified [`Reply`] immediately and are never retried:
    /// they mean the phone heard us and said no.
    pub async fn send(
        &mut self,
        command: &[u8],
        timeout: Duration,
        retries: u32,
    ) -> Result<Reply, LinkError> {
        let mut attempt = 0u32;
        loop {
            // A consumed watch edge is invisible to later waits; the flag
            // itself gates every (re)issue so shutdown also stops retries.
            if *self.shutdown_rx.borrow() {
                debug!("shutdown flag set, not issuing command");
                return Err(LinkError::Timeout);
            }
            debug!("-> {}", escape_log(&String::from_utf8_lossy(command)));
            // Stale unsolicited bytes belong to no exchange; drop them so
            // the line index starts at this command's echo.
            self.rx_buf.clear();
            self.transport.write_all(command).await?;
            match self.wait_reply(timeout, WaitMode::Classified).await {
                Err(LinkError::Timeout) if attempt < retries => {
                    attempt += 1;
                    warn!(
                        "no reply within {:?}, reissuing command ({}/{})",
                        timeout, attempt, retries
                    );
                }
                outcome => return outcome,
            }
        }
    }

    /// [`AtEngine::send`] with the configured reply timeout and retry budget.
    pub async fn send_command(&mut self, command: &[u8]) -> Result<Reply, LinkError> {
        let timeout = self.protocol.reply_timeout();
        let retries = self.protocol.command_retries;
        self.send(command, timeout, retries).await
    }

    /// Wait for the next classified reply without sending anything. Used for
    /// the acknowledgement after a raw chunk, where no command echo exists.
    pub async fn send_once(&mut self, timeout: Duration) -> Result<Reply, LinkError> {
        self.wait_reply(timeout, WaitMode::Classified).await
    }

    /// Send a write-header command and switch the channel into raw/edit
    /// mode, resolving on the device's prompt rather than on a result code.
    pub async fn send_edit(&mut self, command: &[u8], timeout: Duration) -> Result<(), LinkError> {
        debug!("-> {} (edit)", escape_log(&String::from_utf8_lossy(command)));
        self.rx_buf.clear();
        self.transport.write_all(command).await?;
        self.edit_mode = true;
        match self.wait_reply(timeout, WaitMode::EditPrompt).await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.edit_mode = false;
                Err(e)
            }
        }
    }

    /// Write chunk bytes verbatim while in edit mode.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<(), LinkError> {
        debug_assert!(self.edit_mode, "raw bytes written outside edit mode");
        trace!("raw {} bytes: {}", data.len(), hex_snippet(data, 64));
        self.transport.write_all(data).await?;
        Ok(())
    }

    /// Write the raw-mode terminator and leave edit mode.
    pub async fn finish_raw(&mut self) -> Result<(), LinkError> {
        self.transport.write_all(&[RAW_TERMINATOR]).await?;
        self.edit_mode = false;
        Ok(())
    }

    async fn wait_reply(&mut self, timeout: Duration, mode: WaitMode) -> Result<Reply, LinkError> {
        let deadline = Instant::now() + timeout;
        let mut pending = PendingRequest::new();
        let mut state = WaitState::AwaitingReply;
        let Self {
            transport,
            rx_buf,
            shutdown_rx,
            ..
        } = self;
        loop {
            match std::mem::replace(&mut state, WaitState::Idle) {
                WaitState::Resolved(outcome) => {
                    if let Ok(reply) = &outcome {
                        debug!(
                            "<- {} ({:?})",
                            escape_log(&String::from_utf8_lossy(reply.raw())),
                            reply.class()
                        );
                    }
                    return outcome;
                }
                other => state = other,
            }
            tokio::select! {
                res = transport.read_chunk() => match res {
                    Ok(data) => {
                        trace!("rx {} bytes: {}", data.len(), hex_snippet(&data, 64));
                        rx_buf.extend_from_slice(&data);
                        if reply_complete(rx_buf, &mode) {
                            let raw = rx_buf.split().to_vec();
                            state = pending.resolve(state, WaitEvent::ReplyArrived(Reply::parse(raw)));
                        }
                    }
                    Err(e) => return Err(e.into()),
                },
                _ = sleep_until(deadline) => {
                    state = pending.resolve(state, WaitEvent::DeadlineElapsed);
                }
                _ = shutdown_rx.changed() => {
                    debug!("shutdown signal during wait");
                    state = pending.resolve(state, WaitEvent::DeadlineElapsed);
                }
            }
        }
    }
}
