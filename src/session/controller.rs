use std::sync::{Arc, Mutex, MutexGuard};

use futures_util::StreamExt;
use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::metrics::{SESSIONS_STARTED, SESSIONS_TERMINATED, STREAM_DECODE_ERRORS, STREAM_FRAMES};
use crate::stream::{decode_frame, Decoded, Frame, StreamEvent, StreamTransport};

use super::observer::{SessionId, SessionObserver, SessionState, Termination};

/// Published on every state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStatus {
    pub session: SessionId,
    pub state: SessionState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct Inner {
    generation: SessionId,
    state: SessionState,
    pump: Option<JoinHandle<()>>,
    last_termination: Option<(SessionId, Termination)>,
    observers: Vec<Arc<dyn SessionObserver>>,
}

struct Shared {
    label: String,
    inner: Mutex<Inner>,
    status_tx: watch::Sender<SessionStatus>,
}

/// Owns at most one live analysis stream.
///
/// Every delivered frame is tagged with the generation of the session that
/// opened it and compared against the current generation under the session
/// lock, so nothing from a superseded or cancelled session reaches observers.
pub struct SessionController<T: StreamTransport> {
    transport: Arc<T>,
    shared: Arc<Shared>,
}

impl<T: StreamTransport> SessionController<T> {
    pub fn new(label: impl Into<String>, transport: Arc<T>) -> Self {
        let (status_tx, _) = watch::channel(SessionStatus {
            session: 0,
            state: SessionState::Idle,
        });
        Self {
            transport,
            shared: Arc::new(Shared {
                label: label.into(),
                inner: Mutex::new(Inner {
                    generation: 0,
                    state: SessionState::Idle,
                    pump: None,
                    last_termination: None,
                    observers: Vec::new(),
                }),
                status_tx,
            }),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn SessionObserver>) {
        self.shared.lock().observers.push(observer);
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status_tx.subscribe()
    }

    /// Open a new session for `query`, cancelling any live one first.
    /// Must be called from within a tokio runtime.
    pub fn start(&self, query: &str) -> SessionId {
        let mut inner = self.shared.lock();

        if inner.state.is_live() {
            let superseded = inner.generation;
            tracing::info!(
                controller = %self.shared.label,
                session = superseded,
                "Superseding live session"
            );
            self.shared.cancel_locked(&mut inner);
        }

        inner.generation += 1;
        let session = inner.generation;
        inner.state = SessionState::Connecting;
        inner.last_termination = None;
        self.shared.publish(session, SessionState::Connecting);

        for observer in &inner.observers {
            observer.on_started(session, query);
        }

        counter!(SESSIONS_STARTED).increment(1);
        tracing::info!(
            controller = %self.shared.label,
            session,
            query = %query,
            "Session started"
        );

        let shared = Arc::clone(&self.shared);
        let transport = Arc::clone(&self.transport);
        let query = query.to_string();
        inner.pump = Some(tokio::spawn(async move {
            pump(shared, transport, session, query).await;
        }));

        session
    }

    /// Tear down the live transport. No-op unless a session is live.
    pub fn cancel(&self) {
        let mut inner = self.shared.lock();
        if inner.state.is_live() {
            self.shared.cancel_locked(&mut inner);
        }
    }

    /// Wait until `session` has terminated (or been superseded) and return
    /// how it ended, if it is still the controller's latest session.
    pub async fn wait_terminated(&self, session: SessionId) -> Option<Termination> {
        let mut rx = self.status();
        let _ = rx
            .wait_for(|status| {
                status.session > session
                    || (status.session == session && status.state == SessionState::Terminated)
            })
            .await;

        let inner = self.shared.lock();
        match &inner.last_termination {
            Some((id, reason)) if *id == session => Some(reason.clone()),
            _ => None,
        }
    }

    #[cfg(test)]
    fn deliver(&self, session: SessionId, frame: &Frame) {
        let _ = self.shared.handle_frame(session, frame);
    }
}

impl<T: StreamTransport> Drop for SessionController<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, session: SessionId, state: SessionState) {
        self.status_tx.send_replace(SessionStatus { session, state });
    }

    fn cancel_locked(&self, inner: &mut Inner) {
        if let Some(pump) = inner.pump.take() {
            pump.abort();
        }
        let session = inner.generation;
        self.finish_locked(inner, session, Termination::Cancelled);
    }

    fn finish_locked(&self, inner: &mut Inner, session: SessionId, reason: Termination) {
        inner.state = SessionState::Terminated;
        // Detach rather than abort: this may run on the pump task itself.
        inner.pump = None;

        counter!(SESSIONS_TERMINATED, "reason" => reason.as_str()).increment(1);
        match &reason {
            Termination::Completed(_) | Termination::Cancelled => tracing::info!(
                controller = %self.label,
                session,
                reason = reason.as_str(),
                "Session terminated"
            ),
            Termination::Failed(message) => tracing::warn!(
                controller = %self.label,
                session,
                message = %message,
                "Session failed"
            ),
            Termination::ConnectionLost => tracing::warn!(
                controller = %self.label,
                session,
                "Session lost its connection"
            ),
        }

        for observer in &inner.observers {
            observer.on_terminated(session, &reason);
        }
        inner.last_termination = Some((session, reason));
        self.publish(session, SessionState::Terminated);
    }

    /// Terminate `session` unless it is stale or already terminated.
    fn terminate(&self, session: SessionId, reason: Termination) {
        let mut inner = self.lock();
        if inner.generation != session || inner.state == SessionState::Terminated {
            return;
        }
        self.finish_locked(&mut inner, session, reason);
    }

    fn handle_frame(&self, session: SessionId, frame: &Frame) -> Flow {
        let mut inner = self.lock();

        if inner.generation != session || inner.state == SessionState::Terminated {
            tracing::debug!(
                controller = %self.label,
                session,
                current = inner.generation,
                event = %frame.event,
                "Dropping frame from inactive session"
            );
            return Flow::Stop;
        }

        counter!(STREAM_FRAMES).increment(1);

        if inner.state == SessionState::Connecting {
            inner.state = SessionState::Streaming;
            self.publish(session, SessionState::Streaming);
        }

        match decode_frame(frame) {
            Ok(Decoded::Event(event)) => {
                tracing::trace!(session, event = event.name(), "Stream event");
                for observer in &inner.observers {
                    observer.on_event(session, &event);
                }
                if !event.is_terminal() {
                    return Flow::Continue;
                }
                let reason = match event {
                    StreamEvent::Complete(summary) => Termination::Completed(summary),
                    StreamEvent::Failure(report) => Termination::Failed(report.message),
                    StreamEvent::Progress(_) | StreamEvent::ItemResult(_) => return Flow::Continue,
                };
                self.finish_locked(&mut inner, session, reason);
                Flow::Stop
            }
            Ok(Decoded::TransportSignal) => {
                self.finish_locked(&mut inner, session, Termination::ConnectionLost);
                Flow::Stop
            }
            Ok(Decoded::Ignored) => Flow::Continue,
            Err(e) => {
                counter!(STREAM_DECODE_ERRORS).increment(1);
                tracing::warn!(
                    controller = %self.label,
                    session,
                    error = %e,
                    "Skipping undecodable frame"
                );
                Flow::Continue
            }
        }
    }
}

async fn pump<T: StreamTransport>(
    shared: Arc<Shared>,
    transport: Arc<T>,
    session: SessionId,
    query: String,
) {
    let mut frames = match transport.open(&query).await {
        Ok(frames) => frames,
        Err(e) => {
            tracing::error!(controller = %shared.label, session, error = %e, "Failed to open stream");
            shared.terminate(session, Termination::ConnectionLost);
            return;
        }
    };

    while let Some(item) = frames.next().await {
        match item {
            Ok(frame) => {
                if shared.handle_frame(session, &frame) == Flow::Stop {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(controller = %shared.label, session, error = %e, "Stream read error");
                shared.terminate(session, Termination::ConnectionLost);
                return;
            }
        }
    }

    tracing::debug!(controller = %shared.label, session, "Stream ended");
    shared.terminate(session, Termination::ConnectionLost);
}
