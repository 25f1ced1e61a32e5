use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::channel::{Channel, ChannelError, Connector};
use crate::job::JobRequest;
use crate::protocol::ProgressEvent;
use crate::session::{Prompt, SessionState};

/// What the reader task observed on a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Message(ProgressEvent),
    Failed(String),
    Closed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub session_id: Uuid,
    pub event: ChannelEvent,
}

struct ActiveChannel {
    session_id: Uuid,
    close_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owns at most one open channel and the task reading from it.
pub struct ChannelManager<C: Connector> {
    connector: Arc<C>,
    endpoint: String,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    active: Option<ActiveChannel>,
}

impl<C: Connector> ChannelManager<C> {
    pub fn new(
        connector: C,
        endpoint: impl Into<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionUpdate>) {
        let (updates, rx) = mpsc::unbounded_channel();
        let manager = Self {
            connector: Arc::new(connector),
            endpoint: endpoint.into(),
            updates,
            active: None,
        };
        (manager, rx)
    }

    pub fn active_session(&self) -> Option<Uuid> {
        self.active.as_ref().map(|active| active.session_id)
    }

    /// Closes any previous channel, then opens a new one and sends `payload`
    /// once it is connected.
    pub async fn open(&mut self, session_id: Uuid, payload: String) {
        self.teardown().await;

        let (close_tx, close_rx) = oneshot::channel();
        let task = tokio::spawn(drive(
            Arc::clone(&self.connector),
            self.endpoint.clone(),
            payload,
            session_id,
            self.updates.clone(),
            close_rx,
        ));

        self.active = Some(ActiveChannel {
            session_id,
            close_tx,
            task,
        });
    }

    /// Closes the current channel and waits for its reader to stop.
    pub async fn teardown(&mut self) {
        if let Some(task) = self.release() {
            if let Err(e) = task.await {
                error!("Channel reader task failed: {}", e);
            }
        }
    }

    fn release(&mut self) -> Option<JoinHandle<()>> {
        let active = self.active.take()?;
        debug!("Closing channel for session {}", active.session_id);
        // The reader may already be gone if the peer hung up.
        let _ = active.close_tx.send(());
        Some(active.task)
    }
}

impl<C: Connector> Drop for ChannelManager<C> {
    fn drop(&mut self) {
        // The reader closes its channel on its own once signalled.
        let _ = self.release();
    }
}

async fn drive<C: Connector>(
    connector: Arc<C>,
    endpoint: String,
    payload: String,
    session_id: Uuid,
    updates: mpsc::UnboundedSender<SessionUpdate>,
    mut close_rx: oneshot::Receiver<()>,
) {
    let emit = |event: ChannelEvent| {
        let _ = updates.send(SessionUpdate { session_id, event });
    };

    let opened = tokio::select! {
        _ = &mut close_rx => return,
        opened = connector.open(&endpoint) => opened,
    };

    let mut channel = match opened {
        Ok(channel) => channel,
        Err(e) => {
            warn!("Could not open channel: {}", e);
            emit(ChannelEvent::Failed(e.to_string()));
            return;
        }
    };

    if let Err(e) = channel.send_text(payload).await {
        warn!("Could not send job request: {}", e);
        emit(ChannelEvent::Failed(e.to_string()));
        channel.close().await;
        return;
    }
    info!("Job request sent for session {}", session_id);

    loop {
        tokio::select! {
            _ = &mut close_rx => break,
            frame = channel.recv_text() => match frame {
                Some(Ok(text)) => match ProgressEvent::decode(&text) {
                    Ok(Some(event)) => emit(ChannelEvent::Message(event)),
                    Ok(None) => debug!("Ignoring unrecognised message: {}", text),
                    Err(e) => warn!("Ignoring malformed message ({}): {}", e, text),
                },
                Some(Err(e)) => {
                    warn!("Channel error: {}", e);
                    emit(ChannelEvent::Failed(e.to_string()));
                    break;
                }
                None => {
                    emit(ChannelEvent::Closed);
                    break;
                }
            }
        }
    }

    channel.close().await;
}

/// Result of folding one channel notification into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStep {
    Updated { prompt: Option<Prompt> },
    ChannelClosed,
}

/// A session owner: the state machine plus the channel feeding it.
pub struct JobSession<C: Connector> {
    channels: ChannelManager<C>,
    updates: mpsc::UnboundedReceiver<SessionUpdate>,
    state: SessionState,
    // Set once the reader reported its last event for the current session.
    stream_ended: bool,
}

impl<C: Connector> JobSession<C> {
    pub fn new(connector: C, endpoint: impl Into<String>) -> Self {
        let (channels, updates) = ChannelManager::new(connector, endpoint);
        Self {
            channels,
            updates,
            state: SessionState::new(),
            stream_ended: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Supersedes any running session and starts a new one.
    pub async fn submit(&mut self, request: &JobRequest) -> Result<Uuid, ChannelError> {
        let payload = request.encode()?;

        self.channels.teardown().await;
        self.discard_pending();

        let session_id = Uuid::new_v4();
        self.state.begin(session_id);
        self.stream_ended = false;
        info!(
            "Submitting {} -> {} (session {})",
            request.resource_locator, request.target_language, session_id
        );

        self.channels.open(session_id, payload).await;
        Ok(session_id)
    }

    /// Drops the channel and returns to `Idle`.
    pub async fn reset(&mut self) {
        self.channels.teardown().await;
        self.discard_pending();
        self.state.reset();
        self.stream_ended = false;
    }

    /// Waits for the next notification belonging to the current session.
    /// Returns `None` when there is no session to wait on, including once
    /// its channel has failed or been closed by the server.
    pub async fn next_step(&mut self) -> Option<SessionStep> {
        let current = self.state.id?;
        self.channels.active_session()?;
        if self.stream_ended {
            return None;
        }

        while let Some(update) = self.updates.recv().await {
            if update.session_id != current {
                debug!("Dropping update for superseded session {}", update.session_id);
                continue;
            }
            return Some(self.apply(update.event));
        }
        None
    }

    /// Applies an update if it belongs to the current session.
    pub fn handle(&mut self, update: SessionUpdate) -> Option<SessionStep> {
        if self.state.id != Some(update.session_id) {
            return None;
        }
        Some(self.apply(update.event))
    }

    fn apply(&mut self, event: ChannelEvent) -> SessionStep {
        match event {
            ChannelEvent::Message(event) => SessionStep::Updated {
                prompt: self.state.apply(event),
            },
            ChannelEvent::Failed(reason) => {
                debug!("Connection failure: {}", reason);
                self.stream_ended = true;
                self.state.connection_failed();
                SessionStep::Updated { prompt: None }
            }
            ChannelEvent::Closed => {
                self.stream_ended = true;
                SessionStep::ChannelClosed
            }
        }
    }

    fn discard_pending(&mut self) {
        while self.updates.try_recv().is_ok() {}
    }
}
