//! The driver: one event loop wiring the socket and user commands to the
//! session.
//!
//! Inbound frames are processed to completion, in arrival order, before the
//! next is read; user commands interleave at frame boundaries only. All
//! session state is therefore mutated from a single task and no lock
//! discipline is needed.
//!
//! Connection loss is never an error here: it feeds the link's reconnect
//! schedule, the driver sleeps out the delay (staying responsive to
//! commands), and redials. Only logout ends the loop.

use std::time::Instant;

use chrono::Utc;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use haven_core::{Environment, Link, LinkAction, LinkConfig};
use haven_proto::{ClientFrame, MessageKind, ServerFrame, UserId};
use haven_session::{Session, SessionAction, SessionEvent};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

use crate::{
    RuntimeConfig,
    collab::{BlobStore, Presenter, SessionStore},
    error::ClientError,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// User commands accepted by a running driver.
#[derive(Debug, Clone)]
pub enum Command {
    /// Select a conversation partner.
    Select(UserId),
    /// Send a text message to the selected peer.
    SendText {
        /// Message body.
        body: String,
    },
    /// Send a media message whose blob is already uploaded.
    SendMedia {
        /// `image`, `file`, or `voice`.
        kind: MessageKind,
        /// Public blob reference.
        file_url: String,
        /// Display name.
        name: String,
    },
    /// End the session: clear persisted credentials and stop reconnecting.
    Logout,
}

/// Handle for issuing user commands to a running driver.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    commands: mpsc::Sender<Command>,
}

/// Create the command channel shared by a [`ClientHandle`] and a driver.
pub fn command_channel(capacity: usize) -> (ClientHandle, mpsc::Receiver<Command>) {
    let (tx, rx) = mpsc::channel(capacity);
    (ClientHandle { commands: tx }, rx)
}

impl ClientHandle {
    /// Select a conversation partner.
    pub async fn select(&self, peer: UserId) -> Result<(), ClientError> {
        self.send(Command::Select(peer)).await
    }

    /// Send a text message to the selected peer.
    pub async fn send_text(&self, body: impl Into<String>) -> Result<(), ClientError> {
        self.send(Command::SendText { body: body.into() }).await
    }

    /// Send a media message with a pre-obtained blob reference.
    pub async fn send_media(
        &self,
        kind: MessageKind,
        name: impl Into<String>,
        file_url: impl Into<String>,
    ) -> Result<(), ClientError> {
        self.send(Command::SendMedia { kind, file_url: file_url.into(), name: name.into() }).await
    }

    /// Upload a blob and send it as a media message.
    pub async fn send_blob<B: BlobStore>(
        &self,
        blobs: &B,
        kind: MessageKind,
        path: &str,
        name: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Result<(), ClientError> {
        let file_url = blobs.upload(path, bytes).await?;
        self.send_media(kind, name, file_url).await
    }

    /// End the session.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.send(Command::Logout).await
    }

    async fn send(&self, command: Command) -> Result<(), ClientError> {
        self.commands.send(command).await.map_err(|_| ClientError::DriverStopped)
    }
}

/// Production event loop around one [`Session`].
pub struct Driver<E, P, S>
where
    E: Environment,
    P: Presenter,
    S: SessionStore,
{
    env: E,
    config: RuntimeConfig,
    session: Session,
    link: Link,
    presenter: P,
    session_store: S,
}

impl<E, P, S> Driver<E, P, S>
where
    E: Environment,
    P: Presenter,
    S: SessionStore,
{
    /// Create a driver for the given session.
    pub fn new(
        env: E,
        config: RuntimeConfig,
        session: Session,
        presenter: P,
        session_store: S,
    ) -> Self {
        let link = Link::new(LinkConfig { reconnect_delay: config.reconnect_delay });
        Self { env, config, session, link, presenter, session_store }
    }

    /// Run until logout.
    ///
    /// Dials the relay, authenticates, processes frames and commands, and
    /// redials after every loss. Returns `Ok(())` when the user logs out
    /// (or every [`ClientHandle`] is dropped, which is treated the same).
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) -> Result<(), ClientError> {
        loop {
            if self.link.is_shut_down() {
                return Ok(());
            }
            self.link.dial_started()?;

            match connect_async(self.config.relay_url.as_str()).await {
                Ok((socket, _response)) => {
                    tracing::info!(url = %self.config.relay_url, "connected to relay");
                    let (mut sink, mut source) = socket.split();

                    let link_actions = self.link.opened()?;
                    for action in link_actions {
                        if action == LinkAction::Authenticate {
                            let frame = self.session.auth_frame();
                            transmit(&mut sink, &frame).await;
                        }
                    }
                    let opened = self.session.handle(SessionEvent::LinkOpened);
                    if !self.execute(opened, Some(&mut sink)).await {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(());
                    }

                    if !self.connection_loop(&mut commands, &mut sink, &mut source).await {
                        let _ = sink.send(Message::Close(None)).await;
                        return Ok(());
                    }
                },
                Err(error) => {
                    tracing::warn!(%error, "dial failed");
                },
            }

            // Loss path: suppress sends, schedule the retry, sleep it out.
            let closed = self.session.handle(SessionEvent::LinkClosed);
            let _ = self.execute(closed, None).await;

            for action in self.link.lost(self.env.now()) {
                if let LinkAction::ScheduleRetry { at } = action {
                    tracing::info!(
                        delay_ms = self.config.reconnect_delay.as_millis() as u64,
                        "reconnecting after delay"
                    );
                    if !self.wait_for_retry(&mut commands, at).await {
                        return Ok(());
                    }
                }
            }

            let due = self.link.tick(self.env.now());
            if !due.contains(&LinkAction::Dial) {
                // Shut down while waiting; nothing left to do.
                return Ok(());
            }
        }
    }

    /// Process inbound frames and user commands until the connection drops.
    ///
    /// Returns `true` if the connection was lost (caller redials) and
    /// `false` on logout.
    async fn connection_loop(
        &mut self,
        commands: &mut mpsc::Receiver<Command>,
        sink: &mut WsSink,
        source: &mut WsSource,
    ) -> bool {
        loop {
            tokio::select! {
                inbound = source.next() => match inbound {
                    Some(Ok(Message::Text(text))) => {
                        match ServerFrame::decode(text.as_str()) {
                            Ok(frame) => {
                                let actions = self.session.handle(SessionEvent::Frame(frame));
                                if !self.execute(actions, Some(sink)).await {
                                    return false;
                                }
                            },
                            Err(error) => {
                                // Malformed frames are discarded without
                                // touching connection state.
                                tracing::debug!(%error, "discarding malformed frame");
                            },
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!("relay closed the connection");
                        return true;
                    },
                    Some(Ok(_)) => {
                        // Ping/pong/binary: nothing for the session.
                    },
                    Some(Err(error)) => {
                        tracing::warn!(%error, "transport error");
                        return true;
                    },
                },
                command = commands.recv() => match command {
                    Some(command) => {
                        let event = command_event(command);
                        let actions = self.session.handle(event);
                        if !self.execute(actions, Some(sink)).await {
                            return false;
                        }
                    },
                    None => {
                        // Every handle is gone; end the session cleanly.
                        let actions = self.session.handle(SessionEvent::Logout);
                        let _ = self.execute(actions, Some(sink)).await;
                        return false;
                    },
                },
            }
        }
    }

    /// Sleep until the scheduled retry, staying responsive to commands.
    ///
    /// Returns `false` if the user logged out while waiting.
    async fn wait_for_retry(
        &mut self,
        commands: &mut mpsc::Receiver<Command>,
        at: Instant,
    ) -> bool {
        loop {
            let now = self.env.now();
            if now >= at {
                return true;
            }
            let env = self.env.clone();

            tokio::select! {
                () = env.sleep(at - now) => return true,
                command = commands.recv() => match command {
                    Some(command) => {
                        let event = command_event(command);
                        let actions = self.session.handle(event);
                        if !self.execute(actions, None).await {
                            return false;
                        }
                    },
                    None => {
                        let actions = self.session.handle(SessionEvent::Logout);
                        let _ = self.execute(actions, None).await;
                        return false;
                    },
                },
            }
        }
    }

    /// Execute session actions in order.
    ///
    /// Returns `false` once the link has been shut down (logout).
    async fn execute(&mut self, actions: Vec<SessionAction>, mut sink: Option<&mut WsSink>) -> bool {
        let mut keep_running = true;

        for action in actions {
            match action {
                SessionAction::Send(frame) => {
                    // Sends on a closed link are dropped, not queued.
                    match sink.as_mut() {
                        Some(sink) if self.link.is_open() => transmit(sink, &frame).await,
                        _ => tracing::debug!("link not open; dropping outbound frame"),
                    }
                },
                SessionAction::Render(scope) => {
                    self.presenter.render(&scope, self.session.store());
                },
                SessionAction::PlayNotification => self.presenter.play_notification(),
                SessionAction::ClearCredentials => {
                    if let Err(error) = self.session_store.clear().await {
                        tracing::warn!(%error, "failed to clear persisted session");
                    }
                },
                SessionAction::CloseLink => {
                    self.link.shutdown();
                    keep_running = false;
                },
            }
        }

        keep_running
    }
}

/// Map a user command to a session event, stamping send time.
fn command_event(command: Command) -> SessionEvent {
    match command {
        Command::Select(peer) => SessionEvent::Select(peer),
        Command::SendText { body } => SessionEvent::SendText { body, sent_at: Utc::now() },
        Command::SendMedia { kind, file_url, name } => {
            SessionEvent::SendMedia { kind, file_url, name, sent_at: Utc::now() }
        },
        Command::Logout => SessionEvent::Logout,
    }
}

/// Encode and transmit one frame, logging failures.
///
/// Transmit errors are a precursor to the close notification and never
/// propagate; the reconnect schedule handles the rest.
async fn transmit<W>(sink: &mut W, frame: &ClientFrame)
where
    W: futures_util::Sink<Message> + Unpin,
    W::Error: std::fmt::Display,
{
    match frame.encode() {
        Ok(text) => {
            if let Err(error) = sink.send(Message::Text(text.into())).await {
                tracing::warn!(%error, "transmit failed");
            }
        },
        Err(error) => tracing::warn!(%error, "frame encoding failed"),
    }
}
