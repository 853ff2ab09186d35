//! haven reference client binary.
//!
//! Connects to a relay, authenticates, and reports session activity through
//! the tracing subscriber. The real presentation layer is a host concern;
//! this binary stands in with a logging presenter so the engine can be run
//! and observed end to end.
//!
//! # Usage
//!
//! ```bash
//! haven-client --url ws://127.0.0.1:8000/ws \
//!     --user-id u-alice --username alice --token t0k3n --peer u-bob
//! ```

use clap::Parser;
use haven_client::{
    ClientError, Driver, MemorySessionStore, Presenter, RuntimeConfig, SessionStore, SystemEnv,
    command_channel,
};
use haven_proto::{AuthToken, UserId};
use haven_session::{Credentials, RenderScope, Session, StateStore};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// haven relay client
#[derive(Parser, Debug)]
#[command(name = "haven-client")]
#[command(about = "Reference client for the haven messaging relay")]
#[command(version)]
struct Args {
    /// WebSocket URL of the relay
    #[arg(short, long, default_value = "ws://127.0.0.1:8000/ws")]
    url: String,

    /// Local user identifier
    #[arg(long)]
    user_id: String,

    /// Display name
    #[arg(long)]
    username: String,

    /// Bearer token presented in the handshake
    #[arg(long, default_value = "")]
    token: String,

    /// Peer to select at startup (fetches that conversation's history)
    #[arg(long)]
    peer: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Presenter that reports every surface refresh through tracing.
#[derive(Debug, Default)]
struct LogPresenter;

impl Presenter for LogPresenter {
    fn render(&mut self, scope: &RenderScope, store: &StateStore) {
        match scope {
            RenderScope::Contacts => {
                let online = store.peers().filter(|(_, peer)| peer.online).count();
                let unread: u64 = store.unread_peers().map(|(_, count)| count).sum();
                tracing::info!(peers = store.peers().count(), online, unread, "contacts");
            },
            RenderScope::Conversation(peer_id) => {
                let log = store.conversation(peer_id);
                let latest =
                    log.last().and_then(|entry| entry.message.content.as_deref()).unwrap_or("");
                tracing::info!(peer = %peer_id, entries = log.len(), latest, "conversation");
            },
            RenderScope::PeerHeader(peer_id) => {
                if let Some(peer) = store.peer(peer_id) {
                    tracing::info!(peer = %peer_id, username = %peer.username, online = peer.online, "peer");
                }
            },
        }
    }

    fn play_notification(&mut self) {
        tracing::info!("new message");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!(url = %args.url, "haven client starting");

    let credentials = Credentials {
        user_id: UserId::new(args.user_id),
        username: args.username,
        token: AuthToken::new(args.token),
    };

    let session_store = MemorySessionStore::new();
    session_store.set(&credentials).await?;

    let config = RuntimeConfig::new(args.url);
    let (handle, commands) = command_channel(config.channel_capacity);
    let driver = Driver::new(
        SystemEnv::new(),
        config,
        Session::new(credentials),
        LogPresenter,
        session_store,
    );

    let task = tokio::spawn(driver.run(commands));

    if let Some(peer) = args.peer {
        handle.select(UserId::new(peer)).await?;
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("logging out");

    // The driver may already have stopped if every handle dropped.
    match handle.logout().await {
        Ok(()) | Err(ClientError::DriverStopped) => {},
        Err(error) => return Err(error.into()),
    }
    task.await??;

    Ok(())
}
