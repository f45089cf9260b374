//! # Bazaar Client
//!
//! Wires the realtime client, persistent store, analytics, and event bus into
//! one process. Every component is constructed here and injected; nothing is
//! global.
//!
//! ## Example
//! ```no_run
//! use bazaar_client::App;
//! use bazaar_kernel::domain::config::ClientConfig;
//! use bazaar_realtime::WebSocketTransport;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::start(ClientConfig::default(), WebSocketTransport).await?;
//!     app.login("u-1", Some("token")).await?;
//!     app.run_until(bazaar_client::shutdown_signal()).await
//! }
//! ```

pub mod args;

use crate::args::Outgoing;
use anyhow::{Context, Result, bail};
use bazaar_analytics::{Analytics, BusSink, TracingSink};
use bazaar_event_bus::{EventBus, EventReceiverExt, Subscription};
use bazaar_kernel::config::validate_required;
use bazaar_kernel::domain::config::ClientConfig;
use bazaar_realtime::events::{
    Connected, Disconnected, MessageRead, NewMessage, Notification, ReconnectFailed, ReconnectFailure,
    TransportError, UserOffline, UserOnline, UserTyping,
};
use bazaar_realtime::{
    ConnectionStatus, CredentialStore, RealtimeClient, ReconnectPolicy, StoredCredentials, Transport,
};
use bazaar_storage::Storage;
use std::future::Future;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

type AppAnalytics = Analytics<(TracingSink, BusSink)>;

/// A running client process.
#[derive(Debug)]
pub struct App<T> {
    config: ClientConfig,
    events: EventBus,
    storage: Storage,
    credentials: StoredCredentials,
    realtime: RealtimeClient<T, StoredCredentials>,
    analytics: AppAnalytics,
    failures: broadcast::Receiver<Arc<ReconnectFailure>>,
    subscriptions: Vec<Subscription>,
}

impl<T: Transport> App<T> {
    /// Validates `config`, opens the store, and builds an idle realtime client.
    ///
    /// # Errors
    /// Fails when required settings are missing in production, the data
    /// directory cannot be opened, or the realtime endpoint is invalid.
    pub async fn start(config: ClientConfig, transport: T) -> Result<Self> {
        validate_required(&config).context("Configuration is incomplete")?;

        let storage = Storage::builder()
            .root(&config.storage.data_dir)
            .connect()
            .await
            .with_context(|| format!("Failed to open data directory {}", config.storage.data_dir.display()))?;
        let credentials = StoredCredentials::new(storage.clone());

        let events = EventBus::new();
        let failures = events
            .stream_with_capacity::<ReconnectFailed>(config.realtime.event_capacity)
            .context("Failed to open reconnect event stream")?;

        let realtime = RealtimeClient::builder()
            .endpoint(config.realtime.ws_url.as_str())
            .transport(transport)
            .credentials(credentials.clone())
            .events(events.clone())
            .policy(ReconnectPolicy::from(&config.realtime))
            .build()
            .context("Invalid realtime endpoint")?;

        let analytics = Analytics::new(
            config.analytics.measurement_id.as_str(),
            (TracingSink, BusSink::new(events.clone())),
        );

        let subscriptions = log_events(&realtime);

        info!(
            environment = ?config.environment,
            endpoint = %realtime.endpoint(),
            data_dir = %storage.root().display(),
            analytics = analytics.is_enabled(),
            "Client initialized"
        );

        Ok(Self { config, events, storage, credentials, realtime, analytics, failures, subscriptions })
    }

    /// Queues messages to go out once the connection opens.
    pub fn queue(&self, outgoing: &[Outgoing]) -> Result<()> {
        for message in outgoing {
            let delivery = self
                .realtime
                .send_message(&message.conversation_id, &message.text)
                .context("Failed to encode message")?;
            debug!(conversation_id = %message.conversation_id, ?delivery, "Message submitted");

            if let Err(e) = self.analytics.track_message_sent(&message.conversation_id) {
                warn!(error = %e, "Analytics event dropped");
            }
        }
        Ok(())
    }

    /// Connects as `user_id`.
    ///
    /// A given `token` is persisted first so reconnects can use it; otherwise
    /// the stored token is used.
    ///
    /// # Errors
    /// Fails when no token is available or it cannot be persisted.
    pub async fn login(&self, user_id: &str, token: Option<&str>) -> Result<()> {
        if let Some(token) = token {
            self.credentials.save(token).await.context("Failed to persist token")?;
        }

        let Some(token) = self.credentials.load_token().await.context("Failed to read stored token")? else {
            bail!("No auth token stored; pass --token to sign in");
        };

        self.realtime.connect(user_id, &token).context("Failed to start realtime connection")?;

        self.analytics.set_user_id(Some(user_id));
        if let Err(e) = self.analytics.track_login(None) {
            warn!(error = %e, "Analytics event dropped");
        }
        Ok(())
    }

    /// Runs until `shutdown` resolves or reconnecting gives up, then disconnects.
    ///
    /// # Errors
    /// Returns an error when the connection was lost for good.
    pub async fn run_until(mut self, shutdown: impl Future<Output = Result<()>>) -> Result<()> {
        let outcome = tokio::select! {
            res = shutdown => {
                if let Err(e) = &res {
                    error!("Error while waiting for shutdown signal: {e:#}");
                }
                info!("Shutdown signal received, disconnecting...");
                Ok(())
            },
            failure = self.failures.recv_event() => match failure {
                Some(failure) => Err(anyhow::anyhow!(
                    "Realtime connection lost after {} attempts ({:?})",
                    failure.attempts,
                    failure.reason
                )),
                None => Ok(()),
            },
        };

        self.realtime.disconnect();
        let status = self.realtime.status();
        if status.queue_length > 0 {
            warn!(unsent = status.queue_length, "Exiting with unsent messages");
        }

        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        info!("Client shutdown complete");
        outcome
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        self.realtime.status()
    }

    #[must_use]
    pub const fn realtime(&self) -> &RealtimeClient<T, StoredCredentials> {
        &self.realtime
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }
}

fn log_events<T: Transport>(realtime: &RealtimeClient<T, StoredCredentials>) -> Vec<Subscription> {
    vec![
        realtime.on::<Connected>(|c| info!(user_id = %c.user_id, "Connected")),
        realtime.on::<Disconnected>(|d| info!(reason = ?d.reason, "Disconnected")),
        realtime.on::<TransportError>(|e| warn!(error = %e, "Realtime error")),
        realtime.on::<ReconnectFailed>(|f| {
            error!(attempts = f.attempts, reason = ?f.reason, "Giving up on realtime connection");
        }),
        realtime.on::<NewMessage>(|m| {
            info!(conversation_id = %m.conversation_id, from = %m.sender_id, "{}", m.content);
        }),
        realtime.on::<MessageRead>(|r| debug!(message_id = %r.message_id, "Message read")),
        realtime.on::<UserTyping>(|t| {
            debug!(conversation_id = %t.conversation_id, user_id = %t.user_id, typing = t.is_typing, "Typing");
        }),
        realtime.on::<UserOnline>(|p| info!(user_id = %p.user_id, "User online")),
        realtime.on::<UserOffline>(|p| info!(user_id = %p.user_id, "User offline")),
        realtime.on::<Notification>(|n| {
            info!(kind = n.kind.as_deref().unwrap_or("general"), title = n.title.as_deref(), "{}", n.message);
        }),
    ]
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
///
/// # Errors
/// Returns an error if a signal handler cannot be installed.
pub async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
