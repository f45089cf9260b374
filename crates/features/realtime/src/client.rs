//! The reconnecting client.
//!
//! One spawned task owns each live connection and selects over the outbound
//! channel and the inbound frame stream. Everything else lives in [`State`]
//! behind a single mutex that is never held across an `.await` or while
//! listeners run.
//!
//! Every connect or disconnect bumps `generation`; connection and timer tasks
//! carry the generation they were started with and go quiet once it is stale.

use crate::credentials::CredentialStore;
use crate::error::RealtimeError;
use crate::events::{
    ConnectionInfo, Connected, DisconnectInfo, DisconnectReason, Disconnected, FailureReason, MessageRead,
    NewMessage, Notification, ReconnectFailed, ReconnectFailure, TransportError, UserOffline, UserOnline,
    UserTyping,
};
use crate::frame::{InboundFrame, OutboundFrame};
use crate::policy::ReconnectPolicy;
use crate::transport::Transport;
use bazaar_event_bus::{EventBus, ListenerId, Subscription, Topic};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use private::Sealed;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

/// How long a closed connection may keep flushing before its task is aborted.
pub const FLUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// What [`RealtimeClient::send`] did with a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Handed to the open connection.
    Sent,
    /// Held in the offline queue until the next successful connect.
    Queued,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub reconnect_attempts: u32,
    pub queue_length: usize,
}

#[derive(Debug)]
struct Link {
    outbound: mpsc::UnboundedSender<String>,
    open: bool,
    task: JoinHandle<()>,
}

impl Link {
    /// Closes the outbound channel and aborts the task if it is still
    /// writing after [`FLUSH_TIMEOUT`].
    fn close(self) {
        let Self { outbound, task, .. } = self;
        drop(outbound);

        let abort = task.abort_handle();
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    if tokio::time::timeout(FLUSH_TIMEOUT, task).await.is_err() {
                        warn!(timeout = ?FLUSH_TIMEOUT, "Realtime connection did not flush in time, aborting");
                        abort.abort();
                    }
                });
            },
            Err(_) => abort.abort(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    user_id: Option<String>,
    link: Option<Link>,
    queue: VecDeque<String>,
    attempts: u32,
    timer: Option<JoinHandle<()>>,
    generation: u64,
}

#[derive(Debug)]
struct Inner<T, C> {
    endpoint: Url,
    transport: T,
    credentials: C,
    events: EventBus,
    policy: ReconnectPolicy,
    state: Mutex<State>,
}

/// Maintains one logical connection to the realtime server.
///
/// Cloning is cheap and clones drive the same connection. Operations that
/// start background work ([`connect`](Self::connect) and the reconnect loop)
/// must run inside a Tokio runtime.
///
/// ```rust,ignore
/// let client = RealtimeClient::builder()
///     .endpoint("wss://bazaar.rw/ws")
///     .transport(WebSocketTransport)
///     .credentials(MemoryCredentials::new(Some(token.clone())))
///     .events(bus.clone())
///     .build()?;
///
/// let _sub = client.on::<NewMessage>(|m| tracing::info!(from = %m.sender_id, "{}", m.content));
/// client.connect("u-1", &token)?;
/// client.send_message("c-9", "Is the bike still available?")?;
/// ```
#[derive(Debug)]
pub struct RealtimeClient<T, C> {
    inner: Arc<Inner<T, C>>,
}

impl<T, C> Clone for RealtimeClient<T, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl RealtimeClient<(), ()> {
    #[must_use = "The client is not created until you call .build()"]
    pub fn builder() -> RealtimeClientBuilder {
        RealtimeClientBuilder {
            endpoint: NoEndpoint,
            transport: NoTransport,
            credentials: NoCredentials,
            events: None,
            policy: ReconnectPolicy::default(),
        }
    }
}

impl<T: Transport, C: CredentialStore> RealtimeClient<T, C> {
    /// Opens the connection for `user_id`.
    ///
    /// Does nothing if a connection is already open or opening. Otherwise any
    /// pending reconnect timer is cancelled and the attempt counter starts over.
    ///
    /// # Errors
    /// Returns [`RealtimeError::InvalidEndpoint`] if the connection URL cannot be built.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime.
    pub fn connect(&self, user_id: &str, token: &str) -> Result<(), RealtimeError> {
        let url = connection_url(&self.inner.endpoint, user_id, token)?;

        {
            let mut state = self.inner.state.lock();
            if state.link.is_some() {
                debug!(user_id, "Realtime connection already open or opening");
                return Ok(());
            }
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.generation += 1;
            state.attempts = 0;
            state.user_id = Some(user_id.to_owned());
            self.inner.start_link(&mut state, url);
        }

        info!(user_id, endpoint = %self.inner.endpoint, "Opening realtime connection");
        Ok(())
    }

    /// Closes the connection and stops reconnecting.
    ///
    /// Frames already handed to the connection are flushed before it closes;
    /// a connection still writing after [`FLUSH_TIMEOUT`] is aborted.
    /// The offline queue is kept for the next [`connect`](Self::connect).
    /// Emits [`Disconnected`] with [`DisconnectReason::Client`] and returns
    /// `true` when there was a connection or a pending reconnect to stop.
    pub fn disconnect(&self) -> bool {
        let (link, timer) = {
            let mut state = self.inner.state.lock();
            state.generation += 1;
            state.attempts = 0;
            (state.link.take(), state.timer.take())
        };

        let stopped = link.is_some() || timer.is_some();
        if let Some(timer) = timer {
            timer.abort();
        }
        if let Some(link) = link {
            link.close();
        }

        if stopped {
            info!("Realtime client disconnected");
            self.inner.events.emit::<Disconnected>(DisconnectInfo { reason: DisconnectReason::Client });
        }
        stopped
    }

    /// Sends `frame` now if connected; otherwise queues it.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Serialization`] if the frame cannot be encoded.
    /// Nothing is queued in that case.
    pub fn send(&self, frame: &OutboundFrame) -> Result<Delivery, RealtimeError> {
        let text = frame.encode()?;
        let delivery = self.inner.enqueue(text);
        if delivery == Delivery::Queued {
            debug!(kind = frame.kind(), "Realtime client offline, frame queued");
        }
        Ok(delivery)
    }

    /// `SEND_MESSAGE`
    pub fn send_message(&self, conversation_id: &str, message: &str) -> Result<Delivery, RealtimeError> {
        self.send(&OutboundFrame::SendMessage {
            conversation_id: conversation_id.to_owned(),
            message: message.to_owned(),
        })
    }

    /// `MARK_AS_READ`
    pub fn mark_as_read(&self, message_id: &str) -> Result<Delivery, RealtimeError> {
        self.send(&OutboundFrame::MarkAsRead { message_id: message_id.to_owned() })
    }

    /// `TYPING`
    pub fn send_typing_indicator(&self, conversation_id: &str, is_typing: bool) -> Result<Delivery, RealtimeError> {
        self.send(&OutboundFrame::Typing { conversation_id: conversation_id.to_owned(), is_typing })
    }

    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        let state = self.inner.state.lock();
        ConnectionStatus {
            is_connected: state.link.as_ref().is_some_and(|l| l.open),
            reconnect_attempts: state.attempts,
            queue_length: state.queue.len(),
        }
    }
}

impl<T, C> RealtimeClient<T, C> {
    pub fn on<K: Topic>(&self, callback: impl Fn(&K::Payload) + Send + Sync + 'static) -> Subscription {
        self.inner.events.on::<K>(callback)
    }

    pub fn off<K: Topic>(&self, id: ListenerId) -> bool {
        self.inner.events.off::<K>(id)
    }

    /// The bus this client publishes on.
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    #[must_use]
    pub fn policy(&self) -> ReconnectPolicy {
        self.inner.policy
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CloseOutcome {
    Stale,
    Retry { attempt: u32, delay: Duration },
    Exhausted { attempts: u32 },
}

impl CloseOutcome {
    /// Next step after the current connection closed with `attempts` retries spent.
    fn after(policy: &ReconnectPolicy, attempts: u32) -> Self {
        let attempt = attempts.saturating_add(1);
        match policy.delay_for(attempt) {
            Some(delay) => Self::Retry { attempt, delay },
            None => Self::Exhausted { attempts },
        }
    }
}

impl<T: Transport, C: CredentialStore> Inner<T, C> {
    /// Spawns the connection task for the current generation. Called with the
    /// state lock held so the task never observes a missing link.
    fn start_link(self: &Arc<Self>, state: &mut State, url: Url) {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(Arc::clone(self).run_link(state.generation, url, rx));
        state.link = Some(Link { outbound: tx, open: false, task });
    }

    async fn run_link(self: Arc<Self>, generation: u64, url: Url, mut outbound: mpsc::UnboundedReceiver<String>) {
        let (mut sink, mut stream) = match self.transport.open(&url).await {
            Ok(pair) => pair,
            Err(err) => {
                warn!(error = %err, "Realtime connection failed to open");
                self.report(generation, err);
                self.on_close(generation, Vec::new());
                return;
            },
        };

        if !self.on_open(generation) {
            let _ = sink.close().await;
            return;
        }

        let mut unsent = Vec::new();
        loop {
            tokio::select! {
                next = outbound.recv() => match next {
                    Some(text) => {
                        if let Err(err) = sink.send(text.clone()).await {
                            warn!(error = %err, "Realtime write failed");
                            unsent.push(text);
                            self.report(generation, err);
                            break;
                        }
                    },
                    None => {
                        if let Err(err) = sink.close().await {
                            debug!(error = %err, "Realtime close handshake failed");
                        }
                        break;
                    },
                },
                frame = stream.next() => match frame {
                    Some(Ok(text)) => self.dispatch(generation, &text),
                    Some(Err(err)) => {
                        warn!(error = %err, "Realtime transport error");
                        self.report(generation, err);
                    },
                    None => break,
                },
            }
        }

        drain_unsent(&mut outbound, &mut unsent);
        drop(stream);
        self.on_close(generation, unsent);
    }

    fn enqueue(&self, text: String) -> Delivery {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        if let Some(link) = state.link.as_ref().filter(|l| l.open) {
            match link.outbound.send(text) {
                Ok(()) => return Delivery::Sent,
                Err(mpsc::error::SendError(text)) => state.queue.push_back(text),
            }
        } else {
            state.queue.push_back(text);
        }
        Delivery::Queued
    }

    /// Marks the link open and flushes the queue ahead of any later send.
    fn on_open(&self, generation: u64) -> bool {
        let (user_id, flushed) = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            if state.generation != generation {
                return false;
            }
            let Some(link) = state.link.as_mut() else {
                return false;
            };

            link.open = true;
            state.attempts = 0;
            let flushed = state.queue.len();
            for text in state.queue.drain(..) {
                // The receiver is alive: this task holds it.
                let _ = link.outbound.send(text);
            }
            (state.user_id.clone().unwrap_or_default(), flushed)
        };

        info!(user_id = %user_id, flushed, "Realtime connection established");
        self.events.emit::<Connected>(ConnectionInfo { user_id });
        true
    }

    fn on_close(self: &Arc<Self>, generation: u64, unsent: Vec<String>) {
        let outcome = {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            if state.generation == generation {
                requeue(&mut state.queue, unsent);
                state.link = None;
                let outcome = CloseOutcome::after(&self.policy, state.attempts);
                if let CloseOutcome::Retry { attempt, .. } = outcome {
                    state.attempts = attempt;
                }
                outcome
            } else {
                // A newer connection that is already open has flushed the
                // queue; frames left there would wait for the next open.
                match state.link.as_ref().filter(|l| l.open) {
                    Some(link) => {
                        for text in unsent {
                            if let Err(mpsc::error::SendError(text)) = link.outbound.send(text) {
                                state.queue.push_back(text);
                            }
                        }
                    },
                    None => requeue(&mut state.queue, unsent),
                }
                CloseOutcome::Stale
            }
        };

        match outcome {
            CloseOutcome::Stale => debug!(generation, "Stale realtime connection closed"),
            CloseOutcome::Retry { attempt, delay } => {
                info!(attempt, max = self.policy.max_attempts, ?delay, "Realtime connection closed, reconnecting");
                self.events.emit::<Disconnected>(DisconnectInfo { reason: DisconnectReason::Closed });
                self.schedule(generation, delay);
            },
            CloseOutcome::Exhausted { attempts } => {
                warn!(attempts, "Max reconnection attempts reached");
                self.events.emit::<Disconnected>(DisconnectInfo { reason: DisconnectReason::Closed });
                self.events.emit::<ReconnectFailed>(ReconnectFailure { attempts, reason: FailureReason::Exhausted });
            },
        }
    }

    fn schedule(self: &Arc<Self>, generation: u64, delay: Duration) {
        let mut state = self.state.lock();
        if state.generation != generation || state.link.is_some() {
            return;
        }
        let inner = Arc::clone(self);
        if let Some(previous) = state.timer.replace(tokio::spawn(inner.reconnect_after(generation, delay))) {
            previous.abort();
        }
    }

    async fn reconnect_after(self: Arc<Self>, generation: u64, delay: Duration) {
        tokio::time::sleep(delay).await;

        if self.state.lock().generation != generation {
            return;
        }

        let token = match self.credentials.load_token().await {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(err) => {
                warn!(error = %err, "Failed to load token for reconnection");
                None
            },
        };

        let opened = {
            let mut state = self.state.lock();
            if state.generation != generation || state.link.is_some() {
                return;
            }
            state.timer = None;

            let user_id = state.user_id.clone().unwrap_or_default();
            match token {
                Some(token) => match connection_url(&self.endpoint, &user_id, &token) {
                    Ok(url) => {
                        self.start_link(&mut state, url);
                        Ok(state.attempts)
                    },
                    Err(err) => Err((state.attempts, Some(err))),
                },
                None => Err((state.attempts, None)),
            }
        };

        match opened {
            Ok(attempt) => info!(attempt, max = self.policy.max_attempts, "Attempting to reconnect"),
            Err((attempts, err)) => {
                if let Some(err) = err {
                    warn!(error = %err, "Reconnection URL rejected");
                } else {
                    warn!("No token available for reconnection");
                }
                self.events.emit::<ReconnectFailed>(ReconnectFailure { attempts, reason: FailureReason::MissingToken });
            },
        }
    }

    fn report(&self, generation: u64, err: RealtimeError) {
        if self.state.lock().generation == generation {
            self.events.emit::<TransportError>(err);
        }
    }

    fn dispatch(&self, generation: u64, text: &str) {
        if self.state.lock().generation != generation {
            return;
        }

        let frame = match InboundFrame::decode(text) {
            Ok(frame) => frame,
            Err(err) => {
                warn!(error = %err, "Dropping malformed realtime frame");
                return;
            },
        };

        match frame {
            InboundFrame::NewMessage(message) => {
                self.events.emit::<NewMessage>(message);
            },
            InboundFrame::MessageRead(receipt) => {
                self.events.emit::<MessageRead>(receipt);
            },
            InboundFrame::UserTyping(typing) => {
                self.events.emit::<UserTyping>(typing);
            },
            InboundFrame::UserOnline(presence) => {
                self.events.emit::<UserOnline>(presence);
            },
            InboundFrame::UserOffline(presence) => {
                self.events.emit::<UserOffline>(presence);
            },
            InboundFrame::Notification(notification) => {
                self.events.emit::<Notification>(notification);
            },
            InboundFrame::Unknown(kind) => debug!(kind, "Unknown realtime message type"),
        }
    }
}

/// Puts frames a closed link never wrote back at the head of the queue, in order.
fn requeue(queue: &mut VecDeque<String>, unsent: Vec<String>) {
    for text in unsent.into_iter().rev() {
        queue.push_front(text);
    }
}

/// Collects frames that were handed to a link but never written.
fn drain_unsent(outbound: &mut mpsc::UnboundedReceiver<String>, unsent: &mut Vec<String>) {
    outbound.close();
    while let Ok(text) = outbound.try_recv() {
        unsent.push(text);
    }
}

fn connection_url(endpoint: &Url, user_id: &str, token: &str) -> Result<Url, RealtimeError> {
    if user_id.trim().is_empty() {
        return Err(RealtimeError::InvalidEndpoint {
            message: "user id must not be empty".into(),
            context: Some(endpoint.to_string().into()),
        });
    }
    let mut url = endpoint.clone();
    url.query_pairs_mut().append_pair("userId", user_id).append_pair("token", token);
    Ok(url)
}

fn parse_endpoint(raw: &str) -> Result<Url, RealtimeError> {
    let url = Url::parse(raw).map_err(|e| RealtimeError::InvalidEndpoint {
        message: e.to_string().into(),
        context: Some(raw.to_owned().into()),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(RealtimeError::InvalidEndpoint {
            message: format!("unsupported scheme '{other}', expected ws or wss").into(),
            context: Some(raw.to_owned().into()),
        }),
    }
}

// --- Builder ---

#[derive(Debug, Default)]
pub struct NoEndpoint;
#[derive(Debug)]
pub struct WithEndpoint(String);
#[derive(Debug, Default)]
pub struct NoTransport;
#[derive(Debug)]
pub struct WithTransport<T>(T);
#[derive(Debug, Default)]
pub struct NoCredentials;
#[derive(Debug)]
pub struct WithCredentials<C>(C);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoEndpoint {}
impl Sealed for WithEndpoint {}
impl Sealed for NoTransport {}
impl<T> Sealed for WithTransport<T> {}
impl Sealed for NoCredentials {}
impl<C> Sealed for WithCredentials<C> {}

/// Typestate builder for [`RealtimeClient`]; endpoint, transport, and credentials are required.
#[derive(Debug)]
pub struct RealtimeClientBuilder<E: Sealed = NoEndpoint, T: Sealed = NoTransport, C: Sealed = NoCredentials> {
    endpoint: E,
    transport: T,
    credentials: C,
    events: Option<EventBus>,
    policy: ReconnectPolicy,
}

impl<E: Sealed, T: Sealed, C: Sealed> RealtimeClientBuilder<E, T, C> {
    /// Publishes on `events` instead of a private bus.
    #[must_use = "The builder must be configured before it can be used to build the client."]
    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use = "The builder must be configured before it can be used to build the client."]
    pub const fn policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl<T: Sealed, C: Sealed> RealtimeClientBuilder<NoEndpoint, T, C> {
    /// Base `ws://` or `wss://` URL; `userId` and `token` are appended per connection.
    pub fn endpoint(self, url: impl Into<String>) -> RealtimeClientBuilder<WithEndpoint, T, C> {
        RealtimeClientBuilder {
            endpoint: WithEndpoint(url.into()),
            transport: self.transport,
            credentials: self.credentials,
            events: self.events,
            policy: self.policy,
        }
    }
}

impl<E: Sealed, C: Sealed> RealtimeClientBuilder<E, NoTransport, C> {
    pub fn transport<X: Transport>(self, transport: X) -> RealtimeClientBuilder<E, WithTransport<X>, C> {
        RealtimeClientBuilder {
            endpoint: self.endpoint,
            transport: WithTransport(transport),
            credentials: self.credentials,
            events: self.events,
            policy: self.policy,
        }
    }
}

impl<E: Sealed, T: Sealed> RealtimeClientBuilder<E, T, NoCredentials> {
    pub fn credentials<Y: CredentialStore>(self, credentials: Y) -> RealtimeClientBuilder<E, T, WithCredentials<Y>> {
        RealtimeClientBuilder {
            endpoint: self.endpoint,
            transport: self.transport,
            credentials: WithCredentials(credentials),
            events: self.events,
            policy: self.policy,
        }
    }
}

impl<X: Transport, Y: CredentialStore> RealtimeClientBuilder<WithEndpoint, WithTransport<X>, WithCredentials<Y>> {
    /// Validates the endpoint and creates an idle client.
    ///
    /// # Errors
    /// Returns [`RealtimeError::InvalidEndpoint`] unless the endpoint parses as a `ws`/`wss` URL.
    pub fn build(self) -> Result<RealtimeClient<X, Y>, RealtimeError> {
        let endpoint = parse_endpoint(&self.endpoint.0)?;

        Ok(RealtimeClient {
            inner: Arc::new(Inner {
                endpoint,
                transport: self.transport.0,
                credentials: self.credentials.0,
                events: self.events.unwrap_or_default(),
                policy: self.policy,
                state: Mutex::new(State::default()),
            }),
        })
    }
}
