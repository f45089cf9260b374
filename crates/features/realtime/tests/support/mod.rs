#![allow(dead_code, unreachable_pub)]

use bazaar_event_bus::{EventBus, EventReceiverExt};
use bazaar_realtime::{
    FrameSink, FrameStream, MemoryCredentials, RealtimeClient, RealtimeError, ReconnectPolicy, Transport,
};
use futures::channel::mpsc as chan;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{Instant, timeout};
use url::Url;

pub const ENDPOINT: &str = "ws://bazaar.test/ws";
pub const WAIT: Duration = Duration::from_secs(120);

pub type TestClient = RealtimeClient<MockTransport, MemoryCredentials>;

/// In-memory transport. Every accepted open hands a [`ServerEnd`] to the paired [`Acceptor`].
#[derive(Debug, Clone)]
pub struct MockTransport {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    refuse: AtomicBool,
    stall: Mutex<Option<Duration>>,
    opens: Mutex<Vec<(Url, Instant)>>,
    accepted: mpsc::UnboundedSender<ServerEnd>,
}

#[derive(Debug)]
pub struct Acceptor {
    rx: mpsc::UnboundedReceiver<ServerEnd>,
}

/// The server side of one connection. Dropping it closes the connection.
#[derive(Debug)]
pub struct ServerEnd {
    sent: chan::UnboundedReceiver<String>,
    push: chan::UnboundedSender<Result<String, RealtimeError>>,
}

impl MockTransport {
    pub fn new() -> (Self, Acceptor) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Shared { refuse: AtomicBool::new(false), stall: Mutex::new(None), opens: Mutex::new(Vec::new()), accepted: tx };
        (Self { shared: Arc::new(shared) }, Acceptor { rx })
    }

    /// Makes every following open fail.
    pub fn refuse(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    /// The next accepted connection blocks every write for `stall`, then fails it.
    pub fn stall_next_writes(&self, stall: Duration) {
        *self.shared.stall.lock() = Some(stall);
    }

    pub fn open_count(&self) -> usize {
        self.shared.opens.lock().len()
    }

    pub fn urls(&self) -> Vec<Url> {
        self.shared.opens.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    pub fn open_times(&self) -> Vec<Instant> {
        self.shared.opens.lock().iter().map(|(_, at)| *at).collect()
    }
}

impl Transport for MockTransport {
    async fn open(&self, url: &Url) -> Result<(FrameSink, FrameStream), RealtimeError> {
        self.shared.opens.lock().push((url.clone(), Instant::now()));

        if self.shared.refuse.load(Ordering::SeqCst) {
            return Err(RealtimeError::Transport { message: "connection refused".into(), context: None });
        }

        let (client_tx, server_rx) = chan::unbounded::<String>();
        let (server_tx, client_rx) = chan::unbounded::<Result<String, RealtimeError>>();

        let sink: FrameSink = match self.shared.stall.lock().take() {
            Some(stall) => Box::pin(futures::sink::unfold((), move |(), _text: String| async move {
                tokio::time::sleep(stall).await;
                Err::<(), _>(RealtimeError::Transport { message: "write timed out".into(), context: None })
            })),
            None => Box::pin(client_tx.sink_map_err(|e| RealtimeError::Transport {
                message: e.to_string().into(),
                context: Some("mock sink".into()),
            })),
        };
        let stream: FrameStream = client_rx.boxed();

        let _ = self.shared.accepted.send(ServerEnd { sent: server_rx, push: server_tx });
        Ok((sink, stream))
    }
}

impl Acceptor {
    pub async fn accept(&mut self) -> ServerEnd {
        timeout(WAIT, self.rx.recv()).await.expect("no connection opened in time").expect("transport dropped")
    }
}

impl ServerEnd {
    pub fn push(&self, text: impl Into<String>) {
        self.push.unbounded_send(Ok(text.into())).expect("client stream gone");
    }

    pub fn push_error(&self, message: &'static str) {
        self.push
            .unbounded_send(Err(RealtimeError::Transport { message: message.into(), context: None }))
            .expect("client stream gone");
    }

    /// Whether the client dropped its read side.
    pub fn is_closed(&self) -> bool {
        self.push.is_closed()
    }

    /// Next frame written by the client, or `None` once the client closed its side.
    pub async fn next_sent(&mut self) -> Option<String> {
        timeout(WAIT, self.sent.next()).await.expect("client wrote nothing in time")
    }
}

pub fn client(transport: MockTransport, token: Option<&str>, policy: ReconnectPolicy) -> (TestClient, EventBus, MemoryCredentials) {
    let bus = EventBus::new();
    let credentials = MemoryCredentials::new(token.map(str::to_owned));
    let client = RealtimeClient::builder()
        .endpoint(ENDPOINT)
        .transport(transport)
        .credentials(credentials.clone())
        .events(bus.clone())
        .policy(policy)
        .build()
        .expect("valid endpoint");
    (client, bus, credentials)
}

pub async fn next<P: Send + Sync + 'static>(rx: &mut broadcast::Receiver<Arc<P>>) -> Arc<P> {
    timeout(WAIT, rx.recv_event()).await.expect("event not emitted in time").expect("bus closed")
}

/// Payload of an outbound frame as JSON.
pub fn payload(text: &str) -> serde_json::Value {
    let mut value: serde_json::Value = serde_json::from_str(text).expect("client sent JSON");
    value["payload"].take()
}
