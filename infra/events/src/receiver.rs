use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Lag-tolerant receive for event streams opened with
/// [`EventBus::stream`](crate::EventBus::stream).
pub trait EventReceiverExt<P> {
    /// Receives the next payload, skipping over anything lost to lag.
    /// Returns `None` once the bus side is gone.
    fn recv_event(&mut self) -> impl Future<Output = Option<Arc<P>>> + Send;
}

impl<P: Send + Sync + 'static> EventReceiverExt<P> for broadcast::Receiver<Arc<P>> {
    async fn recv_event(&mut self) -> Option<Arc<P>> {
        let mut skipped = 0u64;

        loop {
            match self.recv().await {
                Ok(event) => {
                    if skipped > 0 {
                        warn!(
                            payload = std::any::type_name::<P>(),
                            skipped,
                            "Event stream lagged; continuing from oldest retained event"
                        );
                    }
                    return Some(event);
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    skipped = skipped.saturating_add(n);
                    debug!(
                        payload = std::any::type_name::<P>(),
                        skipped = n,
                        total_skipped = skipped,
                        "Event stream lagged"
                    );
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
