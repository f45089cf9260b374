use crate::error::AnalyticsError;
use crate::event::AnalyticsEvent;
use bazaar_event_bus::{EventBus, Topic};
use tracing::info;

/// Destination for tracked events.
pub trait AnalyticsSink: Send + Sync + 'static {
    /// Records one event.
    ///
    /// # Errors
    /// Returns [`AnalyticsError::Sink`] if the event could not be recorded.
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError>;
}

/// Published by [`BusSink`] for every tracked event.
#[derive(Debug)]
pub struct AnalyticsTracked;

impl Topic for AnalyticsTracked {
    type Payload = AnalyticsEvent;
    const NAME: &'static str = "analytics";
}

/// Writes events as structured `tracing` records under the `analytics` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let params = serde_json::to_string(&event.params).map_err(|e| AnalyticsError::Sink {
            message: e.to_string().into(),
            context: Some(event.name.clone().into()),
        })?;

        info!(
            target: "analytics",
            event = %event.name,
            user_id = event.user_id.as_deref(),
            %params,
            "Analytics event"
        );
        Ok(())
    }
}

/// Publishes events on an [`EventBus`] as [`AnalyticsTracked`].
#[derive(Debug, Clone)]
pub struct BusSink {
    bus: EventBus,
}

impl BusSink {
    #[must_use]
    pub const fn new(bus: EventBus) -> Self {
        Self { bus }
    }
}

impl AnalyticsSink for BusSink {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        self.bus.emit::<AnalyticsTracked>(event.clone());
        Ok(())
    }
}

impl<S: AnalyticsSink> AnalyticsSink for std::sync::Arc<S> {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        (**self).record(event)
    }
}

/// Fans out to both sinks; the second still runs when the first fails.
impl<A: AnalyticsSink, B: AnalyticsSink> AnalyticsSink for (A, B) {
    fn record(&self, event: &AnalyticsEvent) -> Result<(), AnalyticsError> {
        let first = self.0.record(event);
        self.1.record(event)?;
        first
    }
}
