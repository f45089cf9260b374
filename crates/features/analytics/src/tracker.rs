use crate::error::AnalyticsError;
use crate::event::AnalyticsEvent;
use crate::sink::AnalyticsSink;
use bazaar_domain::model::{Item, Transaction};
use parking_lot::RwLock;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::debug;

/// Currency attached to every purchase.
pub const CURRENCY: &str = "RWF";

const DEFAULT_AUTH_METHOD: &str = "email";

#[derive(Debug, Default)]
struct Context {
    user_id: Option<String>,
    user_properties: Map<String, Value>,
}

#[derive(Debug)]
struct Inner<S> {
    measurement_id: String,
    sink: S,
    context: RwLock<Context>,
}

/// Product analytics tracker.
///
/// Tracking is disabled when the measurement id is empty: events are logged at
/// debug level and dropped. Cloning is cheap and clones share the user context.
#[derive(Debug)]
pub struct Analytics<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Analytics<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S: AnalyticsSink> Analytics<S> {
    pub fn new(measurement_id: impl Into<String>, sink: S) -> Self {
        let measurement_id = measurement_id.into().trim().to_owned();
        if measurement_id.is_empty() {
            debug!("Analytics disabled: no measurement id");
        } else {
            debug!(measurement_id = %measurement_id, "Analytics enabled");
        }

        Self { inner: Arc::new(Inner { measurement_id, sink, context: RwLock::default() }) }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        !self.inner.measurement_id.is_empty()
    }

    #[must_use]
    pub fn measurement_id(&self) -> &str {
        &self.inner.measurement_id
    }

    /// Records a custom event with the current user context attached.
    ///
    /// Returns `Ok(false)` when tracking is disabled.
    pub fn event(&self, name: &str, params: Map<String, Value>) -> Result<bool, AnalyticsError> {
        if !self.is_enabled() {
            debug!(event = name, ?params, "Analytics event (not tracked)");
            return Ok(false);
        }

        let event = {
            let context = self.inner.context.read();
            AnalyticsEvent {
                name: name.to_owned(),
                params,
                user_id: context.user_id.clone(),
                user_properties: context.user_properties.clone(),
            }
        };

        self.inner.sink.record(&event)?;
        Ok(true)
    }

    pub fn page_view(&self, path: &str, title: Option<&str>) -> Result<bool, AnalyticsError> {
        let mut params = params(json!({ "page_path": path }));
        if let Some(title) = title {
            params.insert("page_title".to_owned(), title.into());
        }
        self.event("page_view", params)
    }

    /// `purchase` with a single line item priced at the transaction amount.
    pub fn track_transaction(&self, transaction: &Transaction) -> Result<bool, AnalyticsError> {
        self.event(
            "purchase",
            params(json!({
                "transaction_id": transaction.id,
                "value": transaction.amount,
                "currency": CURRENCY,
                "items": [{
                    "item_id": transaction.item_id,
                    "item_name": transaction.item_title,
                    "price": transaction.amount,
                    "quantity": 1,
                }],
            })),
        )
    }

    /// Reported as `add_to_cart`, which is how listings show up in GA4 reports.
    pub fn track_item_listed(&self, item: &Item) -> Result<bool, AnalyticsError> {
        self.event(
            "add_to_cart",
            params(json!({
                "items": [{
                    "item_id": item.id,
                    "item_name": item.title,
                    "item_category": item.category,
                    "price": item.price,
                    "quantity": 1,
                }],
            })),
        )
    }

    pub fn track_search(&self, term: &str, results: usize) -> Result<bool, AnalyticsError> {
        self.event("search", params(json!({ "search_term": term, "results_count": results })))
    }

    pub fn track_button_click(&self, name: &str, location: &str) -> Result<bool, AnalyticsError> {
        self.event("button_click", params(json!({ "button_name": name, "location": location })))
    }

    pub fn track_offer_made(&self, offer_id: &str, amount: f64, item_id: &str) -> Result<bool, AnalyticsError> {
        self.event(
            "offer_made",
            params(json!({ "offer_id": offer_id, "offer_amount": amount, "item_id": item_id })),
        )
    }

    pub fn track_message_sent(&self, conversation_id: &str) -> Result<bool, AnalyticsError> {
        self.event("message_sent", params(json!({ "conversation_id": conversation_id })))
    }

    pub fn track_login(&self, method: Option<&str>) -> Result<bool, AnalyticsError> {
        self.event("login", params(json!({ "method": method.unwrap_or(DEFAULT_AUTH_METHOD) })))
    }

    pub fn track_signup(&self, method: Option<&str>) -> Result<bool, AnalyticsError> {
        self.event("sign_up", params(json!({ "method": method.unwrap_or(DEFAULT_AUTH_METHOD) })))
    }

    /// `exception`; entries in `extra` are merged over the defaults.
    pub fn track_error(
        &self,
        description: &str,
        fatal: bool,
        extra: Option<Map<String, Value>>,
    ) -> Result<bool, AnalyticsError> {
        let mut params = params(json!({ "description": description, "fatal": fatal }));
        params.extend(extra.unwrap_or_default());
        self.event("exception", params)
    }

    pub fn track_timing(
        &self,
        category: &str,
        variable: &str,
        value_ms: u64,
        label: Option<&str>,
    ) -> Result<bool, AnalyticsError> {
        self.event(
            "timing_complete",
            params(json!({
                "name": variable,
                "value": value_ms,
                "event_category": category,
                "event_label": label,
            })),
        )
    }

    /// Attaches `user_id` to every later event. `None` signs the user out.
    pub fn set_user_id(&self, user_id: Option<&str>) {
        self.inner.context.write().user_id = user_id.map(str::to_owned);
    }

    /// Merges `properties` into the user properties attached to later events.
    pub fn set_user_properties(&self, properties: Map<String, Value>) {
        self.inner.context.write().user_properties.extend(properties);
    }
}

fn params(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
