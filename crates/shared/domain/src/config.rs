use serde::Deserialize;
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Top-level client configuration.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfigInner {
    pub environment: Environment,
    pub api: ApiConfig,
    pub realtime: RealtimeConfig,
    pub analytics: AnalyticsConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
///
/// Deserializes straight through to [`ClientConfigInner`] so that layered sources
/// can coerce string values (e.g., from environment variables) into numbers.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(from = "ClientConfigInner")]
pub struct ClientConfig {
    inner: Arc<ClientConfigInner>,
}

impl From<ClientConfigInner> for ClientConfig {
    fn from(inner: ClientConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl Deref for ClientConfig {
    type Target = ClientConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ClientConfig {
    fn deref_mut(&mut self) -> &mut ClientConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

impl ClientConfig {
    /// Dotted names of required settings that are empty.
    #[must_use]
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            ("api.url", self.api.url.as_str()),
            ("realtime.ws_url", self.realtime.ws_url.as_str()),
            ("analytics.measurement_id", self.analytics.measurement_id.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

/// REST API base; used by page code outside this workspace.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub ws_url: String,
    pub max_reconnect_attempts: u32,
    pub reconnect_interval_ms: u64,
    pub max_reconnect_delay_ms: Option<u64>,
    /// Buffer size for async event streams.
    pub event_capacity: usize,
}

impl RealtimeConfig {
    #[must_use]
    pub const fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    #[must_use]
    pub fn max_reconnect_delay(&self) -> Option<Duration> {
        self.max_reconnect_delay_ms.map(Duration::from_millis)
    }
}

/// Analytics is disabled while `measurement_id` is empty.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub measurement_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Extra `EnvFilter` directives, e.g. `bazaar_realtime=debug,tungstenite=warn`.
    pub filter: Option<String>,
    /// Enables rolling file output in this directory.
    pub directory: Option<PathBuf>,
    /// `minutely`, `hourly`, `daily`, or `never`.
    pub rotation: String,
    pub max_files: usize,
    pub json: bool,
}

// --- Default ---

impl Default for ApiConfig {
    fn default() -> Self {
        Self { url: "http://localhost:8080/api".to_owned() }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8080/ws".to_owned(),
            max_reconnect_attempts: 5,
            reconnect_interval_ms: 3000,
            max_reconnect_delay_ms: None,
            event_capacity: 128,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from(".bazaar") }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            filter: None,
            directory: None,
            rotation: "daily".to_owned(),
            max_files: 7,
            json: false,
        }
    }
}
