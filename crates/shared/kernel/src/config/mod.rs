use bazaar_domain::config::ClientConfig;
use config::{Config, Environment, File, Map};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const ENV_PREFIX: &str = "BAZAAR";
const DEFAULT_CONFIG: &str = "client";

/// Custom error type for config loading.
#[bazaar_derive::bazaar_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    #[error("Missing required settings{}: {message}", format_context(.context))]
    MissingSettings { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// A reusable configuration loader that combines file-based settings with environment overrides.
///
/// 1. **Base File**: settings from a file (e.g., `client.toml`). Defaults to `"client"`,
///    resolved against every format the `config` crate knows.
/// 2. **Environment Overrides**: variables prefixed with `BAZAAR__`. Nested keys use double
///    underscores (e.g., `BAZAAR__REALTIME__WS_URL` maps to `realtime.ws_url`).
///
/// # Errors
/// * The configuration file cannot be found.
/// * The content of the file or environment does not match the structure of `T`.
///
/// # Example
/// ```rust
/// use bazaar_kernel::config::load_config;
///
/// #[derive(Default, serde::Deserialize)]
/// struct AppConfig {
///     port: u16,
/// }
///
/// let cfg: AppConfig = load_config(Some("config/local")).unwrap_or_default();
/// ```
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_layered(path, None)
}

/// Same as [`load_config`], but environment overrides come from `vars` instead of the process.
///
/// Keys use the same `BAZAAR__SECTION__KEY` form.
pub fn load_config_with_env<T, I, K, V>(path: Option<impl AsRef<Path>>, vars: I) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let vars: Map<String, String> = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
    load_layered(path, Some(vars))
}

fn load_layered<T>(
    path: Option<impl AsRef<Path>>,
    vars: Option<Map<String, String>>,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let effective_path =
        path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG), |p| p.as_ref().to_path_buf());

    let builder = Config::builder()
        .add_source(File::from(effective_path.as_path()).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .source(vars),
        );

    info!("Loading config from {}", effective_path.display());

    let config = builder
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}

/// Checks that required settings are present.
///
/// Outside production a gap is only logged so local setups keep working.
///
/// # Errors
/// Returns [`ConfigError::MissingSettings`] in production when anything is missing.
pub fn validate_required(config: &ClientConfig) -> Result<(), ConfigError> {
    let missing = config.missing_required();
    if missing.is_empty() {
        return Ok(());
    }

    let list = missing.join(", ");
    if config.environment.is_production() {
        return Err(ConfigError::MissingSettings {
            message: list.into(),
            context: Some("Set them in the config file or via BAZAAR__* variables".into()),
        });
    }

    warn!(missing = %list, environment = ?config.environment, "Missing required settings");
    Ok(())
}
