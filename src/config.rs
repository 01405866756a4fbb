//! Application-level configuration loading, including countdown and reset policy tuning.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BUZZ_RUSH_BACK_CONFIG_PATH";

/// Number of countdown ticks before the buzz window opens.
const DEFAULT_COUNTDOWN_TICKS: u8 = 3;
/// Wall-clock spacing between two countdown ticks.
const DEFAULT_TICK_INTERVAL_MS: u64 = 1_000;
/// How many buzz records the admin history view returns by default.
const DEFAULT_HISTORY_LIMIT: usize = 5;
/// Attempts for a store operation before giving up.
const DEFAULT_STORE_RETRY_ATTEMPTS: u32 = 3;
/// Backoff between store retries.
const DEFAULT_STORE_RETRY_BACKOFF_MS: u64 = 150;

/// What a session reset does with registered participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPolicy {
    /// Keep identities registered, only clear their buzz state.
    RetainIdentities,
    /// Drop every participant so names can be re-claimed next round.
    RemoveIdentities,
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Ticks the countdown runs before the buzz window opens.
    pub countdown_ticks: u8,
    /// Spacing between countdown ticks.
    pub tick_interval: Duration,
    /// What happens to participants on reset.
    pub reset_policy: ResetPolicy,
    /// Default number of records served by the admin history view.
    pub history_limit: usize,
    /// Attempts for a store operation before surfacing the failure.
    pub store_retry_attempts: u32,
    /// Backoff between store retries.
    pub store_retry_backoff: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        countdown_ticks = app_config.countdown_ticks,
                        "loaded configuration from file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            countdown_ticks: DEFAULT_COUNTDOWN_TICKS,
            tick_interval: Duration::from_millis(DEFAULT_TICK_INTERVAL_MS),
            reset_policy: ResetPolicy::RetainIdentities,
            history_limit: DEFAULT_HISTORY_LIMIT,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            store_retry_backoff: Duration::from_millis(DEFAULT_STORE_RETRY_BACKOFF_MS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    countdown_ticks: Option<u8>,
    tick_interval_ms: Option<u64>,
    reset_policy: Option<ResetPolicy>,
    history_limit: Option<usize>,
    store_retry_attempts: Option<u32>,
    store_retry_backoff_ms: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            countdown_ticks: value.countdown_ticks.unwrap_or(defaults.countdown_ticks),
            tick_interval: value
                .tick_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.tick_interval),
            reset_policy: value.reset_policy.unwrap_or(defaults.reset_policy),
            history_limit: value.history_limit.unwrap_or(defaults.history_limit),
            store_retry_attempts: value
                .store_retry_attempts
                .unwrap_or(defaults.store_retry_attempts),
            store_retry_backoff: value
                .store_retry_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_retry_backoff),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.countdown_ticks, 3);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.reset_policy, ResetPolicy::RetainIdentities);
        assert_eq!(config.history_limit, 5);
    }

    #[test]
    fn partial_raw_config_keeps_defaults_for_missing_fields() {
        let raw: RawConfig =
            serde_json::from_str(r#"{ "countdown_ticks": 5, "reset_policy": "remove_identities" }"#)
                .unwrap();
        let config: AppConfig = raw.into();

        assert_eq!(config.countdown_ticks, 5);
        assert_eq!(config.reset_policy, ResetPolicy::RemoveIdentities);
        assert_eq!(config.tick_interval, Duration::from_secs(1));
        assert_eq!(config.history_limit, 5);
    }
}
