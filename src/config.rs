//! Runtime configuration, read from `REELFORGE_*` environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use crate::generation::services::OrchestrationSettings;

const DEFAULT_BIND: &str = "0.0.0.0:3000";
const DEFAULT_PROVIDER_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_PROVIDER_MODEL: &str = "veo-3.1-generate-preview";

/// Server configuration.
///
/// Every field except the provider key has a default, so a development
/// instance runs on in-memory adapters with no variables set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReelforgeConfig {
    /// Listen address.
    pub bind_address: String,
    /// `PostgreSQL` URL; `None` selects the in-memory adapters.
    pub database_url: Option<String>,
    /// `tracing` filter directive.
    pub log_filter: String,
    /// Emit newline-delimited JSON logs.
    pub log_json: bool,
    /// Provider API root.
    pub provider_base_url: String,
    /// Provider model name.
    pub provider_model: String,
    /// Provider API key.
    pub provider_api_key: Option<String>,
    /// Root directory for stored videos.
    pub asset_dir: String,
    /// Bound on one provider submission.
    pub submit_timeout: Duration,
    /// Bound on the admission charge.
    pub charge_timeout: Duration,
    /// Delay between finalizer ticks.
    pub poll_interval: Duration,
    /// Age after which a non-terminal task is failed.
    pub task_max_age: Duration,
    /// `token=user-uuid[:plan]` entries.
    pub api_tokens: String,
    /// Opening balance for configured users on the in-memory ledger.
    pub initial_credits: u64,
}

impl Default for ReelforgeConfig {
    fn default() -> Self {
        let settings = OrchestrationSettings::default();
        Self {
            bind_address: DEFAULT_BIND.to_owned(),
            database_url: None,
            log_filter: "info".to_owned(),
            log_json: false,
            provider_base_url: DEFAULT_PROVIDER_BASE_URL.to_owned(),
            provider_model: DEFAULT_PROVIDER_MODEL.to_owned(),
            provider_api_key: None,
            asset_dir: "./assets".to_owned(),
            submit_timeout: settings.submit_timeout,
            charge_timeout: settings.charge_timeout,
            poll_interval: settings.poll_interval,
            task_max_age: settings.task_max_age,
            api_tokens: String::new(),
            initial_credits: 0,
        }
    }
}

impl ReelforgeConfig {
    /// Reads the configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`; unset and malformed
    /// numeric values fall back to defaults.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
        };
        let optional = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let seconds = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|value| value.trim().parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map_or(fallback, Duration::from_secs)
        };

        Self {
            bind_address: text("REELFORGE_BIND", defaults.bind_address),
            database_url: optional("REELFORGE_DATABASE_URL"),
            log_filter: text("REELFORGE_LOG", defaults.log_filter),
            log_json: lookup("REELFORGE_LOG_JSON").is_some_and(|value| {
                let flag = value.trim();
                flag == "1" || flag.eq_ignore_ascii_case("true")
            }),
            provider_base_url: text("REELFORGE_PROVIDER_BASE_URL", defaults.provider_base_url),
            provider_model: text("REELFORGE_PROVIDER_MODEL", defaults.provider_model),
            provider_api_key: optional("REELFORGE_PROVIDER_API_KEY"),
            asset_dir: text("REELFORGE_ASSET_DIR", defaults.asset_dir),
            submit_timeout: seconds("REELFORGE_SUBMIT_TIMEOUT_SECS", defaults.submit_timeout),
            charge_timeout: seconds("REELFORGE_CHARGE_TIMEOUT_SECS", defaults.charge_timeout),
            poll_interval: seconds("REELFORGE_POLL_INTERVAL_SECS", defaults.poll_interval),
            task_max_age: seconds("REELFORGE_TASK_MAX_AGE_SECS", defaults.task_max_age),
            api_tokens: optional("REELFORGE_API_TOKENS").unwrap_or_default(),
            initial_credits: lookup("REELFORGE_INITIAL_CREDITS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(defaults.initial_credits),
        }
    }

    /// Parses the listen address.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `bind_address` is not `host:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.bind_address.parse()
    }

    /// Orchestration timeouts and cadence.
    #[must_use]
    pub const fn orchestration(&self) -> OrchestrationSettings {
        OrchestrationSettings {
            submit_timeout: self.submit_timeout,
            charge_timeout: self.charge_timeout,
            poll_interval: self.poll_interval,
            task_max_age: self.task_max_age,
        }
    }
}
