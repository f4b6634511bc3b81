use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Server host to bind to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Server port to bind to
    #[arg(long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to the fitted vectorizer artifact
    #[arg(long, env = "VECTORIZER_PATH", default_value = "artifacts/vectorizer.json")]
    pub vectorizer_path: PathBuf,

    /// Path to the fitted classifier artifact
    #[arg(long, env = "MODEL_PATH", default_value = "artifacts/model.json")]
    pub model_path: PathBuf,

    /// Which variant of the page to serve
    #[arg(long, env = "VARIANT", value_enum, default_value_t = Variant::Extended)]
    pub variant: Variant,

    /// Idle time in seconds after which a session and its history are dropped
    #[arg(long, env = "SESSION_TTL_SECS", default_value = "3600")]
    pub session_ttl_secs: u64,

    /// Interval in seconds between idle-session sweeps
    #[arg(long, env = "SWEEP_INTERVAL_SECS", default_value = "60")]
    pub sweep_interval_secs: u64,
}

/// The minimal variant is the extended one with history and theming switched off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Variant {
    Minimal,
    #[default]
    Extended,
}

impl Variant {
    pub fn history_enabled(&self) -> bool {
        matches!(self, Variant::Extended)
    }

    pub fn theme_enabled(&self) -> bool {
        matches!(self, Variant::Extended)
    }

    pub fn pie_chart_enabled(&self) -> bool {
        matches!(self, Variant::Extended)
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
    pub sweep_interval: Duration,
}

impl From<&Config> for SessionConfig {
    fn from(config: &Config) -> Self {
        Self {
            ttl: Duration::from_secs(config.session_ttl_secs),
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
        }
    }
}

impl Config {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_serve_the_extended_variant() {
        let config = Config::parse_from(["spam-detector"]);
        assert_eq!(config.variant, Variant::Extended);
        assert!(config.variant.history_enabled());
    }

    #[test]
    fn server_address_joins_host_and_port() {
        let config = Config::parse_from([
            "spam-detector",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--model-path",
            "/models/nb.json",
        ]);
        assert_eq!(config.server_address(), "0.0.0.0:9000");
        assert_eq!(config.model_path, PathBuf::from("/models/nb.json"));
    }

    #[test]
    fn minimal_variant_disables_extras() {
        let config = Config::parse_from(["spam-detector", "--variant", "minimal"]);
        assert!(!config.variant.history_enabled());
        assert!(!config.variant.theme_enabled());
        assert!(!config.variant.pie_chart_enabled());
    }

    #[test]
    fn session_config_never_uses_a_zero_sweep_interval() {
        let config = Config::parse_from(["spam-detector", "--sweep-interval-secs", "0"]);
        let session = SessionConfig::from(&config);
        assert_eq!(session.sweep_interval, Duration::from_secs(1));
        assert_eq!(session.ttl, Duration::from_secs(3600));
    }
}
