// Process environment wiring.
//
// Runtime mode, externally-supplied configuration, and the default log
// level all arrive through environment variables. The lookups are grouped
// here so the variable names live in one place.

use std::sync::OnceLock;

use crate::logger::LogLevel;

/// Variable names recognized by the lookups below.
pub mod vars {
    pub const MODE: [&str; 3] = ["SNIPSTASH_ENV", "RUST_ENV", "NODE_ENV"];
    pub const BASE_URL: &str = "SNIPSTASH_URL";
    pub const WEBHOOK_SECRET: &str = "SNIPSTASH_WEBHOOK_SECRET";
    pub const LOG_LEVEL: &str = "SNIPSTASH_LOG_LEVEL";
}

/// Deployment mode, resolved once per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvMode {
    Production,
    Development,
    Test,
}

impl EnvMode {
    /// The mode for this process. `SNIPSTASH_ENV` wins over `RUST_ENV`,
    /// which wins over `NODE_ENV`; anything unrecognized counts as
    /// development.
    pub fn current() -> Self {
        static MODE: OnceLock<EnvMode> = OnceLock::new();
        *MODE.get_or_init(|| {
            let raw = vars::MODE
                .iter()
                .find_map(|name| std::env::var(name).ok())
                .unwrap_or_default();
            Self::parse(&raw)
        })
    }

    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" | "testing" => Self::Test,
            _ => Self::Development,
        }
    }
}

pub fn is_production() -> bool {
    EnvMode::current() == EnvMode::Production
}

/// Base URL the deployment is reachable at, when configured.
pub fn get_url_from_env() -> Option<String> {
    std::env::var(vars::BASE_URL).ok()
}

/// Shared secret for verifying billing webhook signatures.
pub fn get_webhook_secret_from_env() -> Option<String> {
    std::env::var(vars::WEBHOOK_SECRET).ok()
}

/// Default level for the application logger: `SNIPSTASH_LOG_LEVEL` when
/// set, `Warn` otherwise.
pub fn default_log_level() -> LogLevel {
    match std::env::var(vars::LOG_LEVEL) {
        Ok(raw) => LogLevel::parse(&raw),
        Err(_) => LogLevel::Warn,
    }
}

/// Install a `tracing` subscriber for binaries and test harnesses that
/// want framework logs. `RUST_LOG` wins when present; otherwise production
/// deployments get `snipstash=info` and everything else `snipstash=debug`.
/// Safe to call more than once; later calls keep the first subscriber.
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if is_production() {
            "snipstash=info"
        } else {
            "snipstash=debug"
        };
        EnvFilter::new(directive)
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .try_init();
}
