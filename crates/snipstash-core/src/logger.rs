// Structured application logger.
//
// Small by intent: level filtering, ANSI-colored output, and an optional
// custom handler for embedding. The default level comes from
// SNIPSTASH_LOG_LEVEL when set.

use std::fmt;
use std::sync::Arc;

/// ANSI escape codes used by the default formatter.
pub mod ansi {
    pub const RESET: &str = "\x1b[0m";
    pub const BRIGHT: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub mod fg {
        pub const RED: &str = "\x1b[31m";
        pub const GREEN: &str = "\x1b[32m";
        pub const YELLOW: &str = "\x1b[33m";
        pub const BLUE: &str = "\x1b[34m";
        pub const MAGENTA: &str = "\x1b[35m";
        pub const CYAN: &str = "\x1b[36m";
    }
}

/// Severity, least to most severe. `Success` sits between info and warn and
/// only affects the default formatter; custom handlers receive it as info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Success,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Success => "SUCCESS",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    fn color(&self) -> &'static str {
        match self {
            Self::Debug => ansi::fg::MAGENTA,
            Self::Info => ansi::fg::BLUE,
            Self::Success => ansi::fg::GREEN,
            Self::Warn => ansi::fg::YELLOW,
            Self::Error => ansi::fg::RED,
        }
    }

    /// Parse a level name, case-insensitive. Unknown names fall back to
    /// `Warn` so a typo in configuration fails toward quieter output.
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "debug" => Self::Debug,
            "info" => Self::Info,
            "success" => Self::Success,
            "warn" | "warning" => Self::Warn,
            "error" => Self::Error,
            _ => Self::Warn,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for LogLevel {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

/// Sink for applications that want log lines somewhere other than the
/// terminal.
pub trait LogHandler: Send + Sync + fmt::Debug {
    fn handle(&self, level: LogLevel, message: &str, args: &[&str]);
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub disabled: bool,
    pub disable_colors: bool,
    pub level: LogLevel,
    pub custom_handler: Option<Arc<dyn LogHandler>>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            disable_colors: false,
            level: crate::env::default_log_level(),
            custom_handler: None,
        }
    }
}

/// The logger handed out through `AppContext`.
#[derive(Clone)]
pub struct AppLogger {
    config: LoggerConfig,
}

// Skip the handler in Debug output
impl fmt::Debug for AppLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppLogger")
            .field("level", &self.config.level)
            .field("disabled", &self.config.disabled)
            .finish()
    }
}

macro_rules! level_fns {
    ($($name:ident => $level:ident),* $(,)?) => {
        $(
            pub fn $name(&self, message: &str) {
                self.log(LogLevel::$level, message, &[]);
            }
        )*
    };
}

impl AppLogger {
    pub fn new(config: LoggerConfig) -> Self {
        Self { config }
    }

    pub fn level(&self) -> LogLevel {
        self.config.level
    }

    pub fn should_publish(&self, level: LogLevel) -> bool {
        !self.config.disabled && level >= self.config.level
    }

    // debug/info/success/warn/error, one per level
    level_fns! {
        debug => Debug,
        info => Info,
        success => Success,
        warn => Warn,
        error => Error,
    }

    pub fn log(&self, level: LogLevel, message: &str, args: &[&str]) {
        if !self.should_publish(level) {
            return;
        }

        if let Some(handler) = &self.config.custom_handler {
            let reported = match level {
                LogLevel::Success => LogLevel::Info,
                other => other,
            };
            handler.handle(reported, message, args);
            return;
        }

        let mut line = self.render(level, message);
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }

        if level >= LogLevel::Warn {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }

    fn render(&self, level: LogLevel, message: &str) -> String {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        if self.config.disable_colors {
            return format!("{timestamp} {} [Snipstash]: {message}", level.as_str());
        }

        let mut line = String::new();
        line.push_str(ansi::DIM);
        line.push_str(&timestamp);
        line.push_str(ansi::RESET);
        line.push(' ');
        line.push_str(level.color());
        line.push_str(level.as_str());
        line.push_str(ansi::RESET);
        line.push(' ');
        line.push_str(ansi::BRIGHT);
        line.push_str("[Snipstash]:");
        line.push_str(ansi::RESET);
        line.push(' ');
        line.push_str(message);
        line
    }
}

impl Default for AppLogger {
    fn default() -> Self {
        Self::new(LoggerConfig::default())
    }
}
