//! Common command-line arguments for the NM2 bridge binaries

#[cfg(feature = "cli")]
use clap::Parser;
use std::path::PathBuf;

/// How the final store contents are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    /// `key: value` lines sorted by key
    #[default]
    Text,
    /// A single JSON object
    Json,
}

/// Service startup arguments
#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", clap(author, version, about))]
pub struct ServiceArgs {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[cfg_attr(
        feature = "cli",
        clap(short = 'l', long, default_value = "info", env = "RUST_LOG")
    )]
    pub log_level: String,

    /// Configuration file (YAML)
    #[cfg_attr(feature = "cli", clap(short = 'c', long, env = "NM2SRV_CONFIG"))]
    pub config: Option<PathBuf>,

    /// Capture file with one `{"topic", "payload"}` record per line; stdin when absent or `-`
    #[cfg_attr(feature = "cli", clap(short = 'i', long))]
    pub input: Option<PathBuf>,

    /// Output format for the final store dump
    #[cfg_attr(feature = "cli", clap(short = 'f', long, value_enum, default_value = "text"))]
    pub format: OutputFormat,

    /// Enable debug mode with verbose output
    #[cfg_attr(feature = "cli", clap(long, env = "DEBUG"))]
    pub debug: bool,

    /// Disable colored output (useful for log files)
    #[cfg_attr(feature = "cli", clap(long))]
    pub no_color: bool,

    /// Only validate configuration without processing input
    #[cfg_attr(feature = "cli", clap(long))]
    pub validate: bool,
}

impl Default for ServiceArgs {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            config: None,
            input: None,
            format: OutputFormat::Text,
            debug: false,
            no_color: false,
            validate: false,
        }
    }
}

impl ServiceArgs {
    /// Parse log level string to tracing::Level
    pub fn parse_log_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.debug || self.log_level == "debug" || self.log_level == "trace"
    }

    /// Effective filter directive, `--debug` wins over the level flag
    pub fn effective_log_filter(&self) -> String {
        if self.debug {
            "debug".to_string()
        } else {
            self.log_level.clone()
        }
    }

    /// Whether records come from stdin
    pub fn reads_stdin(&self) -> bool {
        match &self.input {
            None => true,
            Some(path) => path.as_os_str() == "-",
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = ServiceArgs::default();
        assert_eq!(args.log_level, "info");
        assert_eq!(args.format, OutputFormat::Text);
        assert!(!args.debug);
        assert!(!args.validate);
        assert!(args.reads_stdin());
    }

    #[test]
    fn test_parse_log_level() {
        let args = ServiceArgs {
            log_level: "debug".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::DEBUG);

        let args = ServiceArgs {
            log_level: "WARN".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::WARN);

        let args = ServiceArgs {
            log_level: "invalid".to_string(),
            ..Default::default()
        };
        assert_eq!(args.parse_log_level(), tracing::Level::INFO);
    }

    #[test]
    fn test_is_development() {
        let args = ServiceArgs::default();
        assert!(!args.is_development());

        let args = ServiceArgs {
            debug: true,
            ..Default::default()
        };
        assert!(args.is_development());
        assert_eq!(args.effective_log_filter(), "debug");
    }

    #[test]
    fn test_reads_stdin() {
        let args = ServiceArgs {
            input: Some(PathBuf::from("-")),
            ..Default::default()
        };
        assert!(args.reads_stdin());

        let args = ServiceArgs {
            input: Some(PathBuf::from("capture.jsonl")),
            ..Default::default()
        };
        assert!(!args.reads_stdin());
    }
}
