//! ---
//! bridge_section: "01-core-functionality"
//! bridge_subsection: "module"
//! bridge_type: "source"
//! bridge_scope: "code"
//! bridge_description: "Shared primitives and utilities for the bridge runtime."
//! bridge_version: "v0.0.0-prealpha"
//! bridge_owner: "tbd"
//! ---
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::BridgeConfig;

const LOG_ENV: &str = "UPNP_BRIDGE_LOG";
const LOG_SUFFIX: &str = "log";

static GUARDS: OnceCell<(WorkerGuard, WorkerGuard)> = OnceCell::new();

/// Available log formats for the bridge service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    #[default]
    StructuredJson,
    Pretty,
}

/// Prefix of the daily log files: `[logging] file_prefix`, else the bridge name.
pub fn log_file_prefix(settings: &BridgeConfig) -> &str {
    settings
        .logging
        .file_prefix
        .as_deref()
        .filter(|prefix| !prefix.trim().is_empty())
        .unwrap_or(settings.name.as_str())
}

fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("invalid {LOG_ENV} directive '{directive}' ({err}); using info");
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Install the bridge subscriber: stdout in the configured format plus a daily
/// JSON file `<prefix>.<date>.log` under `[logging] directory`.
///
/// `UPNP_BRIDGE_LOG` takes precedence over `RUST_LOG`. A subscriber installed
/// earlier stays in place; the log file is still created.
pub fn init_tracing(settings: &BridgeConfig) -> Result<()> {
    let logging = &settings.logging;
    std::fs::create_dir_all(&logging.directory).with_context(|| {
        format!("unable to create log directory {}", logging.directory.display())
    })?;

    let prefix = log_file_prefix(settings);
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix(LOG_SUFFIX)
        .build(&logging.directory)
        .with_context(|| {
            format!(
                "unable to open log file {prefix} in {}",
                logging.directory.display()
            )
        })?;
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = match logging.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_target(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_writer(stdout_writer)
            .boxed(),
    };
    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        let _ = GUARDS.set((file_guard, stdout_guard));
    }

    info!(
        bridge = %settings.name,
        log_dir = %logging.directory.display(),
        file_prefix = %prefix,
        format = ?logging.format,
        "tracing initialised"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_files(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .expect("read log dir")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn prefix_defaults_to_bridge_name() {
        let mut settings = BridgeConfig::default();
        assert_eq!(log_file_prefix(&settings), "upnp-bridge");
        settings.logging.file_prefix = Some("attic".into());
        assert_eq!(log_file_prefix(&settings), "attic");
        settings.logging.file_prefix = Some("  ".into());
        assert_eq!(log_file_prefix(&settings), "upnp-bridge");
    }

    #[test]
    fn log_file_named_once_after_the_bridge() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut settings = BridgeConfig::default();
        settings.logging.directory = temp.path().join("logs");
        settings.logging.format = LogFormat::Pretty;

        init_tracing(&settings).expect("first init");
        init_tracing(&settings).expect("second init is tolerated");

        let files = log_files(&settings.logging.directory);
        assert!(!files.is_empty());
        for name in files {
            assert!(name.starts_with("upnp-bridge."), "unexpected log file {name}");
            assert!(name.ends_with(".log"), "unexpected log file {name}");
            assert!(!name.contains("upnp-bridge-upnp-bridge"));
        }
    }
}
