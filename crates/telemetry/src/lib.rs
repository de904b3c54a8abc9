//! Tracing subscriber bootstrap.

use anyhow::Context;
use tracing_subscriber::{fmt, EnvFilter};

use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `telemetry.log_level`. Calling this twice
/// is an error, since only one global subscriber can exist.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = build_filter(settings)?;

    let result = match settings.log_format {
        LogFormat::Pretty => fmt().with_env_filter(filter).with_target(true).try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .try_init(),
    };

    result.map_err(|err| anyhow::anyhow!(err)).context("failed to install tracing subscriber")?;

    tracing::debug!(
        target: "bookshelf-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

fn build_filter(settings: &TelemetrySettings) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&settings.log_level)
            .with_context(|| format!("invalid log level directive '{}'", settings.log_level)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_log_level() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let settings = TelemetrySettings {
            log_level: "bookshelf=loud".to_string(),
            ..TelemetrySettings::default()
        };
        assert!(build_filter(&settings).is_err());
    }

    #[test]
    fn accepts_module_directives() {
        let settings = TelemetrySettings {
            log_level: "info,bookshelf_app=debug,sqlx=warn".to_string(),
            ..TelemetrySettings::default()
        };
        assert!(build_filter(&settings).is_ok());
    }
}
