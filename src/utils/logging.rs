//! Subscriber setup for the `tracing` events the codec emits.
//!
//! The library only emits events; installing a subscriber is left to
//! binaries. `RUST_LOG` takes precedence over the configured level.
//! Binaries run inside [`app_span`] so every event carries the
//! configured application name.

use crate::config::LoggingConfig;
use crate::error::{CodecError, Result};
use tracing::{Level, Span};
use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber configured by `config`.
///
/// # Errors
/// `ConfigError` if a global subscriber is already installed.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_directive(config.log_level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.show_target)
        .with_writer(std::io::stderr);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| CodecError::ConfigError(format!("Failed to install logger: {e}")))
}

/// Root span tagging events with `config.app_name`
pub fn app_span(config: &LoggingConfig) -> Span {
    tracing::info_span!("app", name = %config.app_name)
}

fn level_directive(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Run `f` under a plain-text subscriber capped at `level` and return what it wrote
#[cfg(test)]
pub(crate) fn capture(level: Level, f: impl FnOnce()) -> String {
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let sink = Sink::default();
    let writer = sink.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);

    let bytes = sink.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}
