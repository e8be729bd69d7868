use crate::config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, prelude::*};

/// Install the global subscriber: a rolling log file plus, in text
/// mode, a colored stdout mirror. The returned guard flushes buffered
/// file output on drop and must be held for the process lifetime.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(rolling_appender(config));

    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.clone()));

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    if config.use_json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .with_ansi(false)
                .boxed(),
        );
        layers.push(fmt::layer().with_target(false).boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .init();

    guard
}

fn rolling_appender(config: &LoggingConfig) -> RollingFileAppender {
    match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.dir, &config.file),
        "daily" => tracing_appender::rolling::daily(&config.dir, &config.file),
        _ => tracing_appender::rolling::never(&config.dir, &config.file),
    }
}
