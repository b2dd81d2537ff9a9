//! Tracing setup for the maintenance binary and embedding services

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::AppConfig;

/// Default directives: configured level for our code, quieter dependencies
fn default_directives(level: &str) -> String {
    format!("{level},sqlx=warn,hyper=warn,reqwest=warn")
}

fn file_appender(config: &AppConfig) -> RollingFileAppender {
    let (dir, file) = (&config.log_dir, &config.log_file);
    match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(dir, file),
        "daily" => tracing_appender::rolling::daily(dir, file),
        _ => tracing_appender::rolling::never(dir, file),
    }
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides the configured level. Keep the returned guard alive
/// for the life of the process; dropping it flushes the file writer.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(file_appender(config));

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));
    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(writer).with_ansi(false))
            .with(fmt::layer().with_target(false).compact())
            .init();
    }

    guard
}
