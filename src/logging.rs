use crate::config::AppConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber. Keep the returned guard alive until exit,
/// or buffered file output is lost.
pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = match config.rotation.as_str() {
        "hourly" => tracing_appender::rolling::hourly(&config.log_dir, &config.log_file),
        "daily" => tracing_appender::rolling::daily(&config.log_dir, &config.log_file),
        _ => tracing_appender::rolling::never(&config.log_dir, &config.log_file),
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let registry = tracing_subscriber::registry().with(filter);

    if config.use_json {
        let file_layer = fmt::layer()
            .json()
            .with_target(true)
            .with_writer(non_blocking)
            .with_ansi(false);
        registry.with(file_layer).init();
    } else {
        let file_layer = fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);
        let stdout_layer = fmt::layer()
            .with_target(false)
            .with_ansi(true)
            .with_writer(std::io::stderr);
        registry.with(file_layer).with(stdout_layer).init();
    }

    guard
}

/// Per-transition traces are noisy; they only pass when tracing is enabled
fn filter_directives(config: &AppConfig) -> String {
    if config.enable_tracing {
        format!("{},TRANSFER_TRACE=trace", config.log_level)
    } else {
        format!("{},TRANSFER_TRACE=off", config.log_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(enable_tracing: bool) -> AppConfig {
        let mut config = AppConfig::from_yaml(
            "log_level: debug\nlog_dir: logs\nlog_file: t.log\nuse_json: false\nrotation: never\nenable_tracing: false\n",
        )
        .unwrap();
        config.enable_tracing = enable_tracing;
        config
    }

    #[test]
    fn test_filter_directives() {
        assert_eq!(filter_directives(&config(false)), "debug,TRANSFER_TRACE=off");
        assert_eq!(filter_directives(&config(true)), "debug,TRANSFER_TRACE=trace");
    }
}
