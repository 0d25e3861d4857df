//! Logging setup
//!
//! Console output honors `RUST_LOG`, falling back to the given default
//! level. When a log directory is provided, events go to a daily-rotated
//! file as JSON lines instead, ready for ingestion by the venue's log
//! collector.

use tracing_subscriber::EnvFilter;

/// Initialize console logging at the default level
pub fn init_logger() {
    init_logger_with_file("info", None);
}

/// Initialize logging, optionally into a daily-rotated JSON file.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_logger_with_file(default_level: &str, log_dir: Option<&str>) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::daily(dir, "comedor-core");
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(file_appender)
            .try_init();
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reinit_is_harmless() {
        init_logger();
        init_logger_with_file("debug", None);
        tracing::info!("logger smoke event");
    }
}
