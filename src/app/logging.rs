use log::LevelFilter;
use tracing_subscriber::{filter::LevelFilter as TraceLevel, fmt, prelude::*};

/// Log level from `LOG_LEVEL`, then `RUST_LOG`, else debug in debug builds
/// and info in release.
pub fn get_log_level() -> LevelFilter {
    level_from(std::env::var("LOG_LEVEL").ok(), std::env::var("RUST_LOG").ok())
}

fn level_from(log_level: Option<String>, rust_log: Option<String>) -> LevelFilter {
    for value in [log_level, rust_log].into_iter().flatten() {
        let value = value.to_ascii_lowercase();
        match value.as_str() {
            "trace" => return LevelFilter::Trace,
            "debug" => return LevelFilter::Debug,
            "info" => return LevelFilter::Info,
            "warn" => return LevelFilter::Warn,
            "error" => return LevelFilter::Error,
            "off" => return LevelFilter::Off,
            _ => {}
        }
        // Directive lists such as `pawn_duel_lib=debug,axum=warn`.
        if value.contains("trace") {
            return LevelFilter::Trace;
        } else if value.contains("debug") {
            return LevelFilter::Debug;
        } else if value.contains("info") {
            return LevelFilter::Info;
        } else if value.contains("warn") {
            return LevelFilter::Warn;
        } else if value.contains("error") {
            return LevelFilter::Error;
        }
    }

    #[cfg(debug_assertions)]
    return LevelFilter::Debug;
    #[cfg(not(debug_assertions))]
    return LevelFilter::Info;
}

/// Installs the fmt subscriber. `log` records reach it through the
/// tracing-log bridge. Calling this twice is harmless.
pub fn init_logging() {
    let level = match get_log_level() {
        LevelFilter::Off => TraceLevel::OFF,
        LevelFilter::Error => TraceLevel::ERROR,
        LevelFilter::Warn => TraceLevel::WARN,
        LevelFilter::Info => TraceLevel::INFO,
        LevelFilter::Debug => TraceLevel::DEBUG,
        LevelFilter::Trace => TraceLevel::TRACE,
    };

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(level)
        .try_init();
    if installed.is_ok() {
        log::info!("Logging initialised at {}", level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn log_level_wins_over_rust_log() {
        assert_eq!(level_from(some("warn"), some("trace")), LevelFilter::Warn);
    }

    #[test]
    fn rust_log_directives_are_scanned() {
        assert_eq!(level_from(None, some("pawn_duel_lib=debug,axum=warn")), LevelFilter::Debug);
        assert_eq!(level_from(None, some("ERROR")), LevelFilter::Error);
        assert_eq!(level_from(some("loud"), some("info")), LevelFilter::Info);
    }

    #[test]
    fn build_profile_default() {
        let expected = if cfg!(debug_assertions) { LevelFilter::Debug } else { LevelFilter::Info };
        assert_eq!(level_from(None, None), expected);
    }
}
