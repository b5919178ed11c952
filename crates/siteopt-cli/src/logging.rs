use crate::error::Result;
use std::fs::File;
use std::path::Path;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*};

/// Maps `-q` / `-v` counts to the console level.
pub fn level_for(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::OFF;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Installs the global subscriber: a compact stderr layer, plus a plain-text file
/// layer when `log_file` is given.
pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_writer(File::create(path)?)
                .with_ansi(false)
                .with_thread_ids(true)
                .with_target(true),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(level_for(verbosity, quiet))
        .with(stderr_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use serial_test::serial;
    use std::sync::Once;
    use tracing::{debug, info, trace, warn};

    static INIT: Once = Once::new();

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(level_for(0, false), LevelFilter::WARN);
        assert_eq!(level_for(1, false), LevelFilter::INFO);
        assert_eq!(level_for(2, false), LevelFilter::DEBUG);
        assert_eq!(level_for(7, false), LevelFilter::TRACE);
        assert_eq!(level_for(3, true), LevelFilter::OFF);
    }

    #[test]
    #[serial]
    fn global_logger_accepts_all_levels() {
        INIT.call_once(|| {
            setup_logging(3, false, None).unwrap();
        });
        warn!(cells = 4, "warning");
        info!("info");
        debug!("debug");
        trace!("trace");
    }

    #[test]
    #[serial]
    fn file_layer_writes_plain_text() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("run.log");

        let file_layer = fmt::layer()
            .with_writer(File::create(&log_path).unwrap())
            .with_ansi(false)
            .with_thread_ids(true);
        let subscriber = tracing_subscriber::registry().with(file_layer);
        tracing::subscriber::with_default(subscriber, || {
            debug!(sites = 3, "Selection finished.");
        });

        let content = std::fs::read_to_string(log_path).unwrap();
        assert!(content.contains("Selection finished."));
        assert!(content.contains("sites=3"));
        assert!(content.contains("ThreadId"));
        assert!(!content.contains('\u{1b}'));
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = setup_logging(0, false, Some(dir.path()));
        assert!(matches!(result, Err(CliError::Io(_))));
    }
}
