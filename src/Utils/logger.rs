use chrono::Local;
use log::{LevelFilter, warn};
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::io;
use std::path::Path;

/// Maps a level string (debug, info, warn, error, off) to a filter; unknown strings give `None`.
pub fn parse_loglevel(level: &str) -> Option<LevelFilter> {
    match level {
        "debug" => Some(LevelFilter::Debug),
        "info" => Some(LevelFilter::Info),
        "warn" => Some(LevelFilter::Warn),
        "error" => Some(LevelFilter::Error),
        "off" => Some(LevelFilter::Off),
        _ => None,
    }
}

/// Name of a log file stamped with the current local time.
pub fn log_file_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("series_log_{}.txt", date_and_time)
}

/// Logger writing to a newly created file at `path`.
pub fn file_logger(level: LevelFilter, path: &Path) -> io::Result<Box<dyn SharedLogger>> {
    let file = File::create(path)?;
    Ok(WriteLogger::new(level, Config::default(), file))
}

/// Initializes the global logger: terminal output and, if asked, a time-stamped log file in the
/// working directory. Returns false if a logger was already installed.
pub fn init_logger(level: Option<&str>, log_to_file: bool) -> bool {
    let level = level.and_then(parse_loglevel).unwrap_or(LevelFilter::Info);
    if level == LevelFilter::Off {
        return false;
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    loggers.push(TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ));
    let mut file_error = None;
    if log_to_file {
        let name = log_file_name();
        match file_logger(level, Path::new(&name)) {
            Ok(logger) => loggers.push(logger),
            Err(e) => file_error = Some((name, e)),
        }
    }
    let installed = CombinedLogger::init(loggers).is_ok();
    // reported once the terminal logger is up
    if let Some((name, e)) = file_error {
        warn!("could not create log file {}: {}; logging to the terminal only", name, e);
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_loglevel() {
        assert_eq!(parse_loglevel("debug"), Some(LevelFilter::Debug));
        assert_eq!(parse_loglevel("warn"), Some(LevelFilter::Warn));
        assert_eq!(parse_loglevel("off"), Some(LevelFilter::Off));
        assert_eq!(parse_loglevel("loud"), None);
    }

    #[test]
    fn test_log_file_name() {
        let name = log_file_name();
        assert!(name.starts_with("series_log_"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_file_logger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(log_file_name());
        assert!(file_logger(LevelFilter::Info, &path).is_ok());
        assert!(path.exists());
        let missing = dir.path().join("no_such_dir").join("series_log.txt");
        let err = file_logger(LevelFilter::Info, &missing).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_init_logger_off() {
        assert!(!init_logger(Some("off"), false));
    }
}
