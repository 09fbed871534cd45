use std::path::PathBuf;

use chrono::{Datelike, Timelike};
// Re-export logging functions for convenience.
pub use log::*;
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Logger, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use thiserror::Error;

/// Log target used by the state tracker for barrier resolution diagnostics.
pub const TRACKING_TARGET: &str = "vigil::tracking";

/// Log target used by validating backends to report incorrect barriers.
pub const VALIDATION_TARGET: &str = "vigil::validation";

pub struct LogConfig {
    /// Removes all logs below this level.
    pub filter: LevelFilter,
    /// Level for the state tracker diagnostics. These are chatty at `Trace`, so they get their
    /// own filter.
    pub tracking_filter: LevelFilter,
    /// Directory to write a timestamped log file to. `None` logs to the console only.
    pub directory: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("unable to create log file: {0}")]
    File(#[from] std::io::Error),
    #[error("invalid logging configuration: {0}")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),
    #[error("a logger is already installed: {0}")]
    AlreadySet(#[from] SetLoggerError),
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: LevelFilter::Info,
            tracking_filter: LevelFilter::Warn,
            directory: None,
        }
    }
}

/// Initializes logging. Should be called before any other logging functions.
pub fn init(config: LogConfig) -> Result<(), LogInitError> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{h({l:<5})} {t} - {m}{n}")))
        .build();

    let mut builder =
        Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");
    let mut tracking = Logger::builder().appender("stdout");

    // Output to log file. Name of the file is based on the current time.
    if let Some(directory) = &config.directory {
        let now = chrono::Utc::now();
        let log_file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d} - {l} {t} - {m}{n}")))
            .build(directory.join(format!(
                "{} {} {} {} {} {}.txt",
                now.year(),
                now.month(),
                now.day(),
                now.hour(),
                now.minute(),
                now.second()
            )))?;

        builder = builder.appender(Appender::builder().build("log_file", Box::new(log_file)));
        root = root.appender("log_file");
        tracking = tracking.appender("log_file");
    }

    let config = builder
        .logger(
            tracking
                .additive(false)
                .build(TRACKING_TARGET, config.tracking_filter),
        )
        .build(root.build(config.filter))?;

    log4rs::init_config(config)?;
    log_panics::init();

    Ok(())
}
