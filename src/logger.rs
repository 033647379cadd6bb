use std::io;

use anyhow::Result;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Logging setup: colored console output, plus an optional log file
/// capturing at a finer level.
pub struct LogConfig {
    pub console_level: LevelFilter,
    pub file_level: LevelFilter,
    pub log_file: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::Info,
            file_level: LevelFilter::Debug,
            log_file: None,
        }
    }
}

pub fn init(config: LogConfig) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let base = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                colors.color(record.level()),
                message
            ))
        })
        .level(LevelFilter::Trace);

    let console = fern::Dispatch::new()
        .level(config.console_level)
        .chain(io::stdout());
    let mut dispatch = base.chain(console);

    if let Some(log_file) = config.log_file {
        let file = fern::Dispatch::new()
            .level(config.file_level)
            .chain(fern::log_file(log_file)?);
        dispatch = dispatch.chain(file);
    }

    dispatch.apply()?;
    Ok(())
}
