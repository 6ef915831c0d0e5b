use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};

pub const LOG_FILE_NAME: &str = "updater.log";

/// Each run starts a fresh log file.
fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn level_for(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the console logger and, when `updater.log` can be opened in
/// `log_dir`, the file logger. Call once at startup.
pub fn init_logging(log_dir: &Path, verbose: bool) {
    let level = level_for(verbose);
    let config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("hotswap")
        .add_filter_allow_str("updater")
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        config.clone(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];

    let log_path = log_dir.join(LOG_FILE_NAME);
    match open_log_file(&log_path) {
        Ok(file) => loggers.push(WriteLogger::new(level, config, file)),
        Err(error) => eprintln!("could not open {}: {error}", log_path.display()),
    }

    let _ = CombinedLogger::init(loggers);
}
