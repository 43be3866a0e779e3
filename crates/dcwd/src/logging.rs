use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry;
use tracing_subscriber::util::SubscriberInitExt;

/// File name used inside the `--log-dir` directory. Opened in append
/// mode; rotation is left to the deployment.
pub const LOG_FILE_NAME: &str = "dcwd.log";

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> tracing::level_filters::LevelFilter {
        match self {
            LogLevel::Error => tracing::level_filters::LevelFilter::ERROR,
            LogLevel::Warn => tracing::level_filters::LevelFilter::WARN,
            LogLevel::Info => tracing::level_filters::LevelFilter::INFO,
            LogLevel::Debug => tracing::level_filters::LevelFilter::DEBUG,
            LogLevel::Trace => tracing::level_filters::LevelFilter::TRACE,
        }
    }
}

pub fn init_logging(format: LogFormat, level: LogLevel, log_dir: Option<&Path>) -> io::Result<()> {
    let file = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Some(Mutex::new(open_log_file(&dir.join(LOG_FILE_NAME))?))
        }
        None => None,
    };
    let filter = level.as_filter();

    // Text and json arms are spelled out: the layer types differ.
    match format {
        LogFormat::Text => {
            let stderr = fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(false)
                .with_target(false);
            match file {
                Some(file) => {
                    let file_layer = fmt::layer()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_target(false);
                    let _ = registry().with(filter).with(stderr).with(file_layer).try_init();
                }
                None => {
                    let _ = registry().with(filter).with(stderr).try_init();
                }
            }
        }
        LogFormat::Json => {
            let stderr = fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_ansi(false)
                .with_target(false);
            match file {
                Some(file) => {
                    let file_layer = fmt::layer()
                        .json()
                        .with_writer(file)
                        .with_ansi(false)
                        .with_target(false);
                    let _ = registry().with(filter).with(stderr).with(file_layer).try_init();
                }
                None => {
                    let _ = registry().with(filter).with(stderr).try_init();
                }
            }
        }
    }
    Ok(())
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_opens_in_append_mode() {
        let dir = std::env::temp_dir().join(format!("dcwd-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(LOG_FILE_NAME);

        std::fs::write(&path, b"existing\n").unwrap();
        let mut file = open_log_file(&path).unwrap();
        use std::io::Write;
        file.write_all(b"appended\n").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "existing\nappended\n");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
