mod config;
mod exit;
mod health;
mod link;
mod logging;
mod supervisor;
mod telemetry;
mod watchdog;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use crate::config::WatchdogConfig;
use crate::logging::{init_logging, LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "dcwd",
    version,
    about = "Fail-safe watchdog between hJOPserver and the DC-01 relay unit"
)]
struct Cli {
    /// hJOPserver address.
    #[arg(short = 's', long, default_value = "127.0.0.1")]
    server: String,

    /// hJOPserver PT server port.
    #[arg(short = 'p', long, default_value_t = 5823)]
    port: u16,

    /// DC-01 serial port; skips discovery.
    #[arg(short = 'c', long, value_name = "PORT")]
    device: Option<String>,

    /// Minimum log level (stderr).
    #[arg(short = 'l', long, value_name = "LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    log_format: LogFormat,

    /// Also append logs to <DIR>/dcwd.log.
    #[arg(short = 'd', long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Mock server: keep the relay always on.
    #[arg(short = 'm', long)]
    mock: bool,

    /// Always try to resume operations, never die.
    #[arg(short = 'r', long)]
    resume: bool,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = init_logging(cli.log_format, cli.log_level, cli.log_dir.as_deref()) {
        eprintln!("error: cannot set up logging: {err}");
        std::process::exit(exit::FAILURE);
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        if let Err(err) = ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst)) {
            eprintln!("error: signal handler setup failed: {err}");
            std::process::exit(exit::FAILURE);
        }
    }

    let config = WatchdogConfig::new(cli.server, cli.port, cli.mock);
    let code = supervisor::run(config, cli.device, cli.resume, shutdown);
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let cli = Cli::try_parse_from(["dcwd"]).expect("bare invocation should parse");
        assert_eq!(cli.server, "127.0.0.1");
        assert_eq!(cli.port, 5823);
        assert!(cli.device.is_none());
        assert!(!cli.mock);
        assert!(!cli.resume);
    }

    #[test]
    fn parses_short_options() {
        let cli = Cli::try_parse_from([
            "dcwd", "-s", "10.0.0.2", "-p", "8080", "-c", "/dev/ttyACM0", "-m", "-r",
        ])
        .expect("short options should parse");
        assert_eq!(cli.server, "10.0.0.2");
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.device.as_deref(), Some("/dev/ttyACM0"));
        assert!(cli.mock);
        assert!(cli.resume);
    }

    #[test]
    fn rejects_unknown_log_level() {
        let err = Cli::try_parse_from(["dcwd", "-l", "verbose"])
            .expect_err("bogus level should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }
}
