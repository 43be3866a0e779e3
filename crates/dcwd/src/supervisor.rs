use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::config::WatchdogConfig;
use crate::exit;
use crate::health::PtHealthCheck;
use crate::link::{self, LinkError};
use crate::watchdog::Watchdog;

/// Delay between discovery/session attempts in resume mode.
const RETRY_DELAY: Duration = Duration::from_secs(3);

/// Run device sessions until a clean shutdown or, outside resume mode,
/// the first fatal condition. Returns the process exit code.
pub fn run(
    config: WatchdogConfig,
    device: Option<String>,
    resume: bool,
    shutdown: Arc<AtomicBool>,
) -> i32 {
    while !shutdown.load(Ordering::SeqCst) {
        let port_path = match &device {
            Some(path) => path.clone(),
            None => {
                info!("looking for DC-01...");
                match link::discover() {
                    Ok(path) => path,
                    Err(err) => {
                        error!("{err}");
                        if !resume {
                            return discovery_exit_code(&err);
                        }
                        sleep_interruptibly(&shutdown);
                        continue;
                    }
                }
            }
        };

        info!("connecting to {port_path}...");
        let session = match link::open(&port_path) {
            Ok(port) => port,
            Err(err) => {
                error!("cannot open {port_path}: {err}");
                if !resume {
                    return exit::FAILURE;
                }
                sleep_interruptibly(&shutdown);
                continue;
            }
        };

        let oracle = PtHealthCheck::new(&config.server, config.port, config.poll_period);
        let mut watchdog = Watchdog::new(session, oracle, config.clone(), Arc::clone(&shutdown));
        match watchdog.run() {
            Ok(()) => return exit::SUCCESS,
            Err(err) => {
                // The relay falls off on its own once commands stop;
                // our job is to get a new session going.
                error!("device link failure: {err}");
                if !resume {
                    return exit::FAILURE;
                }
            }
        }
        sleep_interruptibly(&shutdown);
    }
    exit::SUCCESS
}

fn discovery_exit_code(err: &LinkError) -> i32 {
    match err {
        LinkError::AmbiguousDevice(_) => exit::AMBIGUOUS_DEVICE,
        _ => exit::NO_DEVICE,
    }
}

/// Back off before the next attempt while staying Ctrl-C responsive.
fn sleep_interruptibly(shutdown: &AtomicBool) {
    let start = Instant::now();
    while start.elapsed() < RETRY_DELAY && !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
}
