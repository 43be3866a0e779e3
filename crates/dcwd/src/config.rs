use std::time::Duration;

/// Immutable runtime configuration, built once from the CLI and handed
/// to the control loop.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// hJOPserver address.
    pub server: String,
    /// hJOPserver PT server port.
    pub port: u16,
    /// Keep the relay asserted regardless of server state.
    pub mock: bool,
    /// How often the server is polled and the relay command re-sent.
    pub poll_period: Duration,
    /// Control loop cadence; much finer than the poll period so reads
    /// are effectively non-blocking.
    pub tick: Duration,
    /// Inactivity threshold after which buffered partial-frame bytes
    /// are considered stale.
    pub receive_timeout: Duration,
}

impl WatchdogConfig {
    pub fn new(server: impl Into<String>, port: u16, mock: bool) -> Self {
        let poll_period = Duration::from_millis(250);
        let tick = poll_period / 5;
        Self {
            server: server.into(),
            port,
            mock,
            poll_period,
            tick,
            receive_timeout: tick * 3,
        }
    }
}
