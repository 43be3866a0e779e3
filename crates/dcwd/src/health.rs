use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

/// What the control loop consumes from the remote server: one
/// fail-closed boolean per poll.
pub trait HealthCheck {
    /// True only when the remote system is known to be safe right now.
    /// Any doubt — timeout, transport error, malformed body — is false.
    fn is_safe(&self) -> bool;
}

#[derive(Debug, thiserror::Error)]
enum HealthError {
    #[error("http error: {0}")]
    Http(#[from] ureq::Error),

    #[error("bad status body: {0}")]
    Body(#[from] std::io::Error),

    #[error("status body missing trakce.emergency")]
    MissingField,
}

/// Polls the hJOPserver PT `/status` endpoint for emergency state.
pub struct PtHealthCheck {
    agent: ureq::Agent,
    url: String,
}

impl PtHealthCheck {
    /// `timeout` bounds the whole request. The caller passes the poll
    /// period, so a stuck server costs at most one poll tick.
    pub fn new(server: &str, port: u16, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: format!("http://{server}:{port}/status"),
        }
    }

    fn emergency(&self) -> Result<bool, HealthError> {
        debug!(url = %self.url, "PT GET /status");
        let body: Value = self
            .agent
            .get(&self.url)
            .set("Content-Type", "application/json")
            .call()?
            .into_json()?;
        body.pointer("/trakce/emergency")
            .and_then(Value::as_bool)
            .ok_or(HealthError::MissingField)
    }
}

impl HealthCheck for PtHealthCheck {
    fn is_safe(&self) -> bool {
        match self.emergency() {
            Ok(true) => {
                info!("hJOP EMERGENCY");
                false
            }
            Ok(false) => {
                info!("hJOP OK");
                true
            }
            Err(err) => {
                // Informational, not an error: the fail-safe default
                // already covers it.
                info!("unable to read hJOPserver status: {err}");
                false
            }
        }
    }
}
