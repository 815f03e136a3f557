use std::net::{TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::error::{FlowError, Result};
use crate::process::BackgroundJob;
use crate::step::Step;

const INITIAL_BACKOFF: Duration = Duration::from_millis(250);
const MAX_BACKOFF: Duration = Duration::from_secs(2);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Doubling delay, capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self { next: initial, max }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(self.max);
        delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_BACKOFF, MAX_BACKOFF)
    }
}

/// Whether something accepts TCP connections on `host:port`.
pub fn probe(host: &str, port: u16) -> bool {
    let Ok(addrs) = (host, port).to_socket_addrs() else {
        return false;
    };
    addrs.into_iter().any(|addr| TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT).is_ok())
}

/// Wait `settle`, then poll `host:port` until it accepts connections.
///
/// Fails with [`FlowError::ReadinessTimeout`] once `timeout` has elapsed
/// since polling began, or with a step failure if `job` exits first.
pub fn wait_ready(
    host: &str,
    port: u16,
    settle: Duration,
    timeout: Duration,
    job: &mut dyn BackgroundJob,
) -> Result<()> {
    std::thread::sleep(settle);

    let start = Instant::now();
    let mut backoff = Backoff::default();
    loop {
        if let Some(code) = job.try_status().map_err(FlowError::io(Step::WaitReady))? {
            return Err(FlowError::step_failed(
                Step::WaitReady,
                format!("app exited with status {code} before serving"),
            ));
        }
        if probe(host, port) {
            debug!(host, port, "app is accepting connections");
            return Ok(());
        }
        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(FlowError::ReadinessTimeout {
                url: format!("{host}:{port}"),
                waited: timeout,
            });
        }
        let delay = backoff.next_delay().min(timeout - elapsed);
        debug!(host, port, delay_ms = delay.as_millis() as u64, "not ready yet");
        std::thread::sleep(delay);
    }
}
