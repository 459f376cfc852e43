//! Schema probe debouncing.
//!
//! Rapid operator edits (target table name, collation choice) each want a
//! fresh schema probe, but only the last edit matters. Scheduling a probe
//! cancels the previously scheduled not-yet-run one and fires after a
//! quiet period.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

pub struct ProbeDebouncer {
    quiet_period: Duration,
    pending: Option<JoinHandle<()>>,
}

impl ProbeDebouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            pending: None,
        }
    }

    /// Schedules `probe` to run after the quiet period, replacing any
    /// probe scheduled earlier that has not fired yet.
    pub fn schedule<F>(&mut self, probe: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let quiet_period = self.quiet_period;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            probe.await;
        }));
    }

    /// Cancels the pending probe, if any has not fired yet.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl Default for ProbeDebouncer {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}

impl Drop for ProbeDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
