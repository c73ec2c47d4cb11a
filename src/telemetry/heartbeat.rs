//! EMS Heartbeat
//!
//! Periodically logs an autosupport event carrying the backend's telemetry
//! so usage can be seen on the cluster (`event log show -severity NOTICE`).
//!
//! A heartbeat runs at most once: Stopped -> Running -> Terminated. Stopping
//! a heartbeat that already terminated is a no-op.

use super::{hostname, Telemetry};
use crate::config::CONFIG_VERSION;
use crate::domain::ports::{EmsMessage, OntapApi, OntapApiRef};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Hours between heartbeats when none are configured
pub const DEFAULT_HEARTBEAT_HOURS: f64 = 24.0;

/// Delay before the first heartbeat, leaving the driver time to finish starting
pub const HOUSEKEEPING_STARTUP_DELAY_SECS: u64 = 10;

const MSECS_PER_HOUR: f64 = 3_600_000.0;

enum HeartbeatState {
    Stopped,
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
    Terminated,
}

/// Background task sending EMS heartbeats for one backend
pub struct Heartbeat {
    api: OntapApiRef,
    telemetry: Arc<Telemetry>,
    interval: Option<Duration>,
    startup_delay: Duration,
    state: Mutex<HeartbeatState>,
}

impl Heartbeat {
    /// Create a stopped heartbeat
    ///
    /// `usage_heartbeat` is the interval in hours; empty selects the default.
    /// An interval of zero or less disables the recurring heartbeat.
    pub fn new(api: OntapApiRef, telemetry: Telemetry, usage_heartbeat: &str) -> Self {
        let interval = parse_interval(usage_heartbeat);

        Self {
            api,
            telemetry: Arc::new(telemetry),
            interval,
            startup_delay: Duration::from_secs(HOUSEKEEPING_STARTUP_DELAY_SECS),
            state: Mutex::new(HeartbeatState::Stopped),
        }
    }

    /// Interval between heartbeats after the first, `None` when disabled
    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), HeartbeatState::Running { .. })
    }

    /// Spawn the heartbeat task on the current tokio runtime
    ///
    /// Returns false if the heartbeat was already started.
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, HeartbeatState::Stopped) {
            debug!(driver = %self.telemetry.plugin, "EMS heartbeat already started.");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            self.api.clone(),
            self.telemetry.clone(),
            self.interval,
            self.startup_delay,
            cancel.clone(),
        ));

        *state = HeartbeatState::Running { cancel, handle };
        true
    }

    /// Stop the heartbeat
    ///
    /// The first call after `start` returns the task handle, which completes
    /// once the task has observed the stop. Any later call returns `None`.
    pub fn stop(&self) -> Option<JoinHandle<()>> {
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, HeartbeatState::Terminated) {
            HeartbeatState::Running { cancel, handle } => {
                cancel.cancel();
                Some(handle)
            }
            HeartbeatState::Stopped => None,
            HeartbeatState::Terminated => {
                debug!(driver = %self.telemetry.plugin, "EMS heartbeat already stopped.");
                None
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let HeartbeatState::Running { cancel, .. } = &*self.state.lock() {
            cancel.cancel();
        }
    }
}

fn parse_interval(usage_heartbeat: &str) -> Option<Duration> {
    let mut hours = DEFAULT_HEARTBEAT_HOURS;
    if !usage_heartbeat.is_empty() {
        match usage_heartbeat.trim().parse::<f64>() {
            Ok(h) if h.is_finite() && h * MSECS_PER_HOUR < u64::MAX as f64 => hours = h,
            Ok(h) => warn!(interval = %usage_heartbeat, "Invalid heartbeat interval. {}", h),
            Err(e) => warn!(interval = %usage_heartbeat, "Invalid heartbeat interval. {}", e),
        }
    }
    debug!(interval_hours = hours, "Configured EMS heartbeat.");

    // whole milliseconds; anything shorter disables the timer
    let millis = (hours * MSECS_PER_HOUR).max(0.0) as u64;
    if millis == 0 {
        return None;
    }
    Some(Duration::from_millis(millis))
}

fn default_interval() -> Duration {
    Duration::from_millis((DEFAULT_HEARTBEAT_HOURS * MSECS_PER_HOUR) as u64)
}

async fn run(
    api: OntapApiRef,
    telemetry: Arc<Telemetry>,
    interval: Option<Duration>,
    startup_delay: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!(driver = %telemetry.plugin, "Shut down EMS logs for the driver.");
            return;
        }
        _ = tokio::time::sleep(startup_delay) => {}
    }

    send_heartbeat(api.as_ref(), &telemetry).await;

    match interval {
        Some(period) => {
            let (start, period) = match Instant::now().checked_add(period) {
                Some(start) => (start, period),
                None => {
                    warn!(
                        driver = %telemetry.plugin,
                        interval = ?period,
                        "Heartbeat interval out of range, using the default."
                    );
                    let period = default_interval();
                    (Instant::now() + period, period)
                }
            };
            let mut ticker = interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        debug!(driver = %telemetry.plugin, "Sending EMS heartbeat.");
                        send_heartbeat(api.as_ref(), &telemetry).await;
                    }
                }
            }
        }
        None => cancel.cancelled().await,
    }

    debug!(driver = %telemetry.plugin, "Shut down EMS logs for the driver.");
}

/// Log one heartbeat event; failures are logged and dropped
pub async fn send_heartbeat(api: &dyn OntapApi, telemetry: &Telemetry) {
    let description = match serde_json::to_string(telemetry) {
        Ok(json) => json,
        Err(e) => {
            error!(driver = %telemetry.plugin, "Could not encode telemetry. {}", e);
            return;
        }
    };

    let computer_name = tokio::task::spawn_blocking(hostname)
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    let message = EmsMessage {
        app_version: CONFIG_VERSION.to_string(),
        auto_support: false,
        category: "heartbeat".to_string(),
        computer_name,
        event_description: description,
        event_id: 1,
        event_source: telemetry.orchestrator.name.clone(),
        log_level: 5,
    };

    match api.ems_autosupport_log(message).await {
        Ok(()) => info!(driver = %telemetry.plugin, "Logged EMS message."),
        Err(e) => error!(driver = %telemetry.plugin, error = %e, "Error logging EMS message."),
    }
}
