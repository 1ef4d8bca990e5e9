use std::time::{Duration, Instant};

use thiserror::Error;

/// Sanity ceiling for `wait_until`, in seconds. A wait longer than this is
/// almost always an onset unit mistake (ms where seconds were expected).
pub const DEFAULT_MAX_WAIT: f64 = 30.0;

/// Final stretch of a wait that is spun rather than slept, in seconds.
/// Timing precision only needs to beat a display refresh interval, so the
/// sleep itself can be coarse as long as it never overshoots the target.
const SPIN_MARGIN: f64 = 0.002;

#[derive(Debug, Error)]
pub enum WaitError {
    #[error(
        "request to wait until {target:.3} is more than {max_wait:.0}s away \
         ({excess:.3}s over); check onset units or raise max_wait"
    )]
    TooFarAhead {
        target: f64,
        max_wait: f64,
        excess: f64,
    },
}

/// The single source of time for a run. Clones share the same epoch, so a
/// sink or presenter can hold its own handle and still agree with the runner
/// about what "now" means.
#[derive(Debug, Clone)]
pub struct TaskClock {
    epoch: Instant,
}

impl TaskClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    /// Seconds since this clock's epoch.
    pub fn now(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Sleep for a duration in seconds. Non-positive durations return
    /// immediately.
    pub fn wait(&self, seconds: f64) {
        if seconds > 0.0 {
            precise_sleep(Duration::from_secs_f64(seconds));
        }
    }

    /// Suspend the caller until the clock reads at least `target`, returning
    /// the time actually observed on wake-up.
    ///
    /// Fails before any waiting begins if the target is more than `max_wait`
    /// seconds away. Targets already in the past return immediately.
    pub fn wait_until(&self, target: f64, max_wait: f64) -> Result<f64, WaitError> {
        let now = self.now();
        if target - now > max_wait {
            return Err(WaitError::TooFarAhead {
                target,
                max_wait,
                excess: target - now - max_wait,
            });
        }

        // One coarse sleep up to the spin margin, then spin out the rest.
        let remaining = target - now - SPIN_MARGIN;
        if remaining > 0.0 {
            precise_sleep(Duration::from_secs_f64(remaining));
        }
        while self.now() < target {
            std::hint::spin_loop();
        }
        Ok(self.now())
    }
}

impl Default for TaskClock {
    fn default() -> Self {
        Self::new()
    }
}

fn precise_sleep(duration: Duration) {
    #[cfg(target_os = "linux")]
    linux_sleep(duration);
    #[cfg(not(target_os = "linux"))]
    std::thread::sleep(duration);
}

#[cfg(target_os = "linux")]
fn linux_sleep(duration: Duration) {
    use libc::{clock_nanosleep, timespec, CLOCK_MONOTONIC};

    let req = timespec {
        tv_sec: duration.as_secs() as libc::time_t,
        tv_nsec: duration.subsec_nanos() as libc::c_long,
    };

    unsafe {
        clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
    }
}
