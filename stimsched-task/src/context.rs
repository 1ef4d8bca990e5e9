use anyhow::Result;
use stimsched_core::EventOutcome;
use stimsched_external::AllExternal;
use stimsched_timing::TaskClock;

use crate::present::Presenter;

/// Everything a handler may touch while its row runs: the clock, the sink
/// fan-out, and the presenter. Handed to each handler by the run loop.
pub struct RunContext<'a> {
    pub clock: &'a TaskClock,
    pub externals: &'a mut AllExternal,
    pub presenter: &'a mut dyn Presenter,
    pub max_wait: f64,
}

impl RunContext<'_> {
    /// Send one event code to every sink, in sink order.
    pub fn mark(&mut self, code: &str) -> Result<()> {
        self.externals.event(code)
    }

    /// The per-event protocol: prepare the frame, wait for the onset, commit,
    /// then notify every sink. Preparation happens during the dead time
    /// before the onset so the wait itself stays jitter-free, and the sink
    /// broadcast goes out synchronously right after the frame is observable.
    ///
    /// Returns the outcome carrying the realized presentation time.
    pub fn present_at(&mut self, onset: f64, code: &str) -> Result<EventOutcome> {
        let handle = self.presenter.prepare()?;
        self.clock.wait_until(onset, self.max_wait)?;
        let flip = self.presenter.commit(handle)?;
        self.externals.event(code)?;
        Ok(EventOutcome::presented(flip))
    }
}
