use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use log::{info, warn};
use stimsched_core::{ConfigError, EventOutcome, Row, Timeline};
use stimsched_external::{AllExternal, ExternalCom};
use stimsched_timing::{DEFAULT_MAX_WAIT, TaskClock};

use crate::context::RunContext;
use crate::present::Presenter;
use crate::runner::{EventFn, EventRunner};

/// Lifecycle of one `Task`. There is no way back to `Running` from `Stopped`
/// without binding a fresh timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Scheduled,
    Running,
    Stopped,
}

/// Options for [`Task::run`].
#[derive(Debug, Clone, Copy)]
pub struct RunOpts {
    /// Absolute clock time the schedule is anchored to; `None` anchors to
    /// "now" (e.g. pass the scanner-trigger time to lock onsets to the TR).
    pub start_at: Option<f64>,
    /// Extra seconds to hold after the last row, keeping the final stimulus
    /// up and the sinks recording before teardown.
    pub end_wait: f64,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            start_at: None,
            end_wait: 0.0,
        }
    }
}

/// The scheduling loop: owns the timeline, the handler registry, and the sink
/// fan-out, and drives one fixed-schedule run from `start()` to `stop()`.
///
/// Fixed schedule means exactly that: event order cannot change based on
/// outcomes. Each instance is self-contained, so independent tasks (or tests)
/// never share registry or sink state.
pub struct Task {
    clock: TaskClock,
    externals: AllExternal,
    presenter: Box<dyn Presenter>,
    events: HashMap<String, EventRunner>,
    timeline: Option<Timeline>,
    results: Vec<EventOutcome>,
    state: RunState,
    max_wait: f64,
    quit: Option<Arc<AtomicBool>>,
}

impl Task {
    pub fn new(clock: TaskClock, presenter: Box<dyn Presenter>) -> Self {
        Self {
            clock,
            externals: AllExternal::default(),
            presenter,
            events: HashMap::new(),
            timeline: None,
            results: Vec::new(),
            state: RunState::Idle,
            max_wait: DEFAULT_MAX_WAIT,
            quit: None,
        }
    }

    pub fn clock(&self) -> &TaskClock {
        &self.clock
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// The ordered sink list; `append`/`prepend` here before running.
    pub fn externals_mut(&mut self) -> &mut AllExternal {
        &mut self.externals
    }

    pub fn add_external(&mut self, external: Box<dyn ExternalCom>) {
        self.externals.append(external);
    }

    /// Raise the wait-sanity ceiling for schedules with very long gaps.
    pub fn set_max_wait(&mut self, max_wait: f64) {
        self.max_wait = max_wait;
    }

    /// Cooperative force-quit: checked between rows. When raised, the run
    /// marks a terminal event and stops every sink instead of exiting with
    /// recording files left open.
    pub fn set_quit_flag(&mut self, flag: Arc<AtomicBool>) {
        self.quit = Some(flag);
    }

    /// Register a handler for an event name, naming the row columns it takes
    /// (in argument order).
    pub fn add_event_type(&mut self, name: &str, func: EventFn, arg_cols: &[&str]) {
        self.events
            .insert(name.to_string(), EventRunner::new(name, func, arg_cols));
    }

    /// The two fixation events nearly every task wants.
    pub fn add_default_events(&mut self) {
        self.add_event_type(
            "iti",
            Box::new(|ctx, args| ctx.present_at(args.number(0).unwrap_or(0.0), "iti")),
            &["onset"],
        );
        self.add_event_type(
            "isi",
            Box::new(|ctx, args| ctx.present_at(args.number(0).unwrap_or(0.0), "isi")),
            &["onset"],
        );
    }

    /// Tell every sink to open a new output file.
    pub fn new_file(&mut self, name: &str) -> Result<()> {
        self.externals.new_file(name)
    }

    /// Send a message to every sink, in sink order.
    pub fn mark_external(&mut self, msg: &str) -> Result<()> {
        self.externals.event(msg)
    }

    /// Bind the timeline for the next run and allocate one sentinel outcome
    /// per row. Re-binding after a stop re-arms the task.
    ///
    /// Rows the current registry cannot satisfy are warned about here, before
    /// any participant is in the scanner, rather than discovered mid-run.
    pub fn set_onsets(&mut self, timeline: Timeline) -> Result<(), ConfigError> {
        if self.state == RunState::Running {
            return Err(ConfigError::NotScheduled { state: "running" });
        }
        self.warn_unsatisfied_rows(&timeline);
        self.results = vec![EventOutcome::sentinel(); timeline.len()];
        self.timeline = Some(timeline);
        self.state = RunState::Scheduled;
        Ok(())
    }

    fn warn_unsatisfied_rows(&self, timeline: &Timeline) {
        let mut reported: HashSet<(String, String)> = HashSet::new();
        for row in timeline.rows() {
            let Some(runner) = self.events.get(&row.event_name) else {
                if reported.insert((row.event_name.clone(), String::new())) {
                    warn!(
                        "timeline uses event '{}' with no registered handler; those rows will be skipped",
                        row.event_name
                    );
                }
                continue;
            };
            for col in runner.arg_cols() {
                if row.get(col).is_none()
                    && reported.insert((row.event_name.clone(), col.clone()))
                {
                    warn!(
                        "timeline rows for event '{}' are missing column '{}'; the handler will get None",
                        row.event_name, col
                    );
                }
            }
        }
    }

    /// Outcomes of the last (or current) run, one per timeline row.
    pub fn results(&self) -> &[EventOutcome] {
        &self.results
    }

    /// Run the bound timeline: broadcast `start()`, dispatch every row in
    /// table order, then broadcast `stop()` and return the outcome list.
    ///
    /// Relative onsets are converted to absolute time in one pass before the
    /// first wait, so a handler that runs long delays later presentations
    /// but never shifts their targets. Once `start()` has succeeded the
    /// matching `stop()` is broadcast on every exit path, including a handler
    /// or sink error mid-run.
    pub fn run(&mut self, opts: RunOpts) -> Result<Vec<EventOutcome>> {
        match self.state {
            RunState::Scheduled => {}
            RunState::Idle => return Err(ConfigError::NoTimeline.into()),
            RunState::Running => {
                return Err(ConfigError::NotScheduled { state: "running" }.into());
            }
            RunState::Stopped => {
                return Err(ConfigError::NotScheduled { state: "stopped" }.into());
            }
        }
        let timeline = self.timeline.as_ref().ok_or(ConfigError::NoTimeline)?;
        let start_at = opts.start_at.unwrap_or_else(|| self.clock.now());
        let rows: Vec<Row> = timeline
            .rows()
            .iter()
            .cloned()
            .map(|mut row| {
                row.onset += start_at;
                row
            })
            .collect();

        self.results = vec![EventOutcome::sentinel(); rows.len()];
        self.state = RunState::Running;

        self.externals.start()?;
        let ran = self.run_rows(&rows, opts.end_wait);
        let stopped = self.externals.stop();
        self.state = RunState::Stopped;

        match (ran, stopped) {
            (Ok(()), Ok(saved)) => {
                for path in saved.into_iter().flatten() {
                    info!("external sink saved {}", path);
                }
                Ok(self.results.clone())
            }
            (Err(run_err), Err(stop_err)) => {
                warn!("stop broadcast also failed after run error: {stop_err:#}");
                Err(run_err)
            }
            (Err(run_err), Ok(_)) => Err(run_err),
            (Ok(()), Err(stop_err)) => Err(stop_err),
        }
    }

    fn run_rows(&mut self, rows: &[Row], end_wait: f64) -> Result<()> {
        let Self {
            clock,
            externals,
            presenter,
            events,
            results,
            quit,
            max_wait,
            ..
        } = self;

        for (i, row) in rows.iter().enumerate() {
            if let Some(flag) = quit {
                if flag.load(Ordering::Relaxed) {
                    externals.event("FORCE QUIT")?;
                    return Ok(());
                }
            }
            let Some(runner) = events.get_mut(&row.event_name) else {
                warn!(
                    "event {}: unknown event '{}'; add it with add_event_type()",
                    i, row.event_name
                );
                continue;
            };
            let mut ctx = RunContext {
                clock: &*clock,
                externals: &mut *externals,
                presenter: presenter.as_mut(),
                max_wait: *max_wait,
            };
            results[i] = runner.run(&mut ctx, row)?;
        }

        // onsets carry no durations; holding here keeps the last stimulus up
        if end_wait > 0.0 {
            clock.wait(end_wait);
        }
        Ok(())
    }
}
