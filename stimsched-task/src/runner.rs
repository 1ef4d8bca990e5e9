use anyhow::Result;
use log::warn;
use stimsched_core::{EventOutcome, Row, Value};

use crate::context::RunContext;

/// Boxed handler body. Receives the run context plus the row values resolved
/// from its declared `arg_cols`, in that order.
pub type EventFn = Box<dyn FnMut(&mut RunContext<'_>, &EventArgs) -> Result<EventOutcome>>;

/// Row values extracted for one handler invocation, positionally matching the
/// handler's `arg_cols`. Missing columns arrive as `None` rather than
/// aborting the row.
pub struct EventArgs {
    values: Vec<Option<Value>>,
}

impl EventArgs {
    pub fn get(&self, i: usize) -> Option<&Value> {
        self.values.get(i).and_then(|v| v.as_ref())
    }

    pub fn number(&self, i: usize) -> Option<f64> {
        self.get(i).and_then(|v| v.as_number())
    }

    pub fn text(&self, i: usize) -> Option<&str> {
        self.get(i).and_then(|v| v.as_text())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One registered event type: the handler to call and which row columns feed
/// it. Created once per event name and reused for every row of that type.
pub struct EventRunner {
    event_name: String,
    arg_cols: Vec<String>,
    func: EventFn,
}

impl EventRunner {
    pub fn new(event_name: impl Into<String>, func: EventFn, arg_cols: &[&str]) -> Self {
        Self {
            event_name: event_name.into(),
            arg_cols: arg_cols.iter().map(|c| c.to_string()).collect(),
            func,
        }
    }

    pub fn event_name(&self) -> &str {
        &self.event_name
    }

    pub fn arg_cols(&self) -> &[String] {
        &self.arg_cols
    }

    /// Pull this event's columns out of the row and invoke the handler.
    /// A missing value is warned about and passed through as `None`; losing
    /// one argument is cheaper than aborting a live session.
    pub fn run(&mut self, ctx: &mut RunContext<'_>, row: &Row) -> Result<EventOutcome> {
        let mut values = Vec::with_capacity(self.arg_cols.len());
        for col in &self.arg_cols {
            let value = row.get(col);
            if value.is_none() {
                warn!(
                    "no value for column '{}' when running event '{}'",
                    col, self.event_name
                );
            }
            values.push(value);
        }
        (self.func)(ctx, &EventArgs { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::present::NullPresenter;
    use stimsched_external::AllExternal;
    use stimsched_timing::{DEFAULT_MAX_WAIT, TaskClock};

    fn with_ctx<F: FnOnce(&mut RunContext<'_>)>(f: F) {
        let clock = TaskClock::new();
        let mut externals = AllExternal::default();
        let mut presenter = NullPresenter::new(clock.clone());
        let mut ctx = RunContext {
            clock: &clock,
            externals: &mut externals,
            presenter: &mut presenter,
            max_wait: DEFAULT_MAX_WAIT,
        };
        f(&mut ctx);
    }

    #[test]
    fn args_arrive_in_declared_order() {
        let mut runner = EventRunner::new(
            "dot",
            Box::new(|_ctx, args| {
                assert_eq!(args.number(0), Some(1.0));
                assert_eq!(args.number(1), Some(0.5));
                Ok(EventOutcome::presented(args.number(0).unwrap()))
            }),
            &["onset", "position"],
        );
        let row = Row::new(1.0, "dot").with_col("position", 0.5);

        with_ctx(|ctx| {
            let outcome = runner.run(ctx, &row).unwrap();
            assert_eq!(outcome.flip, Some(1.0));
        });
    }

    #[test]
    fn missing_column_becomes_none_not_an_error() {
        let mut runner = EventRunner::new(
            "dot",
            Box::new(|_ctx, args| {
                assert_eq!(args.number(0), Some(0.0));
                assert!(args.get(1).is_none());
                Ok(EventOutcome::sentinel())
            }),
            &["onset", "position"],
        );
        let row = Row::new(0.0, "dot"); // no position column

        with_ctx(|ctx| {
            assert!(runner.run(ctx, &row).is_ok());
        });
    }
}
