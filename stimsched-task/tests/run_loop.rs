//! Full run-loop behavior: scheduling accuracy, sink ordering, tolerance for
//! malformed rows, and teardown guarantees.

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::{Result, bail};
use stimsched_core::{Row, Timeline};
use stimsched_external::ExternalCom;
use stimsched_task::{NullPresenter, RunOpts, Task};
use stimsched_timing::TaskClock;

/// Sink that records every call into a shared log, tagged with its label.
struct Recorder {
    label: &'static str,
    log: Rc<RefCell<Vec<String>>>,
    fail_on_event: bool,
}

impl Recorder {
    fn boxed(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn ExternalCom> {
        Box::new(Self {
            label,
            log: Rc::clone(log),
            fail_on_event: false,
        })
    }

    fn failing(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn ExternalCom> {
        Box::new(Self {
            label,
            log: Rc::clone(log),
            fail_on_event: true,
        })
    }
}

impl ExternalCom for Recorder {
    fn start(&mut self) -> Result<()> {
        self.log.borrow_mut().push(format!("{}:start", self.label));
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<String>> {
        self.log.borrow_mut().push(format!("{}:stop", self.label));
        Ok(None)
    }

    fn event(&mut self, code: &str) -> Result<()> {
        self.log
            .borrow_mut()
            .push(format!("{}:{}", self.label, code));
        if self.fail_on_event {
            bail!("device unplugged");
        }
        Ok(())
    }
}

fn task_with_sinks(log: &Rc<RefCell<Vec<String>>>, labels: &[&'static str]) -> Task {
    let clock = TaskClock::new();
    let presenter = NullPresenter::new(clock.clone());
    let mut task = Task::new(clock, Box::new(presenter));
    for label in labels {
        task.add_external(Recorder::boxed(label, log));
    }
    task
}

// short onsets so the suite stays fast; one polling quantum of slack
const TOL: f64 = 0.016;

#[test]
fn end_to_end_two_rows_two_sinks() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut task = task_with_sinks(&log, &["logger", "printer"]);
    task.add_default_events();

    let positions = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&positions);
    task.add_event_type(
        "dot",
        Box::new(move |ctx, args| {
            seen.borrow_mut().push(args.number(1));
            ctx.present_at(args.number(0).unwrap_or(0.0), "dot")
        }),
        &["onset", "position"],
    );

    let tl = Timeline::new(vec![
        Row::new(0.0, "iti"),
        Row::new(0.10, "dot").with_col("position", 0.5),
    ])
    .unwrap();
    task.set_onsets(tl).unwrap();

    let start_at = task.clock().now();
    let outcomes = task
        .run(RunOpts {
            start_at: Some(start_at),
            end_wait: 0.0,
        })
        .unwrap();

    assert_eq!(outcomes.len(), 2);
    let iti_flip = outcomes[0].flip.expect("iti presented");
    let dot_flip = outcomes[1].flip.expect("dot presented");
    assert!(iti_flip >= start_at && iti_flip - start_at < TOL);
    assert!(dot_flip >= start_at + 0.10 && dot_flip - (start_at + 0.10) < TOL);

    assert_eq!(*positions.borrow(), vec![Some(0.5)]);
    assert_eq!(
        *log.borrow(),
        vec![
            "logger:start",
            "printer:start",
            "logger:iti",
            "printer:iti",
            "logger:dot",
            "printer:dot",
            "logger:stop",
            "printer:stop",
        ]
    );
}

#[test]
fn unknown_event_rows_are_skipped_not_fatal() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut task = task_with_sinks(&log, &["logger"]);
    task.add_default_events();

    let tl = Timeline::new(vec![
        Row::new(0.0, "iti"),
        Row::new(0.05, "unknown_event"),
        Row::new(0.10, "iti"),
    ])
    .unwrap();
    task.set_onsets(tl).unwrap();

    let start_at = task.clock().now();
    let outcomes = task
        .run(RunOpts {
            start_at: Some(start_at),
            end_wait: 0.0,
        })
        .unwrap();

    assert_eq!(outcomes.len(), 3);
    assert!(outcomes[0].is_presented());
    assert!(!outcomes[1].is_presented(), "skipped row keeps its sentinel");
    assert!(outcomes[2].is_presented());
    // the surrounding rows still hit their own onsets
    let last = outcomes[2].flip.unwrap();
    assert!(last >= start_at + 0.10 && last - (start_at + 0.10) < TOL);
}

#[test]
fn sink_failure_aborts_but_still_stops_every_sink() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let clock = TaskClock::new();
    let presenter = NullPresenter::new(clock.clone());
    let mut task = Task::new(clock, Box::new(presenter));
    task.add_external(Recorder::failing("eeg", &log));
    task.add_external(Recorder::boxed("logger", &log));
    task.add_default_events();

    let tl = Timeline::new(vec![Row::new(0.0, "iti"), Row::new(0.05, "iti")]).unwrap();
    task.set_onsets(tl).unwrap();

    let err = task.run(RunOpts::default()).unwrap_err();
    assert!(err.to_string().contains("device unplugged"));

    let log = log.borrow();
    // the first event broadcast blew up, the second row never ran, and both
    // sinks were still told to stop
    assert!(log.contains(&"eeg:iti".to_string()));
    assert!(!log.iter().any(|l| l == "logger:iti"));
    assert!(log.ends_with(&["eeg:stop".to_string(), "logger:stop".to_string()]));
}

#[test]
fn onset_past_the_ceiling_is_fatal_and_stops_sinks() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut task = task_with_sinks(&log, &["logger"]);
    task.add_default_events();

    let tl = Timeline::new(vec![Row::new(1000.0, "iti")]).unwrap();
    task.set_onsets(tl).unwrap();

    let err = task.run(RunOpts::default()).unwrap_err();
    assert!(err.to_string().contains("check onset units"));
    assert_eq!(
        *log.borrow(),
        vec!["logger:start", "logger:stop"],
        "teardown still reached the sink"
    );
}

#[test]
fn missing_argument_still_invokes_the_handler() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut task = task_with_sinks(&log, &["logger"]);

    let got = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&got);
    task.add_event_type(
        "dot",
        Box::new(move |ctx, args| {
            seen.borrow_mut().push(args.number(1));
            ctx.present_at(args.number(0).unwrap_or(0.0), "dot")
        }),
        &["onset", "position"],
    );

    let tl = Timeline::new(vec![Row::new(0.0, "dot")]).unwrap();
    task.set_onsets(tl).unwrap();
    let outcomes = task.run(RunOpts::default()).unwrap();

    assert!(outcomes[0].is_presented());
    assert_eq!(*got.borrow(), vec![None]);
}

#[test]
fn end_wait_holds_before_teardown() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let mut task = task_with_sinks(&log, &["logger"]);
    task.add_default_events();

    let tl = Timeline::new(vec![Row::new(0.0, "iti")]).unwrap();
    task.set_onsets(tl).unwrap();

    let before = task.clock().now();
    task.run(RunOpts {
        start_at: Some(before),
        end_wait: 0.05,
    })
    .unwrap();
    assert!(task.clock().now() - before >= 0.05);
}
