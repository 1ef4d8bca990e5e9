//! Console demo tasks for the scheduling core, run without any recording
//! hardware attached.
//!
//! The default demo alternates a two-argument message event with the default
//! fixation. Set `STIMSCHED_DEMO=vgs` for a randomized cue/blank/target run
//! in the manner of a visually guided saccade task.

mod vgs;

use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use stimsched_core::{Row, Timeline};
use stimsched_external::{Console, FileLogger};
use stimsched_task::{PresentationHandle, Presenter, RunOpts, Task};
use stimsched_timing::TaskClock;

/// Text "display": staged content is printed at commit time, which is as
/// close to a flip as a terminal gets.
struct ConsolePresenter {
    clock: TaskClock,
    staged: Option<String>,
    frames: u64,
}

impl ConsolePresenter {
    fn new(clock: TaskClock) -> Self {
        Self {
            clock,
            staged: None,
            frames: 0,
        }
    }

    fn set_text(&mut self, text: impl Into<String>) {
        self.staged = Some(text.into());
    }
}

impl Presenter for ConsolePresenter {
    fn prepare(&mut self) -> Result<PresentationHandle> {
        Ok(PresentationHandle { frame: self.frames })
    }

    fn commit(&mut self, _handle: PresentationHandle) -> Result<f64> {
        let now = self.clock.now();
        match self.staged.take() {
            Some(text) => println!("[{:8.3}] {}", now, text),
            None => println!("[{:8.3}] +", now), // fixation cross
        }
        self.frames += 1;
        Ok(now)
    }
}

/// EEG-style trigger codes: event-class base plus a position bin, so a code
/// survives the trip through an 8-bit port.
fn ttl_code(event: &str, position: Option<f64>) -> u8 {
    let event_base: u8 = match event {
        "iti" => 10,
        "cue" => 30,
        "dot" | "target" => 40,
        _ => 50,
    };
    let pos_bin: u8 = match position {
        None => 0,
        Some(p) if p < -0.5 => 1,
        Some(p) if p < 0.0 => 2,
        Some(p) if p < 0.5 => 3,
        Some(p) if p < 1.0 => 4,
        Some(_) => 5,
    };
    event_base + pos_bin
}

/// Reduce a marked code string ("vgs_target_2.5_-0.5", "iti") to its TTL
/// byte: the event word after any task prefix, plus a parsed trailing
/// position when one is there.
fn ttl_lookup(code: &str) -> u8 {
    let first = code.split_whitespace().next().unwrap_or("");
    let mut segments = first.trim_start_matches("vgs_").split('_');
    let event = segments.next().unwrap_or("");
    let position = first.rsplit('_').next().and_then(|s| s.parse::<f64>().ok());
    ttl_code(event, position)
}

fn hello_world_timeline() -> Timeline {
    Timeline::new(vec![
        Row::new(0.0, "mesg").with_col("mesg", "Hello").with_col("name", "World"),
        Row::new(1.0, "iti"),
        Row::new(1.5, "mesg").with_col("mesg", "Goodbye").with_col("name", "cruel world"),
        Row::new(2.5, "iti"),
        Row::new(3.0, "mesg").with_col("mesg", "DONE").with_col("name", ""),
    ])
    .expect("hello-world onsets are fixed and ordered")
}

fn register_hello_world(task: &mut Task, stims: Rc<RefCell<ConsolePresenter>>) {
    task.add_default_events();
    task.add_event_type(
        "mesg",
        Box::new(move |ctx, args| {
            let mesg = args.text(1).unwrap_or("").to_string();
            let name = args.text(2).unwrap_or("").to_string();
            stims.borrow_mut().set_text(format!("{} {}", mesg, name));
            ctx.present_at(
                args.number(0).unwrap_or(0.0),
                &format!("mesg {} {}", mesg, name),
            )
        }),
        &["onset", "mesg", "name"],
    );
}

fn register_vgs(task: &mut Task, stims: Rc<RefCell<ConsolePresenter>>) {
    let cue_stims = Rc::clone(&stims);
    task.add_event_type(
        "vgs_cue",
        Box::new(move |ctx, args| {
            cue_stims.borrow_mut().set_text("+");
            ctx.present_at(
                args.number(0).unwrap_or(0.0),
                args.text(1).unwrap_or("vgs_cue"),
            )
        }),
        &["onset", "code"],
    );

    let blank_stims = Rc::clone(&stims);
    task.add_event_type(
        "blank",
        Box::new(move |ctx, args| {
            blank_stims.borrow_mut().set_text("");
            ctx.present_at(
                args.number(0).unwrap_or(0.0),
                args.text(1).unwrap_or("blank"),
            )
        }),
        &["onset", "code"],
    );

    task.add_event_type(
        "vgs_target",
        Box::new(move |ctx, args| {
            let position = args.number(1).unwrap_or(0.0);
            stims.borrow_mut().set_text(format!("o  @ {:+.3}", position));
            ctx.present_at(
                args.number(0).unwrap_or(0.0),
                args.text(2).unwrap_or("vgs_target"),
            )
        }),
        &["onset", "position", "code"],
    );
}

fn main() -> Result<()> {
    env_logger::init();

    let clock = TaskClock::new();
    let presenter = Rc::new(RefCell::new(ConsolePresenter::new(clock.clone())));
    let mut task = Task::new(clock.clone(), Box::new(Rc::clone(&presenter)));

    task.add_external(Box::new(Console::with_lookup(clock.clone(), |code| {
        ttl_lookup(code).to_string()
    })));
    task.add_external(Box::new(FileLogger::new(clock.clone())));

    let demo = std::env::var("STIMSCHED_DEMO").unwrap_or_default();
    let timeline = if demo == "vgs" {
        register_vgs(&mut task, presenter);
        task.set_max_wait(60.0); // 7.5s cue delays, plus operator slack
        vgs::random_pos_timeline(&mut rand::rng(), 1)
    } else {
        register_hello_world(&mut task, presenter);
        hello_world_timeline()
    };

    let log_path = std::env::temp_dir().join("stimsched_demo.log");
    task.new_file(log_path.to_str().expect("temp path is utf-8"))?;

    task.set_onsets(timeline)?;
    // hold a second so the last stimulus stays visible before teardown
    let flip_times = task.run(RunOpts {
        start_at: None,
        end_wait: 1.0,
    })?;

    log::info!("run complete, {} events, log at {}", flip_times.len(), log_path.display());
    println!("fliptimes: {}", serde_json::to_string_pretty(&flip_times)?);
    Ok(())
}
