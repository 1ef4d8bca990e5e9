use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use stimsched_timing::TaskClock;

use crate::fanout::ExternalCom;

/// Console sink: timestamps every call to stdout. Useful while developing a
/// task without any recording hardware attached.
pub struct Console {
    clock: TaskClock,
    lookup: Option<Box<dyn Fn(&str) -> String>>,
}

impl Console {
    pub fn new(clock: TaskClock) -> Self {
        Self {
            clock,
            lookup: None,
        }
    }

    /// Also print the translated code for sinks that remap events (e.g. a TTL
    /// table), so the operator can sanity-check the mapping live.
    pub fn with_lookup(clock: TaskClock, lookup: impl Fn(&str) -> String + 'static) -> Self {
        Self {
            clock,
            lookup: Some(Box::new(lookup)),
        }
    }

    fn print_time(&self, msg: &str) {
        println!("extcom: {:.2} {}", self.clock.now(), msg);
    }
}

impl ExternalCom for Console {
    fn new_file(&mut self, name: &str) -> Result<()> {
        self.print_time(&format!("new file {}", name));
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.print_time("start");
        Ok(())
    }

    fn stop(&mut self) -> Result<Option<String>> {
        self.print_time("stop");
        Ok(None)
    }

    fn event(&mut self, code: &str) -> Result<()> {
        match &self.lookup {
            Some(lookup) => self.print_time(&format!("event {} => {}", code, lookup(code))),
            None => self.print_time(&format!("event {}", code)),
        }
        Ok(())
    }
}

/// Plain-text log sink: one `"<time> <message>"` line per call, appended to
/// the file named by `new_file`. `stop` closes the file and reports its path.
pub struct FileLogger {
    clock: TaskClock,
    path: Option<PathBuf>,
    fh: Option<BufWriter<File>>,
}

impl FileLogger {
    pub fn new(clock: TaskClock) -> Self {
        Self {
            clock,
            path: None,
            fh: None,
        }
    }

    fn write_line(&mut self, msg: &str) -> Result<()> {
        let now = self.clock.now();
        let Some(fh) = self.fh.as_mut() else {
            bail!("no log file open; call new_file() before start()");
        };
        writeln!(fh, "{:.5} {}", now, msg)?;
        Ok(())
    }
}

impl ExternalCom for FileLogger {
    fn new_file(&mut self, name: &str) -> Result<()> {
        let path = PathBuf::from(name);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        self.fh = Some(BufWriter::new(file));
        self.path = Some(path);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.write_line("starting task")
    }

    fn stop(&mut self) -> Result<Option<String>> {
        self.write_line("stopping task")?;
        if let Some(mut fh) = self.fh.take() {
            fh.flush()?;
        }
        Ok(self
            .path
            .take()
            .map(|p| p.display().to_string()))
    }

    fn event(&mut self, code: &str) -> Result<()> {
        self.write_line(code)
    }
}

/// EEG trigger-port sink, modeled after a parallel-port TTL line.
///
/// Event codes are remapped to one byte by the caller's lookup table and
/// written straight to the port. The line is optionally zeroed after a short
/// hold so back-to-back triggers stay distinguishable; note that hold costs
/// ~10 ms of latency on every event, so prepend this sink ahead of slower
/// writers.
pub struct TtlPort<W: Write> {
    port: W,
    clock: TaskClock,
    lookup: Box<dyn Fn(&str) -> u8>,
    zero_hold: Option<f64>,
}

/// Record-control codes the EEG amp listens for.
pub const TTL_START: u8 = 128;
pub const TTL_STOP: u8 = 129;
const TTL_ZERO_HOLD: f64 = 0.010;

impl<W: Write> TtlPort<W> {
    pub fn new(port: W, clock: TaskClock, lookup: impl Fn(&str) -> u8 + 'static) -> Self {
        Self {
            port,
            clock,
            lookup: Box::new(lookup),
            zero_hold: Some(TTL_ZERO_HOLD),
        }
    }

    /// Leave the line at the trigger value instead of zeroing it.
    pub fn without_zeroing(mut self) -> Self {
        self.zero_hold = None;
        self
    }

    fn send(&mut self, trigger: u8) -> Result<()> {
        self.port.write_all(&[trigger])?;
        self.port.flush()?;
        Ok(())
    }
}

impl<W: Write> ExternalCom for TtlPort<W> {
    // a trigger line has no files to rotate

    fn start(&mut self) -> Result<()> {
        self.send(TTL_START)
    }

    fn stop(&mut self) -> Result<Option<String>> {
        self.send(TTL_STOP)?;
        Ok(None)
    }

    fn event(&mut self, code: &str) -> Result<()> {
        let trigger = (self.lookup)(code);
        self.send(trigger)?;
        if let Some(hold) = self.zero_hold {
            self.clock.wait(hold);
            self.send(0)?;
        }
        Ok(())
    }
}
