use anyhow::Result;

/// A recording collaborator: eye tracker, EEG trigger port, log file.
///
/// The scheduling core only ever speaks these four calls; whatever protocol a
/// device needs behind them is the sink's own concern. Errors are never
/// swallowed on this path: a disconnected recorder should stop the run, not
/// quietly produce an incomplete session.
pub trait ExternalCom {
    /// Point the sink at a new output file. Sinks without file output ignore
    /// this.
    fn new_file(&mut self, _name: &str) -> Result<()> {
        Ok(())
    }

    /// Begin recording.
    fn start(&mut self) -> Result<()>;

    /// Stop recording. May return a save path for the operator's records.
    fn stop(&mut self) -> Result<Option<String>>;

    /// Record one timeline event code.
    fn event(&mut self, code: &str) -> Result<()>;
}

/// Ordered broadcast to every registered sink.
///
/// List order is firing order on every call, so a latency-sensitive sink
/// (hardware trigger) can be `prepend`ed ahead of slower disk writers.
#[derive(Default)]
pub struct AllExternal {
    externals: Vec<Box<dyn ExternalCom>>,
}

impl AllExternal {
    pub fn new(externals: Vec<Box<dyn ExternalCom>>) -> Self {
        Self { externals }
    }

    pub fn append(&mut self, external: Box<dyn ExternalCom>) {
        self.externals.push(external);
    }

    /// Insert at the front so this sink fires before all others.
    pub fn prepend(&mut self, external: Box<dyn ExternalCom>) {
        self.externals.insert(0, external);
    }

    pub fn len(&self) -> usize {
        self.externals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.externals.is_empty()
    }

    pub fn new_file(&mut self, name: &str) -> Result<()> {
        for ext in &mut self.externals {
            ext.new_file(name)?;
        }
        Ok(())
    }

    pub fn start(&mut self) -> Result<()> {
        for ext in &mut self.externals {
            ext.start()?;
        }
        Ok(())
    }

    /// Stop every sink, collecting their save paths in list order.
    pub fn stop(&mut self) -> Result<Vec<Option<String>>> {
        let mut saved = Vec::with_capacity(self.externals.len());
        for ext in &mut self.externals {
            saved.push(ext.stop()?);
        }
        Ok(saved)
    }

    pub fn event(&mut self, code: &str) -> Result<()> {
        for ext in &mut self.externals {
            ext.event(code)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        label: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Recorder {
        fn boxed(label: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<dyn ExternalCom> {
            Box::new(Self {
                label,
                log: Rc::clone(log),
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
            Ok(Some(format!("{}.dat", self.label)))
        }

        fn event(&mut self, code: &str) -> Result<()> {
            self.log
                .borrow_mut()
                .push(format!("{}:event {}", self.label, code));
            Ok(())
        }
    }

    #[test]
    fn broadcasts_follow_list_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut all = AllExternal::default();
        all.append(Recorder::boxed("a", &log));
        all.append(Recorder::boxed("b", &log));
        all.append(Recorder::boxed("c", &log));

        all.start().unwrap();
        all.event("cue").unwrap();
        all.stop().unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "a:start", "b:start", "c:start", "a:event cue", "b:event cue", "c:event cue",
                "a:stop", "b:stop", "c:stop",
            ]
        );
    }

    #[test]
    fn prepend_front_loads_a_sink() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut all = AllExternal::default();
        all.append(Recorder::boxed("slow", &log));
        all.prepend(Recorder::boxed("ttl", &log));

        all.event("dot").unwrap();
        assert_eq!(*log.borrow(), vec!["ttl:event dot", "slow:event dot"]);
    }

    #[test]
    fn stop_collects_paths_in_sink_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut all = AllExternal::default();
        all.append(Recorder::boxed("a", &log));
        all.append(Recorder::boxed("b", &log));

        let saved = all.stop().unwrap();
        assert_eq!(
            saved,
            vec![Some("a.dat".to_string()), Some("b.dat".to_string())]
        );
    }
}
