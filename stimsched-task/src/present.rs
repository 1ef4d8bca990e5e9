use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use stimsched_timing::TaskClock;

/// Token for a prepared-but-uncommitted frame. Only `Presenter::prepare`
/// mints these, so a handler cannot commit a frame it never staged.
#[derive(Debug)]
pub struct PresentationHandle {
    pub frame: u64,
}

/// The rendering collaborator, reduced to the two steps the scheduler needs.
///
/// `prepare` does all draw work up front (back buffer, draw-call batching,
/// whatever the display stack wants) and returns a handle; `commit` makes the
/// prepared frame observable and reports when that actually happened on the
/// task clock. Splitting the two keeps the onset wait between them tight:
/// everything slow happens before the wait, only the cheap commit after it.
pub trait Presenter {
    fn prepare(&mut self) -> Result<PresentationHandle>;
    fn commit(&mut self, handle: PresentationHandle) -> Result<f64>;
}

/// Handlers usually stage their stimulus on a presenter they share with the
/// task, so a `Rc<RefCell<_>>` wrapper is the common way to hand one in.
impl<P: Presenter> Presenter for Rc<RefCell<P>> {
    fn prepare(&mut self) -> Result<PresentationHandle> {
        self.borrow_mut().prepare()
    }

    fn commit(&mut self, handle: PresentationHandle) -> Result<f64> {
        self.borrow_mut().commit(handle)
    }
}

/// Headless presenter: commits are instantaneous and only the clock is
/// consulted. Stands in for a real display in tests and dry runs.
pub struct NullPresenter {
    clock: TaskClock,
    frames: u64,
}

impl NullPresenter {
    pub fn new(clock: TaskClock) -> Self {
        Self { clock, frames: 0 }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Presenter for NullPresenter {
    fn prepare(&mut self) -> Result<PresentationHandle> {
        Ok(PresentationHandle { frame: self.frames })
    }

    fn commit(&mut self, _handle: PresentationHandle) -> Result<f64> {
        self.frames += 1;
        Ok(self.clock.now())
    }
}
