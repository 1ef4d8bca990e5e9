pub mod context;
pub mod present;
pub mod runner;
pub mod shuffle;
pub mod task;

pub use context::RunContext;
pub use present::{NullPresenter, PresentationHandle, Presenter};
pub use runner::{EventArgs, EventFn, EventRunner};
pub use shuffle::{dist_total_into_n, shuf_for_ntrials};
pub use task::{RunOpts, RunState, Task};
