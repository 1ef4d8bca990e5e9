pub mod clock;

pub use clock::{TaskClock, WaitError, DEFAULT_MAX_WAIT};
