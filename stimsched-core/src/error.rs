use thiserror::Error;

/// Fatal configuration errors. These always indicate a programming mistake by
/// the task author and abort the run rather than risk a malformed session.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("row {index}: onset {onset} must be a finite, non-negative number of seconds")]
    BadOnset { index: usize, onset: f64 },

    #[error("row {index}: onset {onset} precedes the previous row's onset {prev}")]
    NonMonotonicOnset { index: usize, onset: f64, prev: f64 },

    #[error("cannot parse timeline: {0}")]
    Parse(String),

    #[error("no timing exists. bind a timeline with set_onsets()")]
    NoTimeline,

    #[error("task already {state}; call set_onsets() with a fresh timeline before run()")]
    NotScheduled { state: &'static str },
}
