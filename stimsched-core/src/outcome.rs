use serde::{Deserialize, Serialize};

/// What actually happened for one timeline row. Every row gets a sentinel
/// outcome before the run starts; only that row's handler overwrites it, so a
/// skipped row stays at the sentinel in the returned list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    /// Realized presentation time on the task clock, `None` until the row ran.
    pub flip: Option<f64>,
}

impl EventOutcome {
    pub fn sentinel() -> Self {
        Self { flip: None }
    }

    pub fn presented(flip: f64) -> Self {
        Self { flip: Some(flip) }
    }

    pub fn is_presented(&self) -> bool {
        self.flip.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_not_presented() {
        assert!(!EventOutcome::sentinel().is_presented());
        assert!(EventOutcome::presented(1.25).is_presented());
    }
}
