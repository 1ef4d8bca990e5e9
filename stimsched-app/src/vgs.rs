//! Visually-guided-saccade style timeline: for every shuffled
//! (position, delay) pair, a cue held for the delay, a brief blank, then the
//! target dot. Onsets accumulate, so the table is valid by construction.

use rand::Rng;
use rand::seq::SliceRandom;
use stimsched_core::{Row, Timeline};

pub const POSITIONS: [f64; 4] = [-0.875, -0.5, 0.5, 0.875];
pub const DELAYS: [f64; 2] = [2.5, 7.5];

const BLANK_DUR: f64 = 0.1;
const TARGET_DUR: f64 = 1.0;

/// Every position crossed with every delay, permuted `reps` times.
pub fn random_positions<R: Rng + ?Sized>(rng: &mut R, reps: usize) -> Vec<(f64, f64)> {
    let pairs: Vec<(f64, f64)> = POSITIONS
        .iter()
        .flat_map(|&p| DELAYS.iter().map(move |&d| (p, d)))
        .collect();

    let mut out = Vec::with_capacity(pairs.len() * reps);
    for _ in 0..reps {
        let mut block = pairs.clone();
        block.shuffle(rng);
        out.extend(block);
    }
    out
}

pub fn random_pos_timeline<R: Rng + ?Sized>(rng: &mut R, reps: usize) -> Timeline {
    let mut rows = Vec::new();
    let mut onset = 0.0;
    for (position, delay) in random_positions(rng, reps) {
        for event in ["vgs_cue", "blank", "vgs_target"] {
            rows.push(
                Row::new(onset, event)
                    .with_col("position", position)
                    .with_col("code", format!("{}_{}_{}", event, delay, position)),
            );
            onset += match event {
                "vgs_cue" => delay,
                "blank" => BLANK_DUR,
                _ => TARGET_DUR,
            };
        }
    }
    Timeline::new(rows).expect("accumulated onsets are monotonic")
}
