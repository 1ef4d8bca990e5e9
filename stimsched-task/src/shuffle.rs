use anyhow::{Result, bail};
use rand::Rng;
use rand::seq::SliceRandom;

/// Shuffled repetition of `items` stretched or truncated to `ntrials`.
///
/// The whole set is repeated as many times as fits, then a shuffled truncated
/// copy tops up the remainder and the result is shuffled again, keeping counts
/// as balanced as `ntrials` allows.
pub fn shuf_for_ntrials<T: Clone, R: Rng + ?Sized>(
    rng: &mut R,
    items: &[T],
    ntrials: usize,
) -> Vec<T> {
    if items.is_empty() || ntrials == 0 {
        return Vec::new();
    }

    let nfull = ntrials / items.len();
    let over = ntrials % items.len();

    let mut out = Vec::with_capacity(ntrials);
    for _ in 0..nfull {
        out.extend_from_slice(items);
    }
    if over > 0 {
        let mut tail = items.to_vec();
        tail.shuffle(rng);
        out.extend(tail.into_iter().take(over));
    }
    out.shuffle(rng);
    out
}

/// Distribute `total` into `n` integer bins that sum exactly to `total`
/// (e.g. 10 catch events over 5 runs), shuffled so the fuller bin lands
/// anywhere. Errors when the split cannot be made exact.
pub fn dist_total_into_n<R: Rng + ?Sized>(
    rng: &mut R,
    total: usize,
    n: usize,
) -> Result<Vec<usize>> {
    if n == 0 || total == 0 {
        return Ok(Vec::new());
    }

    let base = total / n;
    let extra = total % n;
    // mirror the ceil-first/floor-rest split: only a single oversized bin
    if extra > 1 {
        bail!("total {} cannot be split into {} near-equal bins", total, n);
    }

    let mut bins = vec![base; n];
    bins[0] += extra;
    bins.shuffle(rng);
    Ok(bins)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn shuffle_matches_requested_length() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(shuf_for_ntrials(&mut rng, &[1, 2, 3, 4, 5], 40).len(), 40);
        assert_eq!(shuf_for_ntrials(&mut rng, &[1, 2, 3, 4, 5], 2).len(), 2);
        assert!(shuf_for_ntrials(&mut rng, &[1, 2, 3], 0).is_empty());
        assert!(shuf_for_ntrials::<i32, _>(&mut rng, &[], 10).is_empty());
    }

    #[test]
    fn full_multiples_keep_counts_balanced() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut out = shuf_for_ntrials(&mut rng, &[1, 2, 3], 9);
        out.sort_unstable();
        assert_eq!(out, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn dist_sums_to_total() {
        let mut rng = StdRng::seed_from_u64(7);
        let bins = dist_total_into_n(&mut rng, 10, 5).unwrap();
        assert_eq!(bins.len(), 5);
        assert_eq!(bins.iter().sum::<usize>(), 10);

        let bins = dist_total_into_n(&mut rng, 11, 5).unwrap();
        assert_eq!(bins.iter().sum::<usize>(), 11);
    }

    #[test]
    fn dist_rejects_uneven_splits() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(dist_total_into_n(&mut rng, 12, 5).is_err());
    }

    #[test]
    fn dist_handles_degenerate_inputs() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(dist_total_into_n(&mut rng, 0, 5).unwrap().is_empty());
        assert!(dist_total_into_n(&mut rng, 5, 0).unwrap().is_empty());
    }
}
