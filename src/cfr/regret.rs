//! Regret matching.
//!
//! ```text
//! σ(a) = max(R(a), 0) / Σ max(R(b), 0)     if the sum is positive
//! σ(a) = 1 / n                              otherwise
//! ```
//!
//! The time-averaged strategy is the normalised cumulative strategy weight;
//! it is undefined (None) while no weight has been accumulated.

use rand::Rng;

/// Current strategy from cumulative regrets.
pub fn regret_matching(regrets: &[f64]) -> Vec<f64> {
    let num_actions = regrets.len();
    let positive: Vec<f64> = regrets.iter().map(|&r| r.max(0.0)).collect();
    let sum: f64 = positive.iter().sum();

    if sum > 0.0 {
        positive.iter().map(|&r| r / sum).collect()
    } else {
        vec![1.0 / num_actions as f64; num_actions]
    }
}

/// Average strategy from cumulative strategy weights.
///
/// Returns `None` when the total weight is zero: the information set was
/// never reached with positive own-reach and has no average to report.
pub fn average_strategy(strategy_sum: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = strategy_sum.iter().sum();
    if total > 0.0 {
        Some(strategy_sum.iter().map(|&w| w / total).collect())
    } else {
        None
    }
}

/// Mix `strategy` with the uniform distribution: `ε·uniform + (1−ε)·σ`.
pub fn explore(strategy: &[f64], exploration: f64) -> Vec<f64> {
    if exploration <= 0.0 {
        return strategy.to_vec();
    }
    let uniform = 1.0 / strategy.len() as f64;
    strategy
        .iter()
        .map(|&p| exploration * uniform + (1.0 - exploration) * p)
        .collect()
}

/// Sample an index according to a probability distribution.
///
/// Rounding can leave the cumulative sum a hair below `r`; the fallback is
/// the last index with positive probability, never a zero-probability one.
pub fn sample_index<R: Rng + ?Sized>(probabilities: &[f64], rng: &mut R) -> usize {
    let total: f64 = probabilities.iter().sum();
    let r: f64 = rng.gen::<f64>() * total;
    let mut cumsum = 0.0;

    for (i, &p) in probabilities.iter().enumerate() {
        cumsum += p;
        if r < cumsum {
            return i;
        }
    }

    probabilities
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or(probabilities.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_regret_matching_proportional() {
        let strategy = regret_matching(&[3.0, -2.0, 1.0]);
        assert!((strategy[0] - 0.75).abs() < 1e-12);
        assert_eq!(strategy[1], 0.0);
        assert!((strategy[2] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_regret_matching_uniform_fallback() {
        assert_eq!(regret_matching(&[0.0, 0.0]), vec![0.5, 0.5]);
        assert_eq!(regret_matching(&[-1.0, -5.0, 0.0, -0.1]), vec![0.25; 4]);
    }

    #[test]
    fn test_average_strategy() {
        assert_eq!(average_strategy(&[0.0, 0.0]), None);
        let avg = average_strategy(&[1.0, 3.0]).unwrap();
        assert_eq!(avg, vec![0.25, 0.75]);
    }

    #[test]
    fn test_explore_mixes_uniform() {
        let mixed = explore(&[1.0, 0.0], 0.5);
        assert_eq!(mixed, vec![0.75, 0.25]);
        assert_eq!(explore(&[0.2, 0.8], 0.0), vec![0.2, 0.8]);
    }

    #[test]
    fn test_sample_index_respects_distribution() {
        let mut rng = StdRng::seed_from_u64(7);
        let probabilities = [0.1, 0.0, 0.9];
        let mut counts = [0usize; 3];
        for _ in 0..10_000 {
            counts[sample_index(&probabilities, &mut rng)] += 1;
        }
        assert_eq!(counts[1], 0);
        assert!(counts[2] > 8_500, "counts {:?}", counts);
        assert!(counts[0] > 700, "counts {:?}", counts);
    }

    #[test]
    fn test_sample_index_never_picks_zero_probability_tail() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1_000 {
            assert_eq!(sample_index(&[1.0, 0.0], &mut rng), 0);
        }
    }
}
