//! Discretization policies
//!
//! After descaling a generated value back toward a packet attribute, each feature
//! decides how to recover something physically valid. Policies are plain data so
//! a feature vector can carry one per column.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How a continuous value is mapped back onto a valid feature value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Clip {
    /// Pass through unchanged
    Identity,
    /// Snap to -1 or +1 by sign; zero goes to +1
    Sign,
    /// `floor(value + U[0, 1))`
    RandomRound,
    /// Clamp into `[min, max]`
    Clamp { min: f64, max: f64 },
}

impl Clip {
    pub fn apply<R: Rng + ?Sized>(&self, value: f64, rng: &mut R) -> f64 {
        match *self {
            Clip::Identity => value,
            Clip::Sign => {
                if value < 0.0 {
                    -1.0
                } else {
                    1.0
                }
            }
            Clip::RandomRound => random_round(value, rng),
            Clip::Clamp { min, max } => value.clamp(min, max),
        }
    }
}

/// Randomly round up or down so that fractional parts survive in expectation.
pub fn random_round<R: Rng + ?Sized>(value: f64, rng: &mut R) -> f64 {
    (value + rng.gen::<f64>()).floor()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sign_snaps_ties_forward() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(Clip::Sign.apply(-0.2, &mut rng), -1.0);
        assert_eq!(Clip::Sign.apply(0.0, &mut rng), 1.0);
        assert_eq!(Clip::Sign.apply(3.5, &mut rng), 1.0);
    }

    #[test]
    fn test_random_round_stays_adjacent() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let rounded = random_round(41.3, &mut rng);
            assert!(rounded == 41.0 || rounded == 42.0);
        }
        assert_eq!(random_round(12.0, &mut rng), 12.0);
    }

    #[test]
    fn test_random_round_preserves_mean() {
        let mut rng = StdRng::seed_from_u64(3);
        let samples = 20_000;
        let total: f64 = (0..samples).map(|_| random_round(10.25, &mut rng)).sum();
        let mean = total / samples as f64;
        assert!((mean - 10.25).abs() < 0.02, "mean was {mean}");
    }

    #[test]
    fn test_clamp_and_identity() {
        let mut rng = StdRng::seed_from_u64(1);
        let clamp = Clip::Clamp { min: 0.0, max: 8.0 };
        assert_eq!(clamp.apply(9.3, &mut rng), 8.0);
        assert_eq!(clamp.apply(-1.0, &mut rng), 0.0);
        assert_eq!(Clip::Identity.apply(-1.5, &mut rng), -1.5);
    }
}
