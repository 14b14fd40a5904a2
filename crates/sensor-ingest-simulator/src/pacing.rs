//! Randomized wait between the actions of one simulated user.

use rand::Rng;
use std::time::Duration;

/// Uniform pacing interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(200),
            max: Duration::from_millis(1000),
        }
    }
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Draws one wait uniformly from `[min, max]`.
    ///
    /// A reversed interval collapses to `min`; `Config::validate` rejects it
    /// before a run starts.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let secs = rng.gen_range(self.min.as_secs_f64()..=self.max.as_secs_f64());
        Duration::try_from_secs_f64(secs)
            .unwrap_or(self.max)
            .clamp(self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_sample_within_bounds() {
        let pacing = Pacing::default();
        let mut rng = StdRng::seed_from_u64(8);
        let samples: Vec<_> = (0..1000).map(|_| pacing.sample(&mut rng)).collect();

        assert!(samples
            .iter()
            .all(|d| *d >= Duration::from_millis(200) && *d <= Duration::from_secs(1)));

        // Uniform over 800ms; the mean sits near 600ms.
        let mean = samples.iter().map(|d| d.as_secs_f64()).sum::<f64>() / 1000.0;
        assert!((mean - 0.6).abs() < 0.05, "mean {}", mean);
    }

    #[test]
    fn test_degenerate_interval() {
        let pacing = Pacing::new(Duration::from_millis(50), Duration::from_millis(50));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pacing.sample(&mut rng), Duration::from_millis(50));
    }

    #[test]
    fn test_waits_beyond_u64_nanos() {
        let min = Duration::from_secs(10_000_000_000);
        let max = Duration::from_secs(20_000_000_000);
        let pacing = Pacing::new(min, max);
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let wait = pacing.sample(&mut rng);
            assert!(wait >= min && wait <= max, "{:?}", wait);
        }
    }
}
