use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Tuning knobs for a nesting run.
///
/// All fields have workable defaults; `validate` guards the ranges the
/// engine assumes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestConfig {
    /// Maximum deviation allowed when simplifying input outlines, in nest units.
    pub curve_tolerance: f64,
    /// Minimum gap to keep between parts (and from the bin edge), in nest units.
    pub spacing: f64,
    /// Number of discrete rotation steps, evenly dividing 360 degrees.
    pub rotations: u32,
    /// Individuals per generation.
    pub population_size: usize,
    /// Generations to run before the session finishes on its own.
    pub generations: usize,
    /// Per-gene mutation probability, in percent.
    pub mutation_rate: u32,
    /// Nest parts inside holes of other parts when they fit.
    pub use_holes: bool,
    /// Trace concave boundaries exactly instead of using the convex
    /// decomposition approximation. Slower, tighter packs.
    pub explore_concave: bool,
    /// Fixed seed for reproducible runs. Entropy-seeded when absent.
    pub prng_seed: Option<u64>,
}

impl Default for NestConfig {
    fn default() -> Self {
        NestConfig {
            curve_tolerance: 0.3,
            spacing: 0.0,
            rotations: 4,
            population_size: 10,
            generations: 10,
            mutation_rate: 10,
            use_holes: true,
            explore_concave: false,
            prng_seed: None,
        }
    }
}

impl NestConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.curve_tolerance > 0.0,
            "curve_tolerance must be positive, got {}",
            self.curve_tolerance
        );
        ensure!(
            self.spacing >= 0.0,
            "spacing cannot be negative, got {}",
            self.spacing
        );
        ensure!(self.rotations >= 1, "rotations must be at least 1");
        ensure!(
            self.population_size > 2,
            "population_size must exceed 2, got {}",
            self.population_size
        );
        ensure!(self.generations >= 1, "generations must be at least 1");
        ensure!(
            (1..=100).contains(&self.mutation_rate),
            "mutation_rate must be in 1..=100, got {}",
            self.mutation_rate
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(NestConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut cfg = NestConfig::default();
        cfg.mutation_rate = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = NestConfig::default();
        cfg.population_size = 2;
        assert!(cfg.validate().is_err());

        let mut cfg = NestConfig::default();
        cfg.curve_tolerance = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = NestConfig {
            prng_seed: Some(7),
            rotations: 8,
            ..NestConfig::default()
        };
        let text = serde_json::to_string(&cfg).unwrap();
        let back: NestConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }
}
