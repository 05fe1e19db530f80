//! Genetic optimizer over placement orderings and per-part rotations.
//!
//! A gene is a (part index, rotation) pair; an individual is a full
//! permutation of the part list. Fitness is assigned externally by the
//! placement stage and lower is better.

use log::debug;
use rand::Rng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

use crate::config::NestConfig;
use crate::geometry::{Bounds, Polygon};

#[derive(Debug, Clone)]
pub struct Individual {
    /// Indices into the part list, in placement order.
    pub order: Vec<usize>,
    /// Rotation in degrees for each entry of `order`.
    pub rotations: Vec<f64>,
    /// Set by the evaluation stage. `None` until evaluated.
    pub fitness: Option<f64>,
}

pub struct GeneticAlgorithm {
    pub population: Vec<Individual>,
    parts: Vec<Polygon>,
    bin_bounds: Bounds,
    population_size: usize,
    mutation_rate: u32,
    rotation_steps: u32,
    rng: SmallRng,
}

impl GeneticAlgorithm {
    /// Seeds the population from a single ancestor ordered by descending
    /// part area, diversified through mutation.
    pub fn new(parts: &[Polygon], bin_bounds: Bounds, config: &NestConfig, rng: SmallRng) -> Self {
        let mut adam: Vec<usize> = (0..parts.len()).collect();
        adam.sort_by(|&a, &b| {
            parts[b]
                .area()
                .partial_cmp(&parts[a].area())
                .expect("NaN part area")
        });

        let mut ga = GeneticAlgorithm {
            population: vec![],
            parts: parts.to_vec(),
            bin_bounds,
            population_size: config.population_size,
            mutation_rate: config.mutation_rate,
            rotation_steps: config.rotations,
            rng,
        };

        let rotations: Vec<f64> = adam.iter().map(|&i| ga.random_angle(i)).collect();
        let ancestor = Individual {
            order: adam,
            rotations,
            fitness: None,
        };

        ga.population.push(ancestor);
        while ga.population.len() < ga.population_size {
            let clone = ga.population[0].clone();
            let mutant = ga.mutate(&clone);
            ga.population.push(mutant);
        }
        ga
    }

    /// A random rotation step at which the part still fits the bin,
    /// falling back to no rotation.
    fn random_angle(&mut self, part: usize) -> f64 {
        let mut angles: Vec<f64> = (0..self.rotation_steps)
            .map(|i| i as f64 * (360.0 / self.rotation_steps as f64))
            .collect();
        angles.shuffle(&mut self.rng);

        for angle in angles {
            let rotated = self.parts[part].rotated(angle);
            if rotated
                .bounds()
                .is_some_and(|b| b.fits_within(&self.bin_bounds))
            {
                return angle;
            }
        }
        0.0
    }

    /// Per-gene chance to swap with the successor and to reroll the rotation.
    fn mutate(&mut self, individual: &Individual) -> Individual {
        let mut clone = individual.clone();
        clone.fitness = None;
        let rate = self.mutation_rate as f64 / 100.0;

        for i in 0..clone.order.len() {
            if self.rng.random::<f64>() < rate && i + 1 < clone.order.len() {
                clone.order.swap(i, i + 1);
                clone.rotations.swap(i, i + 1);
            }
            if self.rng.random::<f64>() < rate {
                clone.rotations[i] = self.random_angle(clone.order[i]);
            }
        }
        clone
    }

    /// Single-point crossover preserving permutation validity: each child
    /// takes a prefix from one parent and fills the remainder in the other
    /// parent's order.
    fn mate(&mut self, male: &Individual, female: &Individual) -> (Individual, Individual) {
        let len = male.order.len();
        let cut = (self.rng.random::<f64>().clamp(0.1, 0.9) * (len as f64 - 1.0)).round() as usize;

        let cross = |head: &Individual, tail: &Individual| {
            let mut order = head.order[..cut].to_vec();
            let mut rotations = head.rotations[..cut].to_vec();
            for (i, &gene) in tail.order.iter().enumerate() {
                if !order.contains(&gene) {
                    order.push(gene);
                    rotations.push(tail.rotations[i]);
                }
            }
            Individual {
                order,
                rotations,
                fitness: None,
            }
        };

        (cross(male, female), cross(female, male))
    }

    /// Replace the population with the next generation. The best individual
    /// survives unchanged; the rest come from fitness-weighted pairings.
    pub fn generation(&mut self) {
        self.population.sort_by(|a, b| {
            a.fitness
                .unwrap_or(f64::INFINITY)
                .partial_cmp(&b.fitness.unwrap_or(f64::INFINITY))
                .expect("NaN fitness")
        });
        debug!(
            "[GA] new generation, best fitness {:?}",
            self.population[0].fitness
        );

        let mut next = vec![self.population[0].clone()];
        while next.len() < self.population_size {
            let male = self.random_weighted_individual(None);
            let female = self.random_weighted_individual(Some(&male));
            let (a, b) = self.mate(&male, &female);

            let child = self.mutate(&a);
            next.push(child);
            if next.len() < self.population_size {
                let child = self.mutate(&b);
                next.push(child);
            }
        }
        self.population = next;
    }

    /// Rank-biased selection over the (sorted) population, optionally
    /// excluding an already chosen mate.
    fn random_weighted_individual(&mut self, exclude: Option<&Individual>) -> Individual {
        let pool: Vec<&Individual> = self
            .population
            .iter()
            .filter(|ind| exclude.is_none_or(|ex| ind.order != ex.order))
            .collect();
        let pool = if pool.is_empty() {
            self.population.iter().collect()
        } else {
            pool
        };

        let rand = self.rng.random::<f64>();
        let n = pool.len() as f64;
        let weight = 1.0 / n;
        let mut lower = 0.0;
        for (i, ind) in pool.iter().enumerate() {
            let upper = lower + 2.0 * weight * ((n - i as f64) / n);
            if rand > lower && rand < upper {
                return (*ind).clone();
            }
            lower = upper;
        }
        pool[0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use rand::SeedableRng;

    fn square(size: f64, id: i64) -> Polygon {
        let mut p = Polygon::new(vec![
            Point(0.0, 0.0),
            Point(size, 0.0),
            Point(size, size),
            Point(0.0, size),
        ]);
        p.id = id;
        p
    }

    fn ga(part_sizes: &[f64], config: &NestConfig) -> GeneticAlgorithm {
        let parts: Vec<Polygon> = part_sizes
            .iter()
            .enumerate()
            .map(|(i, &s)| square(s, i as i64))
            .collect();
        let bounds = Bounds {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
        };
        GeneticAlgorithm::new(&parts, bounds, config, SmallRng::seed_from_u64(42))
    }

    #[test]
    fn ancestor_orders_parts_by_descending_area() {
        let g = ga(&[5.0, 20.0, 10.0], &NestConfig::default());
        assert_eq!(g.population[0].order, vec![1, 2, 0]);
    }

    #[test]
    fn population_size_is_invariant_across_generations() {
        let config = NestConfig::default();
        let mut g = ga(&[5.0, 20.0, 10.0, 7.0], &config);
        assert_eq!(g.population.len(), config.population_size);

        for (i, ind) in g.population.iter_mut().enumerate() {
            ind.fitness = Some(i as f64);
        }
        g.generation();
        assert_eq!(g.population.len(), config.population_size);
    }

    #[test]
    fn best_individual_survives_a_generation() {
        let mut g = ga(&[5.0, 20.0, 10.0, 7.0], &NestConfig::default());
        for (i, ind) in g.population.iter_mut().enumerate() {
            ind.fitness = Some(10.0 - i as f64);
        }
        let best = g
            .population
            .iter()
            .min_by(|a, b| a.fitness.partial_cmp(&b.fitness).unwrap())
            .unwrap()
            .clone();
        g.generation();
        assert_eq!(g.population[0].order, best.order);
        assert_eq!(g.population[0].fitness, best.fitness);
    }

    #[test]
    fn crossover_children_are_complete_permutations() {
        let mut g = ga(&[5.0, 20.0, 10.0, 7.0, 3.0, 12.0], &NestConfig::default());
        let male = g.population[0].clone();
        let female = g.population[1].clone();
        let (a, b) = g.mate(&male, &female);

        for child in [&a, &b] {
            assert_eq!(child.order.len(), 6);
            assert_eq!(child.rotations.len(), 6);
            let mut seen = child.order.clone();
            seen.sort_unstable();
            assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
            assert!(child.fitness.is_none());
        }
    }

    #[test]
    fn rotations_stay_on_the_configured_steps() {
        let config = NestConfig {
            rotations: 4,
            ..NestConfig::default()
        };
        let g = ga(&[5.0, 20.0, 10.0], &config);
        for ind in &g.population {
            for &r in &ind.rotations {
                assert!([0.0, 90.0, 180.0, 270.0].contains(&r), "angle {r} off-step");
            }
        }
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let config = NestConfig::default();
        let a = ga(&[5.0, 20.0, 10.0, 7.0], &config);
        let b = ga(&[5.0, 20.0, 10.0, 7.0], &config);
        for (x, y) in a.population.iter().zip(&b.population) {
            assert_eq!(x.order, y.order);
            assert_eq!(x.rotations, y.rotations);
        }
    }
}
