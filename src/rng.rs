//! Deterministic random sampling for generative input nodes (spec.md §4.5,
//! §7: "same seed, same trajectory").
//!
//! `felipe-santos-gran-prix` keeps `rand` in its dependency stack for
//! tensor initialisation (`tensor::Tensor::new_random`, via
//! `ndarray_rand::RandomExt` and `rand::distributions::Uniform`), but draws
//! straight from a single generator rather than deriving reproducible
//! per-call sub-seeds. Reproducibility here needs the latter — a step must
//! produce the same generative sample regardless of which other nodes are
//! also generative that step — so this module keeps the teacher's `rand`
//! dependency but generalises its use to a splitmix64-derived
//! `(seed, node, step)` sub-seed per draw.

use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use crate::types::NodeId;

/// Derives a `StdRng` seeded deterministically from the run's base seed,
/// the node being sampled and the step index, so re-running the same
/// observation stream with the same seed reproduces identical generative
/// samples regardless of which other nodes happen to be generative.
pub fn node_step_rng(base_seed: u64, node: NodeId, step_t: u64) -> StdRng {
    let mixed = splitmix64(base_seed ^ splitmix64(node.index() as u64) ^ splitmix64(step_t));
    StdRng::seed_from_u64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Samples `N(mean, 1/precision)` via Box-Muller.
pub fn sample_gaussian(rng: &mut StdRng, mean: f64, precision: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + z / precision.sqrt()
}

/// Samples a Bernoulli outcome (`0.0`/`1.0`) with `P(1) = p`.
pub fn sample_bernoulli(rng: &mut StdRng, p: f64) -> f64 {
    if rng.gen_range(0.0..1.0) < p {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_node_step_reproduces_identical_rng_stream() {
        let mut a = node_step_rng(42, NodeId(3), 7);
        let mut b = node_step_rng(42, NodeId(3), 7);
        let xa: f64 = a.gen();
        let xb: f64 = b.gen();
        assert_eq!(xa, xb);
    }

    #[test]
    fn different_steps_diverge() {
        let mut a = node_step_rng(42, NodeId(3), 7);
        let mut b = node_step_rng(42, NodeId(3), 8);
        let xa: f64 = a.gen();
        let xb: f64 = b.gen();
        assert_ne!(xa, xb);
    }

    #[test]
    fn sample_bernoulli_respects_extremes() {
        let mut rng = node_step_rng(1, NodeId(0), 0);
        assert_eq!(sample_bernoulli(&mut rng, 1.0), 1.0);
        assert_eq!(sample_bernoulli(&mut rng, 0.0), 0.0);
    }
}
