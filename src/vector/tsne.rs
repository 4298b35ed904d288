//! t-SNE Projection
//!
//! Exact t-distributed stochastic neighbor embedding. Every pairwise affinity
//! is computed directly, so cost is quadratic in the number of words; the
//! plotting endpoint only ever sends a short list.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::ProjectionError;

const SEED: u64 = 42;
const MAX_PERPLEXITY: f64 = 30.0;
const ITERATIONS: usize = 1000;
const EXAGGERATION: f64 = 12.0;
const EXAGGERATION_ITERATIONS: usize = 250;
const MIN_LEARNING_RATE: f64 = 50.0;
const MIN_GAIN: f64 = 0.01;
const MIN_PROBABILITY: f64 = 1e-12;
const SEARCH_STEPS: usize = 100;
const ENTROPY_TOLERANCE: f64 = 1e-5;

/// Embed `rows` in `dimensions` (2 or 3) dimensions.
///
/// The initial layout comes from a fixed seed, so the same input always
/// yields the same coordinates.
pub fn project_tsne(rows: &[&[f32]], dimensions: usize) -> Result<Vec<Vec<f32>>, ProjectionError> {
    if !(2..=3).contains(&dimensions) {
        return Err(ProjectionError::InvalidDimensions(dimensions));
    }
    let n = rows.len();
    if n == 0 {
        return Err(ProjectionError::NoWords);
    }
    if n == 1 {
        return Ok(vec![vec![0.0; dimensions]]);
    }

    let distances = squared_distances(rows);
    let affinities = joint_probabilities(&distances, n, perplexity_for(n));
    let embedding = optimize(&affinities, n, dimensions);

    Ok(embedding
        .chunks_exact(dimensions)
        .map(|point| point.iter().map(|&x| x as f32).collect())
        .collect())
}

/// Default of 30, shrunk for short lists; never above `n - 1`
fn perplexity_for(n: usize) -> f64 {
    MAX_PERPLEXITY.min(((n - 1) as f64 / 3.0).max(1.0))
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Row-major `n × n` matrix of squared euclidean distances
fn squared_distances(rows: &[&[f32]]) -> Vec<f64> {
    let n = rows.len();
    let mut out = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = rows[i]
                .iter()
                .zip(rows[j].iter())
                .map(|(a, b)| {
                    let diff = f64::from(*a) - f64::from(*b);
                    diff * diff
                })
                .sum();
            out[i * n + j] = d;
            out[j * n + i] = d;
        }
    }
    out
}

/// Symmetrized neighbor probabilities `p_ij`.
///
/// Each row's Gaussian bandwidth is found by bisection so the conditional
/// distribution has the requested perplexity.
fn joint_probabilities(distances: &[f64], n: usize, perplexity: f64) -> Vec<f64> {
    let target = perplexity.ln();
    let mut conditional = vec![0.0f64; n * n];

    for i in 0..n {
        let row = &distances[i * n..(i + 1) * n];
        let out = &mut conditional[i * n..(i + 1) * n];
        // Shift by the nearest distance so the largest weight is exp(0)
        let nearest = (0..n)
            .filter(|&j| j != i)
            .map(|j| row[j])
            .fold(f64::INFINITY, f64::min);

        let mut beta = 1.0f64;
        let mut low = 0.0f64;
        let mut high = f64::INFINITY;
        for _ in 0..SEARCH_STEPS {
            let mut sum = 0.0;
            let mut weighted = 0.0;
            for j in 0..n {
                if j == i {
                    out[j] = 0.0;
                    continue;
                }
                let shifted = row[j] - nearest;
                let p = (-shifted * beta).exp();
                out[j] = p;
                sum += p;
                weighted += shifted * p;
            }
            for p in out.iter_mut() {
                *p /= sum;
            }

            let entropy = sum.ln() + beta * weighted / sum;
            let excess = entropy - target;
            if excess.abs() < ENTROPY_TOLERANCE {
                break;
            }
            if excess > 0.0 {
                low = beta;
                beta = if high.is_finite() { (beta + high) / 2.0 } else { beta * 2.0 };
            } else {
                high = beta;
                beta = (beta + low) / 2.0;
            }
        }
    }

    let scale = 2.0 * n as f64;
    let mut joint = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                joint[i * n + j] =
                    ((conditional[i * n + j] + conditional[j * n + i]) / scale).max(MIN_PROBABILITY);
            }
        }
    }
    joint
}

/// Gradient descent with momentum and per-coordinate gains
fn optimize(affinities: &[f64], n: usize, dims: usize) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(SEED);
    let mut y: Vec<f64> = (0..n * dims).map(|_| rng.gen_range(-1e-4..1e-4)).collect();
    let mut update = vec![0.0f64; n * dims];
    let mut gains = vec![1.0f64; n * dims];
    let mut gradient = vec![0.0f64; n * dims];
    let mut kernel = vec![0.0f64; n * n];
    let learning_rate = (n as f64 / EXAGGERATION / 4.0).max(MIN_LEARNING_RATE);

    for iteration in 0..ITERATIONS {
        let (exaggeration, momentum) = if iteration < EXAGGERATION_ITERATIONS {
            (EXAGGERATION, 0.5)
        } else {
            (1.0, 0.8)
        };

        // Student-t kernel over the current layout
        let mut total = 0.0;
        for i in 0..n {
            for j in 0..n {
                let value = if i == j {
                    0.0
                } else {
                    1.0 / (1.0 + squared_distance(&y[i * dims..(i + 1) * dims], &y[j * dims..(j + 1) * dims]))
                };
                kernel[i * n + j] = value;
                total += value;
            }
        }

        gradient.fill(0.0);
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let q = (kernel[i * n + j] / total).max(MIN_PROBABILITY);
                let strength = 4.0 * (exaggeration * affinities[i * n + j] - q) * kernel[i * n + j];
                for d in 0..dims {
                    gradient[i * dims + d] += strength * (y[i * dims + d] - y[j * dims + d]);
                }
            }
        }

        for idx in 0..n * dims {
            gains[idx] = if (gradient[idx] > 0.0) != (update[idx] > 0.0) {
                gains[idx] + 0.2
            } else {
                (gains[idx] * 0.8).max(MIN_GAIN)
            };
            update[idx] = momentum * update[idx] - learning_rate * gains[idx] * gradient[idx];
            y[idx] += update[idx];
        }

        recenter(&mut y, n, dims);
    }

    y
}

fn recenter(y: &mut [f64], n: usize, dims: usize) {
    for d in 0..dims {
        let mean = (0..n).map(|i| y[i * dims + d]).sum::<f64>() / n as f64;
        for i in 0..n {
            y[i * dims + d] -= mean;
        }
    }
}
