//! 2D/3D Projection
//!
//! Method selection, plus principal component analysis by power iteration with deflation. Used to
//! lay out a handful of words for plotting, so the input is small and a dense
//! covariance is never formed.

use std::str::FromStr;

use crate::error::ProjectionError;

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 1e-10;

/// Supported dimensionality reduction methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionMethod {
    Pca,
    /// Exact t-SNE, see [`project_tsne`](super::project_tsne)
    Tsne,
}

impl ProjectionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionMethod::Pca => "pca",
            ProjectionMethod::Tsne => "tsne",
        }
    }
}

impl FromStr for ProjectionMethod {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pca" => Ok(ProjectionMethod::Pca),
            "tsne" | "t-sne" => Ok(ProjectionMethod::Tsne),
            _ => Err(ProjectionError::UnsupportedMethod(s.to_string())),
        }
    }
}

/// Project `rows` onto their top `dimensions` principal components.
///
/// Returns one coordinate vector of length `dimensions` per input row. Each
/// component's sign is fixed so its largest loading is positive, which makes
/// the output deterministic. Components beyond the rank of the data are zero.
pub fn project_pca(rows: &[&[f32]], dimensions: usize) -> Result<Vec<Vec<f32>>, ProjectionError> {
    if !(2..=3).contains(&dimensions) {
        return Err(ProjectionError::InvalidDimensions(dimensions));
    }
    let Some(first) = rows.first() else {
        return Err(ProjectionError::NoWords);
    };
    let width = first.len();

    let centered = center(rows, width);
    let mut components: Vec<Vec<f64>> = Vec::with_capacity(dimensions);
    for c in 0..dimensions {
        let component = principal_component(&centered, width, &components, c);
        components.push(component);
    }

    Ok(centered
        .iter()
        .map(|row| {
            components
                .iter()
                .map(|component| dot(row, component) as f32)
                .collect()
        })
        .collect())
}

fn center(rows: &[&[f32]], width: usize) -> Vec<Vec<f64>> {
    let n = rows.len() as f64;
    let mut mean = vec![0.0f64; width];
    for row in rows {
        for (m, x) in mean.iter_mut().zip(row.iter()) {
            *m += f64::from(*x);
        }
    }
    for m in &mut mean {
        *m /= n;
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&mean)
                .map(|(x, m)| f64::from(*x) - m)
                .collect()
        })
        .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> f64 {
    let norm = dot(v, v).sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
    norm
}

/// Remove the projection of `v` onto each already-found component
fn orthogonalize(v: &mut [f64], found: &[Vec<f64>]) {
    for component in found {
        let overlap = dot(v, component);
        for (x, c) in v.iter_mut().zip(component) {
            *x -= overlap * c;
        }
    }
}

/// `Xᵀ(X v)` for the centered data matrix `X`
fn covariance_apply(data: &[Vec<f64>], v: &[f64], width: usize) -> Vec<f64> {
    let mut out = vec![0.0f64; width];
    for row in data {
        let score = dot(row, v);
        for (o, x) in out.iter_mut().zip(row) {
            *o += score * x;
        }
    }
    out
}

fn principal_component(data: &[Vec<f64>], width: usize, found: &[Vec<f64>], seed: usize) -> Vec<f64> {
    // Deterministic, non-axis-aligned start
    let mut v: Vec<f64> = (0..width)
        .map(|j| 1.0 + ((j + seed) as f64 * 0.618_033_988_75).fract())
        .collect();
    orthogonalize(&mut v, found);
    if normalize(&mut v) == 0.0 {
        return vec![0.0; width];
    }

    for _ in 0..MAX_ITERATIONS {
        let mut next = covariance_apply(data, &v, width);
        orthogonalize(&mut next, found);
        if normalize(&mut next) == 0.0 {
            return vec![0.0; width];
        }
        let delta: f64 = next.iter().zip(&v).map(|(a, b)| (a - b).abs()).sum();
        v = next;
        if delta < TOLERANCE {
            break;
        }
    }

    let pivot = v
        .iter()
        .copied()
        .fold(0.0f64, |best, x| if x.abs() > best.abs() { x } else { best });
    if pivot < 0.0 {
        for x in &mut v {
            *x = -*x;
        }
    }
    v
}
