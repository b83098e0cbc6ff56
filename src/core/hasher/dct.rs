//! Separable 2-D DCT-II restricted to the low-frequency corner.
//!
//! Only the top-left `block x block` coefficients are ever needed, so the
//! transform computes exactly those and nothing else. Coefficients are
//! unnormalized; the hash compares them against their own median, which is
//! invariant to a positive scale factor.

use std::f64::consts::PI;

/// Precomputed cosine basis for a fixed grid and block size
#[derive(Debug, Clone)]
pub struct LowFrequencyDct {
    size: usize,
    block: usize,
    /// `basis[k * size + n] = cos(pi * k * (2n + 1) / (2 * size))`
    basis: Vec<f64>,
}

impl LowFrequencyDct {
    /// Create a transform for `size x size` inputs keeping `block x block` outputs
    pub fn new(size: usize, block: usize) -> Self {
        let mut basis = Vec::with_capacity(block * size);
        for k in 0..block {
            for n in 0..size {
                let angle = PI * (k as f64) * (2.0 * n as f64 + 1.0) / (2.0 * size as f64);
                basis.push(angle.cos());
            }
        }
        Self { size, block, basis }
    }

    /// Transform row-major `input` and return the low-frequency block in
    /// raster order (vertical frequency major, horizontal minor).
    ///
    /// `input.len()` must equal `size * size`.
    pub fn transform(&self, input: &[u8]) -> Vec<f64> {
        let (size, block) = (self.size, self.block);
        debug_assert_eq!(input.len(), size * size);

        // Rows: rows[y * block + u] = sum_x input[y][x] * basis[u][x]
        let mut rows = vec![0.0f64; size * block];
        for y in 0..size {
            let row = &input[y * size..(y + 1) * size];
            for u in 0..block {
                let cosines = &self.basis[u * size..(u + 1) * size];
                rows[y * block + u] = row
                    .iter()
                    .zip(cosines)
                    .map(|(&p, &c)| p as f64 * c)
                    .sum();
            }
        }

        // Columns: out[v * block + u] = sum_y basis[v][y] * rows[y][u]
        let mut out = vec![0.0f64; block * block];
        for v in 0..block {
            let cosines = &self.basis[v * size..(v + 1) * size];
            for u in 0..block {
                out[v * block + u] = (0..size).map(|y| cosines[y] * rows[y * block + u]).sum();
            }
        }

        out
    }
}
