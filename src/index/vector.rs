use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};


/// Unit-length term-frequency vector stored sparsely. `dim` is the size of the
/// vocabulary it was built against; absent columns are zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentVector {
    dim: usize,
    entries: Vec<(u32, f64)>,
}

impl DocumentVector {
    
    pub fn zero(dim: usize) -> Self {
        Self {
            dim,
            entries: Vec::new(),
        }
    }

    /// Builds an L2-normalized vector from raw column counts.
    pub fn from_counts(dim: usize, counts: &BTreeMap<usize, u32>) -> Self {
        let raw: Vec<(u32, f64)> = counts
            .iter()
            .filter(|&(&column, &count)| column < dim && count > 0)
            .map(|(&column, &count)| (column as u32, f64::from(count)))
            .collect();

        let norm = raw.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm == 0.0 {
            return Self::zero(dim);
        }

        let entries = raw.into_iter().map(|(column, w)| (column, w / norm)).collect();
        Self { dim, entries }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w * w).sum::<f64>().sqrt()
    }

    
    pub fn get(&self, column: usize) -> f64 {
        self.entries
            .binary_search_by_key(&(column as u32), |(c, _)| *c)
            .map(|i| self.entries[i].1)
            .unwrap_or(0.0)
    }

    /// Dot product of two sorted sparse vectors. For unit vectors this is the
    /// cosine similarity.
    pub fn dot(&self, other: &Self) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_w) = self.entries[i];
            let (b_col, b_w) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += a_w * b_w;
                    i += 1;
                    j += 1;
                }
            }
        }
        sum
    }

    /// True when the vector is well formed: columns sorted, unique and within
    /// `dim`, and the norm is either 0 or 1.
    pub fn is_consistent(&self) -> bool {
        let sorted = self.entries.windows(2).all(|w| w[0].0 < w[1].0);
        let in_range = self.entries.iter().all(|(c, w)| (*c as usize) < self.dim && *w > 0.0);
        let norm = self.norm();
        sorted && in_range && (self.is_zero() || (norm - 1.0).abs() < 1e-9)
    }
}
