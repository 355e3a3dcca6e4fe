//! One-to-one assignment of rows (our players) to columns (opponents) maximizing total weight.
//!
//! `max_weight_assignment` is exact and only present with the `exact-solver` feature.
//! `greedy_assignment` is always available but only approximates the optimum.

/// Weight for a pair that has no computed matchup.
pub const MISSING_WEIGHT: f64 = 0.5;

/// Row-major weights; `None` marks a pair with no computed matchup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    rows: usize,
    cols: usize,
    cells: Vec<Option<f64>>,
}

impl WeightMatrix {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
        }
    }

    pub fn from_rows(rows: &[Vec<Option<f64>>]) -> Self {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut out = Self::new(rows.len(), cols);
        for (i, row) in rows.iter().enumerate() {
            for (j, w) in row.iter().take(cols).enumerate() {
                out.set(i, j, *w);
            }
        }
        out
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, weight: Option<f64>) {
        self.cells[row * self.cols + col] = weight;
    }

    /// Weight with missing or non-finite cells replaced by `MISSING_WEIGHT`.
    pub fn weight_or_default(&self, row: usize, col: usize) -> f64 {
        match self.get(row, col) {
            Some(w) if w.is_finite() => w,
            _ => MISSING_WEIGHT,
        }
    }

    pub fn total(&self, pairs: &[(usize, usize)]) -> f64 {
        pairs.iter().map(|&(i, j)| self.weight_or_default(i, j)).sum()
    }
}

#[cfg(feature = "exact-solver")]
pub use hungarian::max_weight_assignment;

#[cfg(feature = "exact-solver")]
mod hungarian {
    use super::WeightMatrix;

    /// Exact maximum-weight assignment (Hungarian method with row/column potentials).
    ///
    /// Handles rectangular input by assigning every row of the smaller side. Returns
    /// `min(rows, cols)` `(row, col)` pairs sorted by row.
    pub fn max_weight_assignment(weights: &WeightMatrix) -> Vec<(usize, usize)> {
        let (n, m) = (weights.rows(), weights.cols());
        if n == 0 || m == 0 {
            return Vec::new();
        }

        // Minimize negated weights; the smaller side goes on the rows.
        let transposed = n > m;
        let (rows, cols) = if transposed { (m, n) } else { (n, m) };
        let cost = |i: usize, j: usize| -> f64 {
            if transposed {
                -weights.weight_or_default(j, i)
            } else {
                -weights.weight_or_default(i, j)
            }
        };

        let assigned = solve_min_cost(rows, cols, cost);
        let mut pairs: Vec<(usize, usize)> = assigned
            .into_iter()
            .enumerate()
            .map(|(r, c)| if transposed { (c, r) } else { (r, c) })
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// `rows <= cols`. Returns the column assigned to each row.
    fn solve_min_cost(rows: usize, cols: usize, cost: impl Fn(usize, usize) -> f64) -> Vec<usize> {
        // 1-based with index 0 as the virtual source column.
        let mut u = vec![0.0_f64; rows + 1];
        let mut v = vec![0.0_f64; cols + 1];
        let mut owner = vec![0usize; cols + 1];
        let mut way = vec![0usize; cols + 1];

        for i in 1..=rows {
            owner[0] = i;
            let mut j0 = 0usize;
            let mut minv = vec![f64::INFINITY; cols + 1];
            let mut used = vec![false; cols + 1];

            loop {
                used[j0] = true;
                let i0 = owner[j0];
                let mut delta = f64::INFINITY;
                let mut j1 = 0usize;
                for j in 1..=cols {
                    if used[j] {
                        continue;
                    }
                    let cur = cost(i0 - 1, j - 1) - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
                for j in 0..=cols {
                    if used[j] {
                        u[owner[j]] += delta;
                        v[j] -= delta;
                    } else {
                        minv[j] -= delta;
                    }
                }
                j0 = j1;
                if owner[j0] == 0 {
                    break;
                }
            }

            // Flip the augmenting path back to the source.
            loop {
                let j1 = way[j0];
                owner[j0] = owner[j1];
                j0 = j1;
                if j0 == 0 {
                    break;
                }
            }
        }

        let mut out = vec![0usize; rows];
        for j in 1..=cols {
            if owner[j] != 0 {
                out[owner[j] - 1] = j - 1;
            }
        }
        out
    }
}

/// Greedy approximation; not guaranteed optimal.
///
/// Rows are visited by mean present weight, highest first (0.5 for a row with none). Each row
/// takes the still-free column with the highest present weight. Rows with no free present
/// column stay unassigned. Pairs are returned in visiting order.
pub fn greedy_assignment(weights: &WeightMatrix) -> Vec<(usize, usize)> {
    let (n, m) = (weights.rows(), weights.cols());

    let mut order: Vec<(usize, f64)> = (0..n)
        .map(|i| {
            let present: Vec<f64> = (0..m).filter_map(|j| weights.get(i, j)).collect();
            let avg = if present.is_empty() {
                MISSING_WEIGHT
            } else {
                present.iter().sum::<f64>() / present.len() as f64
            };
            (i, avg)
        })
        .collect();
    // Stable: ties keep row order.
    order.sort_by(|a, b| b.1.total_cmp(&a.1));

    let mut free = vec![true; m];
    let mut pairs = Vec::new();
    for (i, _) in order {
        if !free.iter().any(|f| *f) {
            break;
        }
        let mut best: Option<(usize, f64)> = None;
        for j in (0..m).filter(|&j| free[j]) {
            let Some(w) = weights.get(i, j) else { continue };
            if best.is_none_or(|(_, bw)| w > bw) {
                best = Some((j, w));
            }
        }
        if let Some((j, _)) = best {
            free[j] = false;
            pairs.push((i, j));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(rows: &[&[f64]]) -> WeightMatrix {
        let rows: Vec<Vec<Option<f64>>> = rows
            .iter()
            .map(|r| r.iter().map(|w| Some(*w)).collect())
            .collect();
        WeightMatrix::from_rows(&rows)
    }

    #[test]
    fn greedy_takes_best_available_per_ranked_row() {
        let w = full(&[&[0.6, 0.2], &[0.9, 0.8]]);
        // Row 1 ranks first (avg 0.85) and takes col 0; row 0 gets col 1.
        assert_eq!(greedy_assignment(&w), vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn greedy_skips_missing_cells() {
        let w = WeightMatrix::from_rows(&[vec![None, Some(0.3)], vec![Some(0.7), None]]);
        let pairs = greedy_assignment(&w);
        assert_eq!(pairs, vec![(1, 0), (0, 1)]);
    }

    #[test]
    fn greedy_leaves_rows_without_candidates_unassigned() {
        let w = WeightMatrix::from_rows(&[vec![Some(0.8)], vec![Some(0.6)], vec![None]]);
        assert_eq!(greedy_assignment(&w), vec![(0, 0)]);
    }

    #[test]
    fn greedy_can_miss_the_optimum() {
        let w = full(&[&[0.9, 0.8], &[0.85, 0.1]]);
        let greedy = greedy_assignment(&w);
        assert_eq!(greedy, vec![(0, 0), (1, 1)]);
        assert!(w.total(&greedy) < 1.65);
    }

    #[test]
    fn empty_inputs_give_empty_assignments() {
        assert!(greedy_assignment(&WeightMatrix::new(0, 3)).is_empty());
        assert!(greedy_assignment(&WeightMatrix::new(3, 0)).is_empty());
    }

    #[cfg(feature = "exact-solver")]
    mod exact {
        use super::*;

        #[test]
        fn finds_optimum_greedy_misses() {
            let w = full(&[&[0.9, 0.8], &[0.85, 0.1]]);
            let pairs = max_weight_assignment(&w);
            assert_eq!(pairs, vec![(0, 1), (1, 0)]);
            assert!((w.total(&pairs) - 1.65).abs() < 1e-12);
        }

        #[test]
        fn wide_matrix_assigns_every_row() {
            let w = full(&[&[0.1, 0.2, 0.9], &[0.8, 0.3, 0.85]]);
            let pairs = max_weight_assignment(&w);
            assert_eq!(pairs, vec![(0, 2), (1, 0)]);
        }

        #[test]
        fn tall_matrix_assigns_every_column() {
            let w = full(&[&[0.2, 0.1], &[0.9, 0.4], &[0.3, 0.8]]);
            let pairs = max_weight_assignment(&w);
            assert_eq!(pairs, vec![(1, 0), (2, 1)]);
        }

        #[test]
        fn missing_cells_weigh_a_coin_flip() {
            let w = WeightMatrix::from_rows(&[vec![None, Some(0.2)], vec![Some(0.4), Some(0.3)]]);
            // (0,0)=0.5 + (1,1)=0.3 = 0.8 beats (0,1)+(1,0) = 0.6
            assert_eq!(max_weight_assignment(&w), vec![(0, 0), (1, 1)]);
        }

        #[test]
        fn empty_side_gives_nothing() {
            assert!(max_weight_assignment(&WeightMatrix::new(0, 4)).is_empty());
            assert!(max_weight_assignment(&WeightMatrix::new(4, 0)).is_empty());
        }
    }
}
