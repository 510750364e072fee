//! Sparse matrix support for global assembly.
//!
//! Global stiffness and Hessian matrices are accumulated as triplets (COO) and
//! converted to CSR once all element contributions are in.

use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::coo::CooMatrix;
use nalgebra_sparse::csr::CsrMatrix as NalgebraCsr;

/// Compressed Sparse Row matrix.
pub type CsrMatrix = NalgebraCsr<f64>;

/// Builder for assembling a sparse matrix from (row, col, value) triplets.
pub struct TripletMatrix {
    n_rows: usize,
    n_cols: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<f64>,
}

impl TripletMatrix {
    /// Create a new triplet matrix builder.
    pub fn new(n_rows: usize, n_cols: usize) -> Self {
        Self::with_capacity(n_rows, n_cols, 0)
    }

    /// Create with estimated capacity.
    pub fn with_capacity(n_rows: usize, n_cols: usize, nnz_estimate: usize) -> Self {
        Self {
            n_rows,
            n_cols,
            rows: Vec::with_capacity(nnz_estimate),
            cols: Vec::with_capacity(nnz_estimate),
            values: Vec::with_capacity(nnz_estimate),
        }
    }

    /// Add a value at (row, col). Duplicates are summed during conversion.
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n_rows, "Row index out of bounds");
        debug_assert!(col < self.n_cols, "Column index out of bounds");

        if value != 0.0 {
            self.rows.push(row);
            self.cols.push(col);
            self.values.push(value);
        }
    }

    /// Scatter a local element matrix with interleaved DOFs.
    ///
    /// Local row `i * size + a` maps to global row `global[i] * size + a`,
    /// the same layout as the displacement vectors.
    pub fn add_block(&mut self, global: &[usize], size: usize, local: &DMatrix<f64>) {
        let n = global.len() * size;
        debug_assert_eq!(local.nrows(), n);
        debug_assert_eq!(local.ncols(), n);

        for (i, &gi) in global.iter().enumerate() {
            for a in 0..size {
                let row = gi * size + a;
                for (j, &gj) in global.iter().enumerate() {
                    for b in 0..size {
                        self.add(row, gj * size + b, local[(i * size + a, j * size + b)]);
                    }
                }
            }
        }
    }

    /// Number of stored triplets.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Convert to CSR format, summing duplicate entries.
    pub fn to_csr(self) -> CsrMatrix {
        let mut coo = CooMatrix::new(self.n_rows, self.n_cols);
        for ((r, c), v) in self.rows.into_iter().zip(self.cols).zip(self.values) {
            coo.push(r, c, v);
        }
        CsrMatrix::from(&coo)
    }
}

/// Empty `n x n` matrix, returned by operators without a contribution.
pub fn zeros(n: usize) -> CsrMatrix {
    CsrMatrix::zeros(n, n)
}

/// Row/column/value triplets of a CSR matrix, in row-major order.
pub fn triplets(matrix: &CsrMatrix) -> Vec<(usize, usize, f64)> {
    matrix
        .triplet_iter()
        .map(|(r, c, &v)| (r, c, v))
        .collect()
}

/// Dense vector scatter with interleaved DOFs (see [`TripletMatrix::add_block`]).
pub fn add_block_vector(target: &mut DVector<f64>, global: &[usize], size: usize, local: &DVector<f64>) {
    debug_assert_eq!(local.len(), global.len() * size);
    for (i, &gi) in global.iter().enumerate() {
        for a in 0..size {
            target[gi * size + a] += local[i * size + a];
        }
    }
}

/// Gather the interleaved local DOFs of one element from a global vector.
pub fn gather_block_vector(source: &DVector<f64>, global: &[usize], size: usize) -> DVector<f64> {
    DVector::from_fn(global.len() * size, |k, _| source[global[k / size] * size + k % size])
}
