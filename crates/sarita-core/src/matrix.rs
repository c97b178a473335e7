//! Flat row-major matrix.
//!
//! Geometry tables and per-frame scratch buffers are two-dimensional but are
//! accessed row by row in the hot loop. Keeping them in one contiguous
//! allocation with explicit stride gives slice access per row and avoids
//! nested `Vec`s.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;

/// Dense `rows x cols` matrix stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<T> {
    data: Vec<T>,
    rows: usize,
    cols: usize,
}

impl<T: Clone + Default> Matrix<T> {
    /// Allocates a matrix filled with `T::default()`.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::default(); rows * cols],
            rows,
            cols,
        }
    }

    /// Returns the transpose as a new matrix.
    pub fn transposed(&self) -> Self {
        let mut out = Self::new(self.cols, self.rows);
        for r in 0..self.rows {
            for c in 0..self.cols {
                out.data[c * self.rows + r] = self.data[r * self.cols + c].clone();
            }
        }
        out
    }

    /// Sets every element to `T::default()`.
    pub fn clear(&mut self) {
        self.data.fill(T::default());
    }
}

impl<T> Matrix<T> {
    /// Wraps row-major `data`. Returns `None` if `data.len() != rows * cols`.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<T>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Self { data, rows, cols })
    }

    /// Number of rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (the row stride).
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        assert!(col < self.cols, "column {col} out of range");
        &self.data[row * self.cols + col]
    }

    /// Mutable element at `(row, col)`.
    #[inline]
    pub fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        assert!(col < self.cols, "column {col} out of range");
        &mut self.data[row * self.cols + col]
    }

    /// Row `row` as a slice.
    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Row `row` as a mutable slice.
    #[inline]
    pub fn row_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * self.cols;
        &mut self.data[start..start + self.cols]
    }

    /// Iterates over rows.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[T]> {
        // chunks_exact(0) panics; an empty-column matrix has no data anyway
        self.data.chunks_exact(self.cols.max(1))
    }

    /// Underlying row-major storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }
}
