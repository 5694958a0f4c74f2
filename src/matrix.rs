use std::fmt;
use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub const SCALAR: Shape = Shape { rows: 1, cols: 1 };

    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn column(rows: usize) -> Self {
        Self { rows, cols: 1 }
    }

    pub fn is_scalar(&self) -> bool {
        *self == Self::SCALAR
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.rows, self.cols)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl Matrix {
    pub fn allocate(rows: usize, cols: usize) -> Self {
        let (len, overflow) = rows.overflowing_mul(cols);
        assert!(
            !overflow,
            "allocation of a {rows}x{cols} matrix failed due to overflow"
        );
        Self {
            rows,
            cols,
            data: vec![0.0; len],
        }
    }

    pub fn column(values: Vec<f64>) -> Self {
        Self {
            rows: values.len(),
            cols: 1,
            data: values,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    /// Whether the backing buffer agrees with the declared dimensions. Only a
    /// deserialized matrix can fail this.
    pub fn is_consistent(&self) -> bool {
        self.rows.checked_mul(self.cols) == Some(self.data.len())
    }

    pub fn row_slice(&self, row: usize) -> &[f64] {
        debug_assert!(self.validate_row_index(row));
        let row_start = row * self.cols;
        &self.data[row_start..(row_start + self.cols)]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    fn validate_row_index(&self, row: usize) -> bool {
        assert!(
            row < self.rows,
            "invalid row index {row} for a {}x{} matrix",
            self.rows,
            self.cols
        );
        true
    }

    fn validate_col_index(&self, col: usize) -> bool {
        assert!(
            col < self.cols,
            "invalid column index {col} for a {}x{} matrix",
            self.rows,
            self.cols
        );
        true
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, index: (usize, usize)) -> &Self::Output {
        let (row, col) = index;
        debug_assert!(self.validate_row_index(row));
        debug_assert!(self.validate_col_index(col));
        &self.data[row * self.cols + col]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, index: (usize, usize)) -> &mut Self::Output {
        let (row, col) = index;
        debug_assert!(self.validate_row_index(row));
        debug_assert!(self.validate_col_index(col));
        &mut self.data[row * self.cols + col]
    }
}

pub fn one_hot<K: Ord + Clone>(keys: &[K]) -> (Matrix, Vec<K>) {
    let mut labels = keys.to_vec();
    labels.sort();
    labels.dedup();

    let mut matrix = Matrix::allocate(keys.len(), labels.len());
    for (row, key) in keys.iter().enumerate() {
        // labels is sorted and holds every key.
        if let Ok(col) = labels.binary_search(key) {
            matrix[(row, col)] = 1.0;
        }
    }
    (matrix, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index() {
        let mut matrix = Matrix::allocate(4, 3);
        assert_eq!(4, matrix.rows());
        assert_eq!(3, matrix.cols());
        for row in 0..matrix.rows() {
            for col in 0..matrix.cols() {
                assert_eq!(0.0, matrix[(row, col)]);
                let new_val = (row * matrix.cols() + col) as f64 * 10.0;
                matrix[(row, col)] = new_val;
                assert_eq!(new_val, matrix[(row, col)]);
            }
        }
        assert_eq!(&[30.0, 40.0, 50.0], matrix.row_slice(1));
    }

    #[test]
    #[should_panic = "invalid row index 4 for a 4x3 matrix"]
    fn row_overflow_panics() {
        let matrix = Matrix::allocate(4, 3);
        let _ = matrix[(matrix.rows(), 0)];
    }

    #[test]
    #[should_panic]
    fn allocate_overflow_panics() {
        Matrix::allocate(usize::MAX, 2);
    }

    #[test]
    fn one_hot_sorts_columns() {
        let (matrix, labels) = one_hot(&["c", "a", "c", "b"]);
        assert_eq!(vec!["a", "b", "c"], labels);
        assert_eq!(Shape::new(4, 3), matrix.shape());
        assert_eq!(&[0.0, 0.0, 1.0], matrix.row_slice(0));
        assert_eq!(&[1.0, 0.0, 0.0], matrix.row_slice(1));
        assert_eq!(&[0.0, 0.0, 1.0], matrix.row_slice(2));
        assert_eq!(&[0.0, 1.0, 0.0], matrix.row_slice(3));
        for row in 0..matrix.rows() {
            assert_eq!(1.0, matrix.row_slice(row).iter().sum::<f64>());
        }
    }

    #[test]
    fn one_hot_of_nothing_is_empty() {
        let (matrix, labels) = one_hot::<u32>(&[]);
        assert!(labels.is_empty());
        assert_eq!(Shape::new(0, 0), matrix.shape());
        assert!(matrix.is_consistent());
    }

    #[test]
    fn column_is_n_by_one() {
        let column = Matrix::column(vec![1.0, -1.0]);
        assert_eq!(Shape::column(2), column.shape());
        assert_eq!(-1.0, column[(1, 0)]);
    }
}
