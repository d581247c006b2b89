use crate::error::{Error, Result};

/// Backing storage of a [`Matrix`]: owned (`Vec<f64>`) or borrowed from the caller.
pub trait Storage: AsRef<[f64]> {
    /// Whether dropping or freeing the matrix releases this storage.
    const OWNED: bool;
}

impl Storage for Vec<f64> {
    const OWNED: bool = true;
}

impl Storage for &[f64] {
    const OWNED: bool = false;
}

impl Storage for &mut [f64] {
    const OWNED: bool = false;
}

/// Storage that can be written through.
pub trait StorageMut: Storage + AsMut<[f64]> {}

impl<S: Storage + AsMut<[f64]>> StorageMut for S {}

/// A strided 2-D window over a contiguous `f64` buffer.
///
/// Layout is column-major with one contiguous column per sample: element `(r, c)`
/// of the active window lives at `data[(offset + c) * rows + r]`. The backing
/// buffer holds `capacity` columns; `slide` moves the active window
/// `[offset, offset + columns)` without touching the data.
///
/// Invariant: `offset + columns <= capacity` and `data.len() >= rows * capacity`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix<S = Vec<f64>> {
    rows: usize,
    columns: usize,
    offset: usize,
    capacity: usize,
    data: S,
}

/// A read-only matrix borrowing caller memory.
pub type MatrixView<'a> = Matrix<&'a [f64]>;

/// A writable matrix borrowing caller memory.
pub type MatrixViewMut<'a> = Matrix<&'a mut [f64]>;

impl Matrix<Vec<f64>> {
    /// Allocates a zeroed `rows × columns` matrix. Aborts on allocation failure,
    /// see [`Matrix::try_zeros`] for the fallible variant.
    pub fn zeros(rows: usize, columns: usize) -> Matrix {
        Matrix {
            rows,
            columns,
            offset: 0,
            capacity: columns,
            data: vec![0.0; rows * columns],
        }
    }

    /// Allocates a zeroed `rows × columns` matrix, reporting allocation failure.
    pub fn try_zeros(rows: usize, columns: usize) -> Result<Matrix> {
        let values = rows
            .checked_mul(columns)
            .ok_or(Error::Allocation { values: usize::MAX })?;
        let mut data = Vec::new();
        data.try_reserve_exact(values)
            .map_err(|_| Error::Allocation { values })?;
        data.resize(values, 0.0);
        Ok(Matrix {
            rows,
            columns,
            offset: 0,
            capacity: columns,
            data,
        })
    }

    /// Builds an owned matrix from its columns; every column must have the same length.
    pub fn from_data(columns: Vec<Vec<f64>>) -> Matrix {
        let rows = columns.first().map_or(0, Vec::len);
        let capacity = columns.len();
        let mut data = Vec::with_capacity(rows * capacity);
        for column in &columns {
            assert_eq!(column.len(), rows, "Matrix columns are of incorrect sizes");
            data.extend_from_slice(column);
        }
        Matrix {
            rows,
            columns: capacity,
            offset: 0,
            capacity,
            data,
        }
    }

    /// Makes room for at least `columns` columns. Existing contents are discarded
    /// when the storage has to grow; the capacity never shrinks.
    ///
    /// Returns `true` when new storage was allocated. The active window is reset to
    /// `(0, columns)` in both cases.
    pub fn ensure_capacity(&mut self, columns: usize) -> Result<bool> {
        let grown = columns > self.capacity;
        if grown {
            *self = Matrix::try_zeros(self.rows, columns)?;
        }
        self.slide(0, columns);
        Ok(grown)
    }
}

impl<S: Storage> Matrix<S> {
    /// Attaches a matrix to external storage holding `rows × columns` values.
    pub fn wrap(rows: usize, columns: usize, data: S) -> Result<Self> {
        let expected = rows * columns;
        let actual = data.as_ref().len();
        if actual < expected {
            return Err(Error::DimensionMismatch {
                what: "matrix storage length",
                expected,
                actual,
            });
        }
        Ok(Matrix {
            rows,
            columns,
            offset: 0,
            capacity: columns,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Width of the active window.
    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of columns the backing storage holds.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_owned(&self) -> bool {
        S::OWNED
    }

    /// Repositions the active window and returns its effective width,
    /// `min(columns, capacity - offset)`.
    pub fn slide(&mut self, offset: usize, columns: usize) -> usize {
        self.offset = offset.min(self.capacity);
        self.columns = columns.min(self.capacity - self.offset);
        self.columns
    }

    /// Column `c` of the active window.
    #[inline]
    pub fn column(&self, c: usize) -> &[f64] {
        debug_assert!(c < self.columns, "column {c} outside window of {}", self.columns);
        let start = (self.offset + c) * self.rows;
        &self.data.as_ref()[start..start + self.rows]
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        debug_assert!(row < self.rows);
        self.column(col)[row]
    }

    /// The active window as one contiguous slice of `rows * columns` values.
    pub fn as_slice(&self) -> &[f64] {
        let start = self.offset * self.rows;
        &self.data.as_ref()[start..start + self.rows * self.columns]
    }

    /// Row index of the largest value in column `c`; the first maximum wins on ties.
    pub fn max_row_index(&self, c: usize) -> usize {
        let column = self.column(c);
        let mut res = 0;
        for (r, &value) in column.iter().enumerate().skip(1) {
            if value > column[res] {
                res = r;
            }
        }
        res
    }

    /// A read-only view sharing this matrix's storage and window.
    pub fn view(&self) -> MatrixView<'_> {
        Matrix {
            rows: self.rows,
            columns: self.columns,
            offset: self.offset,
            capacity: self.capacity,
            data: self.data.as_ref(),
        }
    }

    /// Copies the active window into a new owned matrix.
    pub fn to_matrix(&self) -> Matrix {
        Matrix {
            rows: self.rows,
            columns: self.columns,
            offset: 0,
            capacity: self.columns,
            data: self.as_slice().to_vec(),
        }
    }
}

impl<S: StorageMut> Matrix<S> {
    #[inline]
    pub fn column_mut(&mut self, c: usize) -> &mut [f64] {
        debug_assert!(c < self.columns, "column {c} outside window of {}", self.columns);
        let start = (self.offset + c) * self.rows;
        let rows = self.rows;
        &mut self.data.as_mut()[start..start + rows]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.rows);
        self.column_mut(col)[row] = value;
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        let start = self.offset * self.rows;
        let len = self.rows * self.columns;
        &mut self.data.as_mut()[start..start + len]
    }

    /// Clears the active window; storage outside it is left untouched.
    pub fn zero(&mut self) {
        self.as_mut_slice().fill(0.0);
    }

    /// Element-wise `self -= other` over both active windows.
    pub fn sub<T: Storage>(&mut self, other: &Matrix<T>) {
        if self.rows != other.rows || self.columns != other.columns {
            panic!("Matrices are of incorrect sizes")
        }
        for (x, y) in self.as_mut_slice().iter_mut().zip(other.as_slice()) {
            *x -= y;
        }
    }

    /// Element-wise scale of the active window.
    pub fn mul(&mut self, s: f64) {
        for x in self.as_mut_slice() {
            *x *= s;
        }
    }
}

impl<S: Storage + Default> Matrix<S> {
    /// Releases owned storage and resets the matrix to empty. Borrowed storage is
    /// only detached, never released.
    pub fn free(&mut self) {
        self.rows = 0;
        self.columns = 0;
        self.offset = 0;
        self.capacity = 0;
        self.data = S::default();
    }
}

impl<S: Storage + Default> Default for Matrix<S> {
    fn default() -> Self {
        Matrix {
            rows: 0,
            columns: 0,
            offset: 0,
            capacity: 0,
            data: S::default(),
        }
    }
}
