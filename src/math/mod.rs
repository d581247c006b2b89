pub mod matrix;

pub use matrix::{Matrix, MatrixView, MatrixViewMut, Storage, StorageMut};
