//! Numerical building blocks shared by preprocessing, resampling and fitting.

pub mod banded;
pub mod interp;
pub mod lstsq;

pub use banded::SymmetricBanded;
pub use interp::{interp_linear, linspace};
pub use lstsq::{pseudo_inverse, solve_least_squares};
