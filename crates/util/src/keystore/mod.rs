//! Secret storage and placeholder interpolation.

pub mod interpolation;
