//! Utility types.

pub mod querydict;

pub use querydict::QueryDict;
