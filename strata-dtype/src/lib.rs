#![deny(missing_docs)]

//! The type system for the Strata access layer.
//!
//! This crate defines the closed set of storage datatypes a dimension or
//! attribute may carry, along with the dispatch machinery that maps each
//! fixed-width tag to its Rust native type. Temporal tags exist only at the
//! external boundary: [`Datatype::storage`] collapses them to `Int64` before
//! any buffer is touched.

pub use datatype::*;
pub use native::*;

mod datatype;
mod native;
