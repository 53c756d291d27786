#![deny(missing_docs)]

//! A typed-array access layer over a chunked columnar storage engine.
//!
//! The engine persists immutable, timestamped fragments of typed columnar
//! cells; this crate is the layer user code talks to. It casts user-typed
//! column batches to the on-disk schema (including dictionary-encoded
//! categorical columns, whose enumerations grow append-only), manages the
//! array shape lifecycle, counts logically-present cells without a full scan
//! when fragment metadata proves the count exact, and paginates reads under
//! a per-column byte budget.
//!
//! Everything reaches storage through the traits in [`engine`]; the
//! in-memory [`engine::mem::MemEngine`] backs the test suite.

pub use array::{Array, OpenOptions, ResultOrder};
pub use buffer::{Column, ColumnBatch, ColumnData, Offsets, WriteColumn};
pub use cast::{CastOutcome, cast_column};
pub use dict::extend_and_remap;
pub use metadata::{
    ENCODING_VERSION_KEY, ENCODING_VERSION_VAL, MetadataCache, MetadataValue, OBJECT_TYPE_KEY,
};
pub use scalar::{Scalar, ScalarRange};
pub use schema::{
    ArrayKind, ArraySchema, Attribute, CurrentDomain, Dimension, Enumeration,
};
pub use shape::StatusAndReason;

mod array;
mod buffer;
mod cast;
mod dict;
pub mod engine;
mod metadata;
mod nnz;
mod read;
mod scalar;
mod schema;
mod shape;
