//! The boundary consumed from the underlying storage engine.
//!
//! The access layer never touches fragment storage directly: everything goes
//! through [`StorageEngine`] / [`ArrayConnection`] / [`EngineQuery`]. The
//! in-memory implementation in [`mem`] backs the test suite; a production
//! binding would wrap a real chunked columnar engine behind the same traits.

use strata_error::StrataResult;

use crate::buffer::{ColumnBatch, WriteColumn};
use crate::metadata::MetadataValue;
use crate::scalar::ScalarRange;
use crate::schema::{ArraySchema, CurrentDomain, Enumeration};

pub mod mem;

/// The mode an array handle is opened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Reads only
    Read,
    /// Writes only
    Write,
}

/// An inclusive `[start, end]` timestamp window.
pub type TimestampRange = (u64, u64);

/// Result-order hint for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Row-major cell order
    RowMajor,
    /// Column-major cell order
    ColMajor,
    /// Whatever order the engine finds cheapest
    Unordered,
}

/// Engine-reported state of a submitted read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    /// All matching cells have been returned.
    Complete,
    /// The buffers filled before the result was exhausted; submit again.
    Incomplete,
}

/// Cheap per-fragment metadata, the basis of the nnz fast path.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentInfo {
    /// Timestamp interval this fragment was written over. A proper interval
    /// (`start != end`) marks a consolidated fragment.
    pub timestamp_range: TimestampRange,
    /// Number of physical cells in the fragment.
    pub cell_count: u64,
    /// Per-dimension non-empty bounding box, parallel to the schema's
    /// dimension list.
    pub non_empty: Vec<ScalarRange>,
}

/// A batched schema-evolution request, committed atomically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaEvolution {
    /// Enumerations to replace with extended copies.
    pub extended_enumerations: Vec<Enumeration>,
    /// A current domain to install or expand.
    pub expand_current_domain: Option<CurrentDomain>,
}

impl SchemaEvolution {
    /// Whether this evolution carries any change.
    pub fn is_empty(&self) -> bool {
        self.extended_enumerations.is_empty() && self.expand_current_domain.is_none()
    }
}

/// Read-query configuration passed to [`ArrayConnection::start_read`].
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Columns to return; empty means all dimensions and attributes.
    pub columns: Vec<String>,
    /// Result-order hint.
    pub layout: Layout,
    /// Byte budget per column per returned batch.
    pub byte_budget: usize,
}

/// A handle to the storage engine itself.
pub trait StorageEngine: Send + Sync {
    /// Create a new array at `uri` with the given schema.
    fn create(&self, uri: &str, schema: ArraySchema) -> StrataResult<()>;

    /// Open a connection to the array at `uri`.
    fn open(
        &self,
        uri: &str,
        mode: OpenMode,
        timestamp: Option<TimestampRange>,
    ) -> StrataResult<Box<dyn ArrayConnection>>;
}

/// An open connection to one array, in one mode, at one timestamp window.
pub trait ArrayConnection {
    /// The array's storage schema as of open time.
    fn schema(&self) -> &ArraySchema;

    /// Fetch the named enumeration's current values.
    fn enumeration(&self, name: &str) -> StrataResult<Enumeration>;

    /// Enumerate fragment metadata for the whole array.
    fn fragments(&self) -> StrataResult<Vec<FragmentInfo>>;

    /// All metadata entries visible in this connection's timestamp window.
    fn metadata_entries(&self) -> StrataResult<Vec<(String, MetadataValue)>>;

    /// Persist one metadata entry.
    fn put_metadata(&mut self, key: &str, value: MetadataValue) -> StrataResult<()>;

    /// Delete one metadata entry.
    fn delete_metadata(&mut self, key: &str) -> StrataResult<()>;

    /// Submit populated write buffers as one new fragment.
    fn submit_write(&mut self, columns: Vec<WriteColumn>, sort: bool) -> StrataResult<()>;

    /// Start a read query; drive it through [`EngineQuery::submit`].
    fn start_read(&self, request: ReadRequest) -> StrataResult<Box<dyn EngineQuery>>;

    /// Commit a schema evolution.
    fn evolve(&mut self, evolution: SchemaEvolution) -> StrataResult<()>;
}

/// A resumable engine read. The engine may fill less than the full result per
/// submission; completion is engine-reported.
pub trait EngineQuery {
    /// Whether the query is structurally empty (no matching cells possible).
    fn is_empty(&self) -> bool;

    /// Submit or resume the query, returning whatever fit in the buffers.
    fn submit(&mut self) -> StrataResult<(ColumnBatch, QueryStatus)>;
}
