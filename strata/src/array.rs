//! The user-facing array handle.
//!
//! One handle owns one engine connection, its read configuration, and the
//! metadata cache. A handle is single-threaded; concurrent access to the
//! same array goes through separate handles and the engine's own timestamp
//! versioning.

use std::sync::Arc;

use strata_error::{StrataResult, strata_bail};

use crate::buffer::ColumnBatch;
use crate::cast;
use crate::engine::{
    ArrayConnection, Layout, OpenMode, SchemaEvolution, StorageEngine, TimestampRange,
};
use crate::metadata::{
    ENCODING_VERSION_KEY, ENCODING_VERSION_VAL, MetadataCache, MetadataValue, OBJECT_TYPE_KEY,
    guard_reserved,
};
use crate::read::ReadState;
use crate::schema::{ArrayKind, ArraySchema, Enumeration};

/// Result-order preference for reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultOrder {
    /// Unordered for sparse arrays, row-major for dense ones.
    #[default]
    Auto,
    /// Row-major cell order
    RowMajor,
    /// Column-major cell order
    ColMajor,
}

/// Configuration for [`Array::open`].
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Handle name; defaults to the last path segment of the URI.
    pub name: Option<String>,
    /// Columns returned by reads; empty means all dimensions and attributes.
    pub columns: Vec<String>,
    /// Byte budget per column per read batch.
    pub byte_budget: usize,
    /// Result-order preference.
    pub order: ResultOrder,
    /// Timestamp window; `None` means everything ever written.
    pub timestamp: Option<TimestampRange>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            name: None,
            columns: Vec::new(),
            byte_budget: 1 << 20,
            order: ResultOrder::Auto,
            timestamp: None,
        }
    }
}

/// An open handle to one array.
pub struct Array {
    pub(crate) engine: Arc<dyn StorageEngine>,
    pub(crate) conn: Box<dyn ArrayConnection>,
    pub(crate) uri: String,
    pub(crate) name: String,
    pub(crate) mode: OpenMode,
    pub(crate) timestamp: Option<TimestampRange>,
    pub(crate) columns: Vec<String>,
    pub(crate) byte_budget: usize,
    pub(crate) order: ResultOrder,
    pub(crate) metadata: MetadataCache,
    pub(crate) read: ReadState,
}

impl Array {
    /// Create a new array at `uri` and stamp the two reserved metadata keys.
    pub fn create(
        engine: &Arc<dyn StorageEngine>,
        uri: &str,
        schema: ArraySchema,
        object_type: &str,
        timestamp: Option<TimestampRange>,
    ) -> StrataResult<()> {
        let uri = uri.trim_end_matches('/');
        engine.create(uri, schema)?;
        let mut conn = engine.open(uri, OpenMode::Write, timestamp)?;
        conn.put_metadata(OBJECT_TYPE_KEY, MetadataValue::utf8(object_type))?;
        conn.put_metadata(ENCODING_VERSION_KEY, MetadataValue::utf8(ENCODING_VERSION_VAL))?;
        Ok(())
    }

    /// Open a handle to the array at `uri`.
    pub fn open(
        engine: Arc<dyn StorageEngine>,
        mode: OpenMode,
        uri: &str,
        options: OpenOptions,
    ) -> StrataResult<Self> {
        let uri = uri.trim_end_matches('/').to_string();
        let name = options
            .name
            .unwrap_or_else(|| uri.rsplit('/').next().unwrap_or(&uri).to_string());
        let conn = engine.open(&uri, mode, options.timestamp)?;
        let mut array = Self {
            engine,
            conn,
            uri,
            name,
            mode,
            timestamp: options.timestamp,
            columns: Vec::new(),
            byte_budget: options.byte_budget,
            order: options.order,
            metadata: MetadataCache::new(),
            read: ReadState::new(),
        };
        array.select_columns(options.columns)?;
        array.load_metadata()?;
        log::debug!("opened array '{}' at '{}'", array.name, array.uri);
        Ok(array)
    }

    /// Reopen as a fresh handle, keeping the read configuration.
    pub fn reopen(
        self,
        mode: OpenMode,
        timestamp: Option<TimestampRange>,
    ) -> StrataResult<Self> {
        let conn = self.engine.open(&self.uri, mode, timestamp)?;
        let mut array = Self {
            conn,
            mode,
            timestamp,
            metadata: MetadataCache::new(),
            read: ReadState::new(),
            ..self
        };
        array.load_metadata()?;
        Ok(array)
    }

    /// Reconfigure reads and clear read progress.
    pub fn reset(
        &mut self,
        columns: Vec<String>,
        byte_budget: usize,
        order: ResultOrder,
    ) -> StrataResult<()> {
        self.select_columns(columns)?;
        self.byte_budget = byte_budget;
        self.order = order;
        self.read.reset();
        Ok(())
    }

    /// Close the handle, dropping the connection and the metadata cache.
    pub fn close(mut self) {
        self.metadata.clear();
        log::debug!("closed array '{}'", self.name);
    }

    /// Write one batch: cast every column against the schema, commit at most
    /// one schema evolution, then submit the engine write buffers.
    pub fn write(&mut self, batch: ColumnBatch, sort: bool) -> StrataResult<()> {
        self.require_mode(OpenMode::Write)?;
        let mut evolution = SchemaEvolution::default();
        let mut buffers = Vec::with_capacity(batch.columns.len());
        for column in &batch.columns {
            let outcome = cast::cast_column(self.conn.as_ref(), column)?;
            if let Some(extension) = outcome.extension {
                evolution.extended_enumerations.push(extension);
            }
            buffers.push(outcome.column);
        }
        if !evolution.is_empty() {
            self.conn.evolve(evolution)?;
        }
        self.conn.submit_write(buffers, sort)
    }

    /// The array's storage schema.
    pub fn schema(&self) -> &ArraySchema {
        self.conn.schema()
    }

    /// The array URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The handle name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The open mode.
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// The open timestamp window.
    pub fn timestamp(&self) -> Option<TimestampRange> {
        self.timestamp
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.schema().ndim()
    }

    /// Dimension names, in schema order.
    pub fn dimension_names(&self) -> Vec<String> {
        self.schema().dimensions.iter().map(|d| d.name.clone()).collect()
    }

    /// Check whether `name` is a dimension.
    pub fn has_dimension(&self, name: &str) -> bool {
        self.schema().has_dimension(name)
    }

    /// Attribute names, in schema order.
    pub fn attribute_names(&self) -> Vec<String> {
        self.schema().attributes.iter().map(|a| a.name.clone()).collect()
    }

    /// The enumeration backing a categorical attribute, or `None` for plain
    /// attributes.
    pub fn attribute_enumeration(&self, attr_name: &str) -> StrataResult<Option<Enumeration>> {
        match self.schema().enumeration_of(attr_name) {
            Some(enmr_name) => Ok(Some(self.conn.enumeration(enmr_name)?)),
            None => Ok(None),
        }
    }

    /// Set one metadata entry. Reserved keys require `force`.
    pub fn set_metadata(
        &mut self,
        key: &str,
        value: MetadataValue,
        force: bool,
    ) -> StrataResult<()> {
        guard_reserved(key, force, "modified")?;
        self.require_mode(OpenMode::Write)?;
        self.conn.put_metadata(key, value.clone())?;
        self.metadata.insert(key.to_string(), value);
        Ok(())
    }

    /// Delete one metadata entry. Reserved keys require `force`.
    pub fn delete_metadata(&mut self, key: &str, force: bool) -> StrataResult<()> {
        guard_reserved(key, force, "deleted")?;
        self.require_mode(OpenMode::Write)?;
        self.conn.delete_metadata(key)?;
        self.metadata.remove(key);
        Ok(())
    }

    /// Look up one cached metadata entry.
    pub fn get_metadata(&self, key: &str) -> Option<&MetadataValue> {
        self.metadata.get(key)
    }

    /// The full metadata cache.
    pub fn metadata(&self) -> &MetadataCache {
        &self.metadata
    }

    /// Check whether `key` has a metadata entry.
    pub fn has_metadata(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    /// Number of cached metadata entries.
    pub fn metadata_num(&self) -> usize {
        self.metadata.len()
    }

    pub(crate) fn require_mode(&self, mode: OpenMode) -> StrataResult<()> {
        if self.mode != mode {
            let wanted = match mode {
                OpenMode::Read => "reads",
                OpenMode::Write => "writes",
            };
            strata_bail!(ModeViolation: "array '{}' is not open for {wanted}", self.name);
        }
        Ok(())
    }

    pub(crate) fn layout(&self) -> Layout {
        match self.order {
            ResultOrder::Auto => match self.schema().kind {
                ArrayKind::Sparse => Layout::Unordered,
                ArrayKind::Dense => Layout::RowMajor,
            },
            ResultOrder::RowMajor => Layout::RowMajor,
            ResultOrder::ColMajor => Layout::ColMajor,
        }
    }

    fn select_columns(&mut self, columns: Vec<String>) -> StrataResult<()> {
        for name in &columns {
            // surfaces the name-not-found error
            self.schema().column_datatype(name)?;
        }
        self.columns = columns;
        Ok(())
    }

    /// Write handles read the cache through a separate read snapshot at the
    /// same timestamp window, so a write handle still sees prior metadata.
    fn load_metadata(&mut self) -> StrataResult<()> {
        let entries = match self.mode {
            OpenMode::Read => self.conn.metadata_entries()?,
            OpenMode::Write => self
                .engine
                .open(&self.uri, OpenMode::Read, self.timestamp)?
                .metadata_entries()?,
        };
        self.metadata = entries.into_iter().collect();
        Ok(())
    }
}
