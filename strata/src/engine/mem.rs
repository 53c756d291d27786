//! An in-memory [`StorageEngine`] backing the test suite.
//!
//! Arrays live under a shared mutex; each fragment keeps its decoded rows,
//! its timestamp interval, and its per-dimension bounding box, so fragment
//! enumeration and timestamp-window reads behave like the real thing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use parking_lot::Mutex;
use strata_dtype::{Datatype, NativeDatatype, match_each_native_datatype};
use strata_error::{StrataResult, strata_bail, strata_err};

use crate::buffer::{Column, ColumnBatch, ColumnData, WriteColumn};
use crate::engine::{
    ArrayConnection, EngineQuery, FragmentInfo, OpenMode, QueryStatus, ReadRequest, SchemaEvolution,
    StorageEngine, TimestampRange,
};
use crate::metadata::MetadataValue;
use crate::scalar::{Scalar, ScalarRange};
use crate::schema::{ArraySchema, Enumeration};

/// One decoded cell; `None` is a null attribute value.
type Cell = Option<Scalar>;

struct MemFragment {
    timestamp_range: TimestampRange,
    /// Rows in schema column order; dimensions first, then attributes.
    rows: Vec<Vec<Cell>>,
    non_empty: Vec<ScalarRange>,
}

struct MetadataEvent {
    timestamp: u64,
    key: String,
    /// `None` records a deletion.
    value: Option<MetadataValue>,
}

struct MemArray {
    schema: ArraySchema,
    fragments: Vec<MemFragment>,
    metadata_log: Vec<MetadataEvent>,
}

type Shared = Arc<Mutex<HashMap<String, MemArray>>>;

/// The in-memory engine: a shared map of arrays plus a monotonic write clock.
#[derive(Default)]
pub struct MemEngine {
    arrays: Shared,
    clock: AtomicU64,
}

impl MemEngine {
    /// Create an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge all fragments of `uri` into one whose timestamp interval spans
    /// the originals. Test hook mirroring an engine consolidation pass.
    pub fn consolidate(&self, uri: &str) -> StrataResult<()> {
        let mut arrays = self.arrays.lock();
        let array = lookup_mut(&mut arrays, uri)?;
        if array.fragments.len() < 2 {
            return Ok(());
        }
        let lo = array
            .fragments
            .iter()
            .map(|f| f.timestamp_range.0)
            .min()
            .unwrap_or(0);
        let hi = array
            .fragments
            .iter()
            .map(|f| f.timestamp_range.1)
            .max()
            .unwrap_or(0);
        let mut rows = Vec::new();
        for fragment in array.fragments.drain(..) {
            rows.extend(fragment.rows);
        }
        let non_empty = bounding_box(&array.schema, &rows)?;
        array.fragments.push(MemFragment {
            timestamp_range: (lo, hi),
            rows,
            non_empty,
        });
        Ok(())
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }
}

impl StorageEngine for MemEngine {
    fn create(&self, uri: &str, schema: ArraySchema) -> StrataResult<()> {
        schema.validate()?;
        let mut arrays = self.arrays.lock();
        if arrays.contains_key(uri) {
            strata_bail!(InvalidArgument: "an array already exists at '{uri}'");
        }
        arrays.insert(
            uri.to_string(),
            MemArray {
                schema,
                fragments: Vec::new(),
                metadata_log: Vec::new(),
            },
        );
        Ok(())
    }

    fn open(
        &self,
        uri: &str,
        mode: OpenMode,
        timestamp: Option<TimestampRange>,
    ) -> StrataResult<Box<dyn ArrayConnection>> {
        let schema = {
            let arrays = self.arrays.lock();
            lookup(&arrays, uri)?.schema.clone()
        };
        let window = timestamp.unwrap_or((0, u64::MAX));
        let write_ts = match timestamp {
            Some((_, end)) => end,
            None => self.tick(),
        };
        Ok(Box::new(MemConnection {
            arrays: Arc::clone(&self.arrays),
            uri: uri.to_string(),
            mode,
            window,
            write_ts,
            schema,
        }))
    }
}

struct MemConnection {
    arrays: Shared,
    uri: String,
    mode: OpenMode,
    window: TimestampRange,
    write_ts: u64,
    schema: ArraySchema,
}

impl MemConnection {
    fn require_write(&self) -> StrataResult<()> {
        if self.mode != OpenMode::Write {
            strata_bail!(ModeViolation: "array '{}' is not open for writes", self.uri);
        }
        Ok(())
    }
}

impl ArrayConnection for MemConnection {
    fn schema(&self) -> &ArraySchema {
        &self.schema
    }

    fn enumeration(&self, name: &str) -> StrataResult<Enumeration> {
        let arrays = self.arrays.lock();
        lookup(&arrays, &self.uri)?
            .schema
            .enumerations
            .iter()
            .find(|e| e.name == name)
            .cloned()
            .ok_or_else(|| strata_err!(InvalidArgument: "no enumeration named '{name}'"))
    }

    fn fragments(&self) -> StrataResult<Vec<FragmentInfo>> {
        let arrays = self.arrays.lock();
        Ok(lookup(&arrays, &self.uri)?
            .fragments
            .iter()
            .map(|f| FragmentInfo {
                timestamp_range: f.timestamp_range,
                cell_count: f.rows.len() as u64,
                non_empty: f.non_empty.clone(),
            })
            .collect())
    }

    fn metadata_entries(&self) -> StrataResult<Vec<(String, MetadataValue)>> {
        let arrays = self.arrays.lock();
        let array = lookup(&arrays, &self.uri)?;
        let mut visible = BTreeMap::new();
        let mut events = array
            .metadata_log
            .iter()
            .filter(|e| self.window.0 <= e.timestamp && e.timestamp <= self.window.1)
            .collect::<Vec<_>>();
        events.sort_by_key(|e| e.timestamp);
        for event in events {
            match &event.value {
                Some(value) => visible.insert(event.key.clone(), value.clone()),
                None => visible.remove(&event.key),
            };
        }
        Ok(visible.into_iter().collect())
    }

    fn put_metadata(&mut self, key: &str, value: MetadataValue) -> StrataResult<()> {
        self.require_write()?;
        let mut arrays = self.arrays.lock();
        lookup_mut(&mut arrays, &self.uri)?
            .metadata_log
            .push(MetadataEvent {
                timestamp: self.write_ts,
                key: key.to_string(),
                value: Some(value),
            });
        Ok(())
    }

    fn delete_metadata(&mut self, key: &str) -> StrataResult<()> {
        self.require_write()?;
        let mut arrays = self.arrays.lock();
        lookup_mut(&mut arrays, &self.uri)?
            .metadata_log
            .push(MetadataEvent {
                timestamp: self.write_ts,
                key: key.to_string(),
                value: None,
            });
        Ok(())
    }

    fn submit_write(&mut self, columns: Vec<WriteColumn>, sort: bool) -> StrataResult<()> {
        self.require_write()?;
        let mut arrays = self.arrays.lock();
        let array = lookup_mut(&mut arrays, &self.uri)?;
        let mut by_name: HashMap<&str, &WriteColumn> =
            columns.iter().map(|c| (c.name.as_str(), c)).collect();
        if by_name.len() != columns.len() {
            strata_bail!(InvalidArgument: "duplicate column in write buffers");
        }

        let schema = &array.schema;
        let ndim = schema.ndim();
        let mut decoded = Vec::with_capacity(ndim + schema.attributes.len());
        let mut num_rows = None;
        let names = schema
            .dimensions
            .iter()
            .map(|d| d.name.as_str())
            .chain(schema.attributes.iter().map(|a| a.name.as_str()));
        for name in names {
            let column = by_name
                .remove(name)
                .ok_or_else(|| strata_err!(InvalidArgument: "write is missing column '{name}'"))?;
            let cells = decode_write_column(column)?;
            if *num_rows.get_or_insert(cells.len()) != cells.len() {
                strata_bail!(InvalidArgument: "column '{name}' row count disagrees with the batch");
            }
            decoded.push(cells);
        }
        if let Some((name, _)) = by_name.into_iter().next() {
            strata_bail!(InvalidArgument: "column '{name}' is not in the schema");
        }

        let num_rows = num_rows.unwrap_or(0);
        let mut rows = Vec::with_capacity(num_rows);
        for i in 0..num_rows {
            let row = decoded.iter().map(|cells| cells[i].clone()).collect::<Vec<_>>();
            for (cell, dim) in row.iter().zip(&schema.dimensions) {
                if cell.is_none() {
                    strata_bail!(InvalidArgument: "dimension '{}' holds a null", dim.name);
                }
            }
            rows.push(row);
        }
        if sort {
            sort_by_coordinates(&mut rows, ndim);
        }
        let non_empty = bounding_box(schema, &rows)?;
        array.fragments.push(MemFragment {
            timestamp_range: (self.write_ts, self.write_ts),
            rows,
            non_empty,
        });
        Ok(())
    }

    fn start_read(&self, request: ReadRequest) -> StrataResult<Box<dyn EngineQuery>> {
        if self.mode != OpenMode::Read {
            strata_bail!(ModeViolation: "array '{}' is not open for reads", self.uri);
        }
        let arrays = self.arrays.lock();
        let array = lookup(&arrays, &self.uri)?;
        let schema = &array.schema;

        let names = if request.columns.is_empty() {
            schema
                .dimensions
                .iter()
                .map(|d| d.name.clone())
                .chain(schema.attributes.iter().map(|a| a.name.clone()))
                .collect::<Vec<_>>()
        } else {
            request.columns.clone()
        };
        let mut columns = Vec::with_capacity(names.len());
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            let datatype = schema.column_datatype(&name)?;
            indices.push(column_index(schema, &name)?);
            columns.push((name, datatype));
        }

        let mut rows = visible_rows(array, self.window, schema)?;
        sort_by_coordinates(&mut rows, schema.ndim());
        let projected = rows
            .into_iter()
            .map(|row| indices.iter().map(|i| row[*i].clone()).collect())
            .collect::<Vec<Vec<Cell>>>();

        let widest = columns
            .iter()
            .map(|(_, dt)| dt.byte_width().unwrap_or(16))
            .max()
            .unwrap_or(8);
        let rows_per_batch = (request.byte_budget / widest).max(1);
        Ok(Box::new(MemQuery {
            columns,
            rows: projected,
            cursor: 0,
            rows_per_batch,
        }))
    }

    fn evolve(&mut self, evolution: SchemaEvolution) -> StrataResult<()> {
        self.require_write()?;
        let mut arrays = self.arrays.lock();
        let array = lookup_mut(&mut arrays, &self.uri)?;
        for extended in evolution.extended_enumerations {
            let existing = array
                .schema
                .enumerations
                .iter_mut()
                .find(|e| e.name == extended.name)
                .ok_or_else(|| {
                    strata_err!(InvalidArgument: "no enumeration named '{}'", extended.name)
                })?;
            if extended.values.len() < existing.values.len()
                || extended.values[..existing.values.len()] != existing.values[..]
            {
                strata_bail!(
                    InvalidArgument: "extension of enumeration '{}' rewrites existing values",
                    extended.name
                );
            }
            *existing = extended;
        }
        if let Some(current_domain) = evolution.expand_current_domain {
            if current_domain.ranges.len() != array.schema.ndim() {
                strata_bail!(
                    InvalidArgument: "current domain has {} ranges for {} dimensions",
                    current_domain.ranges.len(),
                    array.schema.ndim()
                );
            }
            array.schema.current_domain = Some(current_domain);
        }
        self.schema = array.schema.clone();
        Ok(())
    }
}

struct MemQuery {
    columns: Vec<(String, Datatype)>,
    rows: Vec<Vec<Cell>>,
    cursor: usize,
    rows_per_batch: usize,
}

impl EngineQuery for MemQuery {
    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn submit(&mut self) -> StrataResult<(ColumnBatch, QueryStatus)> {
        let end = (self.cursor + self.rows_per_batch).min(self.rows.len());
        let chunk = &self.rows[self.cursor..end];
        let mut columns = Vec::with_capacity(self.columns.len());
        for (i, (name, datatype)) in self.columns.iter().enumerate() {
            let cells = chunk.iter().map(|row| &row[i]).collect::<Vec<_>>();
            columns.push(encode_column(name, *datatype, &cells)?);
        }
        self.cursor = end;
        let status = if self.cursor >= self.rows.len() {
            QueryStatus::Complete
        } else {
            QueryStatus::Incomplete
        };
        Ok((ColumnBatch::try_new(columns)?, status))
    }
}

fn lookup<'a>(arrays: &'a HashMap<String, MemArray>, uri: &str) -> StrataResult<&'a MemArray> {
    arrays
        .get(uri)
        .ok_or_else(|| strata_err!(InvalidArgument: "no array at '{uri}'"))
}

fn lookup_mut<'a>(
    arrays: &'a mut HashMap<String, MemArray>,
    uri: &str,
) -> StrataResult<&'a mut MemArray> {
    arrays
        .get_mut(uri)
        .ok_or_else(|| strata_err!(InvalidArgument: "no array at '{uri}'"))
}

fn column_index(schema: &ArraySchema, name: &str) -> StrataResult<usize> {
    let ndim = schema.ndim();
    if let Some(i) = schema.dimensions.iter().position(|d| d.name == name) {
        return Ok(i);
    }
    schema
        .attributes
        .iter()
        .position(|a| a.name == name)
        .map(|i| ndim + i)
        .ok_or_else(|| strata_err!(SchemaViolation: "no dimension or attribute named '{name}'"))
}

/// Rows visible within `window`, deduplicated by coordinates unless the
/// schema allows duplicates. On duplicate coordinates, the most recently
/// written cell wins.
fn visible_rows(
    array: &MemArray,
    window: TimestampRange,
    schema: &ArraySchema,
) -> StrataResult<Vec<Vec<Cell>>> {
    let ndim = schema.ndim();
    let mut ordered = array
        .fragments
        .iter()
        .filter(|f| f.timestamp_range.0 <= window.1 && f.timestamp_range.1 >= window.0)
        .collect::<Vec<_>>();
    ordered.sort_by_key(|f| f.timestamp_range.1);
    if schema.allows_duplicates {
        return Ok(ordered.iter().flat_map(|f| f.rows.iter().cloned()).collect());
    }
    let mut by_coord: BTreeMap<Vec<u8>, Vec<Cell>> = BTreeMap::new();
    for fragment in ordered {
        for row in &fragment.rows {
            by_coord.insert(coordinate_key(row, ndim), row.clone());
        }
    }
    Ok(by_coord.into_values().collect())
}

/// A byte key identifying one row's coordinates, for duplicate detection.
fn coordinate_key(row: &[Cell], ndim: usize) -> Vec<u8> {
    let mut key = Vec::new();
    for cell in row.iter().take(ndim) {
        let mut encoded = Vec::new();
        if let Some(value) = cell {
            value.write_storage(&mut encoded);
        }
        key.extend_from_slice(&(encoded.len() as u64).to_le_bytes());
        key.extend_from_slice(&encoded);
    }
    key
}

fn sort_by_coordinates(rows: &mut [Vec<Cell>], ndim: usize) {
    rows.sort_by(|a, b| {
        for (x, y) in a.iter().take(ndim).zip(b.iter().take(ndim)) {
            let ordering = match (x, y) {
                (Some(x), Some(y)) => {
                    x.compare(y).unwrap_or(std::cmp::Ordering::Equal)
                }
                _ => std::cmp::Ordering::Equal,
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}

/// The per-dimension min/max bounds of a fragment's rows.
fn bounding_box(schema: &ArraySchema, rows: &[Vec<Cell>]) -> StrataResult<Vec<ScalarRange>> {
    let mut bounds: Vec<Option<ScalarRange>> = vec![None; schema.ndim()];
    for row in rows {
        for (d, bound) in bounds.iter_mut().enumerate() {
            let Some(value) = &row[d] else { continue };
            match bound {
                None => {
                    *bound = Some(ScalarRange {
                        lo: value.clone(),
                        hi: value.clone(),
                    })
                }
                Some(range) => {
                    if value.compare(&range.lo)? == std::cmp::Ordering::Less {
                        range.lo = value.clone();
                    }
                    if value.compare(&range.hi)? == std::cmp::Ordering::Greater {
                        range.hi = value.clone();
                    }
                }
            }
        }
    }
    bounds
        .into_iter()
        .zip(&schema.dimensions)
        .map(|(bound, dim)| Ok(bound.unwrap_or_else(|| dim.range.clone())))
        .collect()
}

/// Decode one engine-ready write buffer into per-cell scalars.
fn decode_write_column(column: &WriteColumn) -> StrataResult<Vec<Cell>> {
    if let Some(validity) = &column.validity {
        if validity.len() != column.len {
            strata_bail!(
                SchemaViolation: "column '{}' has {} validity bytes for {} cells",
                column.name,
                validity.len(),
                column.len
            );
        }
    }
    let valid = |i: usize| {
        column
            .validity
            .as_ref()
            .is_none_or(|validity| validity[i] != 0)
    };

    let mut cells = Vec::with_capacity(column.len);
    if let Some(offsets) = &column.offsets {
        if offsets.len() != column.len + 1 {
            strata_bail!(
                SchemaViolation: "column '{}' has {} offsets for {} cells",
                column.name,
                offsets.len(),
                column.len
            );
        }
        for i in 0..column.len {
            let (beg, end) = (offsets[i] as usize, offsets[i + 1] as usize);
            if beg > end || end > column.data.len() {
                strata_bail!(
                    SchemaViolation: "column '{}' offset range {beg}..{end} exceeds {} data bytes",
                    column.name,
                    column.data.len()
                );
            }
            cells.push(valid(i).then(|| Scalar::Bytes(column.data[beg..end].to_vec())));
        }
        return Ok(cells);
    }

    match_each_native_datatype!(column.datatype, |$T| {
        if column.data.len() != column.len * <$T as NativeDatatype>::WIDTH {
            strata_bail!(
                SchemaViolation: "column '{}' holds {} bytes for {} cells of {}",
                column.name,
                column.data.len(),
                column.len,
                column.datatype
            );
        }
        for (i, chunk) in column.data.chunks_exact(<$T as NativeDatatype>::WIDTH).enumerate() {
            if valid(i) {
                let value = <$T as NativeDatatype>::read_le(chunk);
                cells.push(Some(Scalar::from_native(column.datatype.storage(), value)?));
            } else {
                cells.push(None);
            }
        }
        Ok(())
    })?;
    Ok(cells)
}

/// Encode one read-result column, carrying the schema-declared datatype and a
/// validity bitmap when any cell is null.
fn encode_column(
    name: &str,
    datatype: Datatype,
    cells: &[&Cell],
) -> StrataResult<Column> {
    let valid = cells.iter().map(|c| c.is_some()).collect::<Vec<_>>();
    let any_null = valid.iter().any(|v| !v);

    let mut data = if datatype.is_var_sized() {
        let values = cells
            .iter()
            .map(|cell| match cell {
                Some(value) => value.as_bytes().map(<[u8]>::to_vec),
                None => Ok(Vec::new()),
            })
            .collect::<StrataResult<Vec<_>>>()?;
        ColumnData::from_byte_strings(&values)
    } else if datatype.storage() == Datatype::Bool {
        let values = cells
            .iter()
            .map(|cell| match cell {
                Some(Scalar::Bool(v)) => Ok(*v),
                Some(other) => Err(strata_err!(
                    Internal: "column '{name}' holds a {} cell; expected bool",
                    other.datatype()
                )),
                None => Ok(false),
            })
            .collect::<StrataResult<Vec<_>>>()?;
        ColumnData::from_bools(&values)
    } else {
        match_each_native_datatype!(datatype, |$T| {
            let values = cells
                .iter()
                .map(|cell| match cell {
                    Some(value) => native_value::<$T>(value),
                    None => Ok(<$T as Default>::default()),
                })
                .collect::<StrataResult<Vec<_>>>()?;
            Ok(ColumnData::from_values(&values))
        })?
    };
    data.datatype = datatype;
    if any_null {
        data = data.with_validity(&valid);
    }
    Ok(Column::plain(name, data))
}

fn native_value<T: NativeDatatype>(scalar: &Scalar) -> StrataResult<T> {
    if scalar.datatype() != T::DATATYPE {
        strata_bail!(
            Internal: "cell holds {}; expected {}",
            scalar.datatype(),
            T::DATATYPE
        );
    }
    let mut buf = Vec::with_capacity(T::WIDTH);
    scalar.write_storage(&mut buf);
    Ok(T::read_le(&buf))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use strata_dtype::Datatype;

    use crate::buffer::WriteColumn;
    use crate::engine::mem::MemEngine;
    use crate::engine::{Layout, OpenMode, QueryStatus, ReadRequest, StorageEngine};
    use crate::scalar::ScalarRange;
    use crate::schema::{ArrayKind, ArraySchema, Attribute, Dimension};

    fn schema() -> ArraySchema {
        ArraySchema {
            kind: ArrayKind::Sparse,
            allows_duplicates: false,
            dimensions: vec![Dimension {
                name: "joinid".into(),
                datatype: Datatype::Int64,
                range: ScalarRange::new(0i64, 999i64),
            }],
            attributes: vec![Attribute {
                name: "value".into(),
                datatype: Datatype::Float64,
                enumeration: None,
            }],
            enumerations: vec![],
            current_domain: None,
        }
    }

    fn write(engine: &MemEngine, uri: &str, ids: &[i64], values: &[f64]) {
        let mut conn = engine.open(uri, OpenMode::Write, None).unwrap();
        conn.submit_write(
            vec![
                WriteColumn::fixed("joinid", ids, None),
                WriteColumn::fixed("value", values, None),
            ],
            true,
        )
        .unwrap();
    }

    #[test]
    fn duplicate_coordinates_resolve_to_last_write() {
        let engine = MemEngine::new();
        engine.create("a", schema()).unwrap();
        write(&engine, "a", &[1, 2, 3], &[1.0, 2.0, 3.0]);
        write(&engine, "a", &[2], &[20.0]);

        let conn = engine.open("a", OpenMode::Read, None).unwrap();
        let mut query = conn
            .start_read(ReadRequest {
                columns: vec![],
                layout: Layout::Unordered,
                byte_budget: 1 << 20,
            })
            .unwrap();
        let (batch, status) = query.submit().unwrap();
        assert_eq!(status, QueryStatus::Complete);
        assert_eq!(batch.num_rows(), 3);
        let values = batch.column("value").unwrap().data.fixed_values::<f64>().unwrap();
        assert_eq!(values, vec![1.0, 20.0, 3.0]);
    }

    #[test]
    fn byte_budget_splits_batches() {
        let engine = MemEngine::new();
        engine.create("a", schema()).unwrap();
        write(&engine, "a", &[0, 1, 2, 3, 4], &[0.0, 1.0, 2.0, 3.0, 4.0]);

        let conn = engine.open("a", OpenMode::Read, None).unwrap();
        let mut query = conn
            .start_read(ReadRequest {
                columns: vec!["joinid".into()],
                layout: Layout::Unordered,
                byte_budget: 16,
            })
            .unwrap();
        let mut total = 0;
        loop {
            let (batch, status) = query.submit().unwrap();
            assert!(batch.num_rows() <= 2);
            total += batch.num_rows();
            if status == QueryStatus::Complete {
                break;
            }
        }
        assert_eq!(total, 5);
    }

    #[test]
    fn timestamp_window_hides_later_fragments() {
        let engine = MemEngine::new();
        engine.create("a", schema()).unwrap();
        let mut conn = engine.open("a", OpenMode::Write, Some((5, 5))).unwrap();
        conn.submit_write(
            vec![
                WriteColumn::fixed("joinid", &[1i64], None),
                WriteColumn::fixed("value", &[1.0f64], None),
            ],
            true,
        )
        .unwrap();

        let early = engine.open("a", OpenMode::Read, Some((0, 4))).unwrap();
        assert!(early
            .start_read(ReadRequest {
                columns: vec![],
                layout: Layout::Unordered,
                byte_budget: 1 << 20,
            })
            .unwrap()
            .is_empty());

        let late = engine.open("a", OpenMode::Read, Some((0, 5))).unwrap();
        assert!(!late
            .start_read(ReadRequest {
                columns: vec![],
                layout: Layout::Unordered,
                byte_budget: 1 << 20,
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn consolidation_spans_timestamps() {
        let engine = MemEngine::new();
        engine.create("a", schema()).unwrap();
        write(&engine, "a", &[1], &[1.0]);
        write(&engine, "a", &[2], &[2.0]);
        engine.consolidate("a").unwrap();

        let conn = engine.open("a", OpenMode::Read, None).unwrap();
        let fragments = conn.fragments().unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].cell_count, 2);
        assert_ne!(fragments[0].timestamp_range.0, fragments[0].timestamp_range.1);
    }
}
