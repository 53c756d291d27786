//! Exact cell counting for sparse arrays.
//!
//! The fast path sums per-fragment cell counts straight from fragment
//! metadata, and is provably correct only when the retained fragments are
//! fully inside the timestamp window, none of them is consolidated (unless
//! duplicates are allowed), and their dimension-0 bounding ranges do not
//! overlap. Anything else degrades to a full scan of dimension 0. This is a
//! designed degradation path, not error recovery.

use itertools::Itertools;
use strata_dtype::Datatype;
use strata_error::{StrataResult, strata_bail};

use crate::array::{Array, OpenOptions};
use crate::engine::{FragmentInfo, OpenMode};
use crate::schema::ArrayKind;
use crate::shape::JOINID_NAMES;

impl Array {
    /// The exact number of logically-present cells, as of the open
    /// timestamp window.
    pub fn nnz(&self) -> StrataResult<u64> {
        let schema = self.schema();
        if schema.kind != ArrayKind::Sparse {
            strata_bail!(SchemaViolation: "cell counts are only defined for sparse arrays");
        }

        let window = self.timestamp().unwrap_or((0, u64::MAX));
        let mut retained: Vec<FragmentInfo> = Vec::new();
        for fragment in self.conn.fragments()? {
            let (first, last) = fragment.timestamp_range;
            if last < window.0 || first > window.1 {
                continue;
            }
            if first < window.0 || last > window.1 {
                log::debug!(
                    "fragment [{first}, {last}] partially overlaps window [{}, {}]; counting by full scan",
                    window.0,
                    window.1
                );
                return self.nnz_slow();
            }
            if first != last && !schema.allows_duplicates {
                log::debug!(
                    "consolidated fragment [{first}, {last}] may hide duplicate cells; counting by full scan"
                );
                return self.nnz_slow();
            }
            retained.push(fragment);
        }

        match retained.len() {
            0 => return Ok(0),
            1 => return Ok(retained[0].cell_count),
            _ => {}
        }

        let total: u64 = retained.iter().map(|f| f.cell_count).sum();
        if schema.allows_duplicates {
            return Ok(total);
        }

        let dim0 = &schema.dimensions[0];
        if dim0.datatype != Datatype::Int64 || !JOINID_NAMES.contains(&dim0.name.as_str()) {
            log::debug!(
                "dimension 0 '{}' ({}) is not a recognized join-id key; counting by full scan",
                dim0.name,
                dim0.datatype
            );
            return self.nnz_slow();
        }

        let mut ranges = retained
            .iter()
            .map(|f| {
                Ok((
                    f.non_empty[0].lo.as_i64()?,
                    f.non_empty[0].hi.as_i64()?,
                ))
            })
            .collect::<StrataResult<Vec<(i64, i64)>>>()?;
        ranges.sort_unstable();
        for ((lo_a, hi_a), (lo_b, hi_b)) in ranges.iter().tuple_windows() {
            if hi_a >= lo_b {
                log::debug!(
                    "fragment ranges [{lo_a}, {hi_a}] and [{lo_b}, {hi_b}] overlap; counting by full scan"
                );
                return self.nnz_slow();
            }
        }
        Ok(total)
    }

    /// Full-scan fallback: drain a fresh read restricted to dimension 0 and
    /// sum the returned row counts.
    fn nnz_slow(&self) -> StrataResult<u64> {
        let dim0 = self.schema().dimensions[0].name.clone();
        let options = OpenOptions {
            columns: vec![dim0],
            timestamp: self.timestamp(),
            ..OpenOptions::default()
        };
        let mut scan = Array::open(
            std::sync::Arc::clone(&self.engine),
            OpenMode::Read,
            self.uri(),
            options,
        )?;
        let mut total = 0u64;
        while let Some(batch) = scan.read_next()? {
            total += batch.num_rows() as u64;
        }
        Ok(total)
    }
}
