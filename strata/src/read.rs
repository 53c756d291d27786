//! Paginated reads: one engine query driven batch by batch.
//!
//! Completion is engine-reported. A structurally empty query still yields
//! exactly one zero-row batch on the first call, so callers can always
//! inspect the result schema of an empty read.

use strata_error::StrataResult;

use crate::array::Array;
use crate::buffer::ColumnBatch;
use crate::engine::{EngineQuery, OpenMode, QueryStatus, ReadRequest};

/// Per-handle read progress, reset on open and reconfiguration.
pub(crate) struct ReadState {
    query: Option<Box<dyn EngineQuery>>,
    complete: bool,
    first_read: bool,
}

impl ReadState {
    pub(crate) fn new() -> Self {
        Self {
            query: None,
            complete: false,
            first_read: true,
        }
    }

    pub(crate) fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Array {
    /// Retrieve the next batch of the read, or `None` once exhausted.
    ///
    /// The engine may fill less than the full result per call; whatever fit
    /// in the buffers is returned as-is and the next call resumes the query.
    pub fn read_next(&mut self) -> StrataResult<Option<ColumnBatch>> {
        self.require_mode(OpenMode::Read)?;
        if self.read.complete {
            return Ok(None);
        }
        if self.read.query.is_none() {
            let request = ReadRequest {
                columns: self.columns.clone(),
                layout: self.layout(),
                byte_budget: self.byte_budget,
            };
            self.read.query = Some(self.conn.start_read(request)?);
        }
        let Some(query) = self.read.query.as_mut() else {
            return Ok(None);
        };

        if query.is_empty() {
            self.read.complete = true;
            if self.read.first_read {
                self.read.first_read = false;
                let (batch, _) = query.submit()?;
                return Ok(Some(batch));
            }
            return Ok(None);
        }

        self.read.first_read = false;
        let (batch, status) = query.submit()?;
        if status == QueryStatus::Complete {
            self.read.complete = true;
        }
        Ok(Some(batch))
    }
}
