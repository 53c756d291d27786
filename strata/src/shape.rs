//! The shape lifecycle: `Unshaped` arrays gain a current domain through
//! upgrade, shaped arrays grow it monotonically through resize. There is no
//! reverse transition.
//!
//! Every mutation is validate-then-commit: the `can_*` checkers are pure and
//! return a `(bool, reason)` pair so callers can probe legality, and the
//! committing operations run the same checker before touching the engine.
//! One per-dimension validator covers both the all-Int64 shape path and the
//! mixed-type domain path.

use std::cmp::Ordering;

use strata_dtype::Datatype;
use strata_error::{StrataResult, strata_bail, strata_err};

use crate::array::Array;
use crate::engine::{OpenMode, SchemaEvolution};
use crate::scalar::{Scalar, ScalarRange};
use crate::schema::{CurrentDomain, Dimension};

/// Validation outcome: legality plus a human-readable reason on failure.
pub type StatusAndReason = (bool, String);

/// Dimension names recognized as the join-id key.
pub(crate) const JOINID_NAMES: [&str; 2] = ["joinid", "dim_0"];

/// The upper bound a byte-string dimension's current domain is installed
/// with.
const BYTES_DOMAIN_HI: &[u8] = b"\xff";

impl Array {
    /// Per-dimension sizes from the current domain, or from the maximum
    /// domain on unshaped (legacy) arrays.
    pub fn shape(&self) -> StrataResult<Vec<i64>> {
        match &self.schema().current_domain {
            Some(current) => current
                .ranges
                .iter()
                .map(|r| Ok(r.hi.as_i64()? + 1))
                .collect(),
            None => self.maxshape(),
        }
    }

    /// Per-dimension sizes of the immutable maximum domain.
    pub fn maxshape(&self) -> StrataResult<Vec<i64>> {
        self.schema()
            .dimensions
            .iter()
            .map(|d| Ok(d.range.hi.as_i64()? + 1))
            .collect()
    }

    /// Check whether `new_shape` can be installed as the first shape.
    pub fn can_upgrade_shape(&self, new_shape: &[i64]) -> StrataResult<StatusAndReason> {
        self.check_ndim(new_shape.len())?;
        self.require_int64_dims()?;
        if self.schema().current_domain.is_some() {
            return Ok((false, "array already has a shape; resize it instead".to_string()));
        }
        self.check_shape_bounds(new_shape, false)
    }

    /// Check whether the existing shape can grow to `new_shape`.
    pub fn can_resize(&self, new_shape: &[i64]) -> StrataResult<StatusAndReason> {
        self.check_ndim(new_shape.len())?;
        self.require_int64_dims()?;
        if self.schema().current_domain.is_none() {
            return Ok((false, "array has no shape; upgrade it first".to_string()));
        }
        self.check_shape_bounds(new_shape, true)
    }

    /// Install the first shape: a current domain of `[0, new_shape[i] - 1]`
    /// per dimension.
    pub fn upgrade_shape(&mut self, new_shape: &[i64]) -> StrataResult<()> {
        self.require_mode(OpenMode::Write)?;
        let (ok, reason) = self.can_upgrade_shape(new_shape)?;
        if !ok {
            strata_bail!(LifecycleViolation: "cannot upgrade shape: {reason}");
        }
        self.commit_int64_domain(new_shape)
    }

    /// Grow the existing shape. Resizing to the identical shape is a no-op
    /// success.
    pub fn resize(&mut self, new_shape: &[i64]) -> StrataResult<()> {
        self.require_mode(OpenMode::Write)?;
        let (ok, reason) = self.can_resize(new_shape)?;
        if !ok {
            strata_bail!(LifecycleViolation: "cannot resize: {reason}");
        }
        self.commit_int64_domain(new_shape)
    }

    /// Check whether the join-id dimension can take `new_limit` as its first
    /// shape. Trivially legal when no join-id dimension exists.
    pub fn can_upgrade_joinid_shape(&self, new_limit: i64) -> StrataResult<StatusAndReason> {
        let Some(dim) = self.joinid_dimension() else {
            return Ok((true, String::new()));
        };
        if self.schema().current_domain.is_some() {
            return Ok((false, "array already has a shape; resize it instead".to_string()));
        }
        validate_new_hi(dim, &Scalar::Int64(new_limit - 1), None)
    }

    /// Check whether the join-id dimension's shape can grow to `new_limit`.
    pub fn can_resize_joinid(&self, new_limit: i64) -> StrataResult<StatusAndReason> {
        let Some(dim) = self.joinid_dimension() else {
            return Ok((true, String::new()));
        };
        let Some(current) = &self.schema().current_domain else {
            return Ok((false, "array has no shape; upgrade it first".to_string()));
        };
        let index = self.joinid_index().ok_or_else(|| {
            strata_err!(Internal: "dimension '{}' vanished from the schema", dim.name)
        })?;
        validate_new_hi(dim, &Scalar::Int64(new_limit - 1), Some(&current.ranges[index].hi))
    }

    /// Install a first shape restricting only the join-id dimension; every
    /// other dimension's bounds are copied from the maximum domain
    /// (byte-string dimensions get the `["", "\xff"]` bound). A no-op
    /// success when no join-id dimension exists.
    pub fn upgrade_joinid_shape(&mut self, new_limit: i64) -> StrataResult<()> {
        self.require_mode(OpenMode::Write)?;
        let (ok, reason) = self.can_upgrade_joinid_shape(new_limit)?;
        if !ok {
            strata_bail!(LifecycleViolation: "cannot upgrade joinid shape: {reason}");
        }
        let Some(index) = self.joinid_index() else {
            return Ok(());
        };
        let ranges = self
            .schema()
            .dimensions
            .iter()
            .enumerate()
            .map(|(i, dim)| {
                if i == index {
                    ScalarRange::new(0i64, new_limit - 1)
                } else {
                    max_domain_copy(dim)
                }
            })
            .collect();
        self.conn.evolve(SchemaEvolution {
            extended_enumerations: Vec::new(),
            expand_current_domain: Some(CurrentDomain { ranges }),
        })
    }

    /// Grow only the join-id dimension's shape; every other dimension keeps
    /// its existing current-domain range. A no-op success when no join-id
    /// dimension exists.
    pub fn resize_joinid(&mut self, new_limit: i64) -> StrataResult<()> {
        self.require_mode(OpenMode::Write)?;
        let (ok, reason) = self.can_resize_joinid(new_limit)?;
        if !ok {
            strata_bail!(LifecycleViolation: "cannot resize joinid shape: {reason}");
        }
        let Some(index) = self.joinid_index() else {
            return Ok(());
        };
        let current = self
            .schema()
            .current_domain
            .as_ref()
            .ok_or_else(|| strata_err!(Internal: "shape vanished between check and commit"))?;
        let mut ranges = current.ranges.clone();
        ranges[index] = ScalarRange::new(ranges[index].lo.clone(), new_limit - 1);
        self.conn.evolve(SchemaEvolution {
            extended_enumerations: Vec::new(),
            expand_current_domain: Some(CurrentDomain { ranges }),
        })
    }

    /// The join-id dimension's shape, when the array has one and is shaped.
    pub fn joinid_shape(&self) -> StrataResult<Option<i64>> {
        let Some(index) = self.joinid_index() else {
            return Ok(None);
        };
        match &self.schema().current_domain {
            Some(current) => Ok(Some(current.ranges[index].hi.as_i64()? + 1)),
            None => Ok(None),
        }
    }

    /// The join-id dimension's maximum-domain size, when the array has one.
    pub fn joinid_maxshape(&self) -> StrataResult<Option<i64>> {
        match self.joinid_dimension() {
            Some(dim) => Ok(Some(dim.range.hi.as_i64()? + 1)),
            None => Ok(None),
        }
    }

    /// Check whether `domain` can be installed as the first current domain
    /// of a mixed-type array.
    pub fn can_upgrade_domain(&self, domain: &CurrentDomain) -> StrataResult<StatusAndReason> {
        self.check_ndim(domain.ranges.len())?;
        if self.schema().current_domain.is_some() {
            return Ok((false, "array already has a domain; resize it instead".to_string()));
        }
        for (dim, range) in self.schema().dimensions.iter().zip(&domain.ranges) {
            let (ok, reason) = validate_new_range(dim, range, None)?;
            if !ok {
                return Ok((false, reason));
            }
        }
        Ok((true, String::new()))
    }

    /// Install the first current domain of a mixed-type array. Byte-string
    /// dimensions are installed with the `["", "\xff"]` bound.
    pub fn upgrade_domain(&mut self, domain: &CurrentDomain) -> StrataResult<()> {
        self.require_mode(OpenMode::Write)?;
        let (ok, reason) = self.can_upgrade_domain(domain)?;
        if !ok {
            strata_bail!(LifecycleViolation: "cannot upgrade domain: {reason}");
        }
        let ranges = self
            .schema()
            .dimensions
            .iter()
            .zip(&domain.ranges)
            .map(|(dim, range)| {
                if dim.datatype.is_var_sized() {
                    ScalarRange::new("", bytes_domain_hi())
                } else {
                    range.clone()
                }
            })
            .collect();
        self.conn.evolve(SchemaEvolution {
            extended_enumerations: Vec::new(),
            expand_current_domain: Some(CurrentDomain { ranges }),
        })
    }

    fn check_ndim(&self, requested: usize) -> StrataResult<()> {
        if requested != self.ndim() {
            strata_bail!(
                SchemaViolation: "requested shape has {requested} dimensions; the array has {}",
                self.ndim()
            );
        }
        Ok(())
    }

    fn require_int64_dims(&self) -> StrataResult<()> {
        for dim in &self.schema().dimensions {
            if dim.datatype != Datatype::Int64 {
                strata_bail!(
                    Internal: "shape operations require Int64 dimensions; '{}' is {}",
                    dim.name,
                    dim.datatype
                );
            }
        }
        Ok(())
    }

    fn check_shape_bounds(
        &self,
        new_shape: &[i64],
        against_current: bool,
    ) -> StrataResult<StatusAndReason> {
        let current = self.schema().current_domain.as_ref();
        for (i, (dim, new)) in self.schema().dimensions.iter().zip(new_shape).enumerate() {
            let existing = if against_current {
                current.map(|c| &c.ranges[i].hi)
            } else {
                None
            };
            let (ok, reason) = validate_new_hi(dim, &Scalar::Int64(new - 1), existing)?;
            if !ok {
                return Ok((false, reason));
            }
        }
        Ok((true, String::new()))
    }

    fn commit_int64_domain(&mut self, new_shape: &[i64]) -> StrataResult<()> {
        let ranges = new_shape
            .iter()
            .map(|n| ScalarRange::new(0i64, n - 1))
            .collect();
        self.conn.evolve(SchemaEvolution {
            extended_enumerations: Vec::new(),
            expand_current_domain: Some(CurrentDomain { ranges }),
        })
    }

    fn joinid_dimension(&self) -> Option<&Dimension> {
        self.schema()
            .dimensions
            .iter()
            .find(|d| JOINID_NAMES.contains(&d.name.as_str()) && d.datatype == Datatype::Int64)
    }

    fn joinid_index(&self) -> Option<usize> {
        self.schema()
            .dimensions
            .iter()
            .position(|d| JOINID_NAMES.contains(&d.name.as_str()) && d.datatype == Datatype::Int64)
    }
}

/// The one per-dimension validator behind every shape and domain check: the
/// candidate upper bound must not exceed the maximum domain's, and when an
/// existing bound is given (resize) must not shrink below it.
fn validate_new_hi(
    dim: &Dimension,
    new_hi: &Scalar,
    existing_hi: Option<&Scalar>,
) -> StrataResult<StatusAndReason> {
    if new_hi.compare(&dim.range.hi)? == Ordering::Greater {
        return Ok((
            false,
            format!(
                "[{}] new bound {} exceeds the maximum domain bound {}",
                dim.name, new_hi, dim.range.hi
            ),
        ));
    }
    if let Some(existing) = existing_hi {
        if new_hi.compare(existing)? == Ordering::Less {
            return Ok((
                false,
                format!(
                    "[{}] new bound {} is smaller than the existing bound {}",
                    dim.name, new_hi, existing
                ),
            ));
        }
    }
    Ok((true, String::new()))
}

/// Validate one candidate range of a mixed-type domain. Byte-string
/// dimensions only accept the empty range or `["", "\xff"]`.
fn validate_new_range(
    dim: &Dimension,
    range: &ScalarRange,
    existing: Option<&ScalarRange>,
) -> StrataResult<StatusAndReason> {
    if dim.datatype.is_var_sized() {
        let lo = range.lo.as_bytes()?;
        let hi = range.hi.as_bytes()?;
        if !lo.is_empty() || !(hi.is_empty() || hi == BYTES_DOMAIN_HI) {
            return Ok((
                false,
                format!(
                    "[{}] byte-string dimensions only accept an empty range or [\"\", \"\\xff\"]",
                    dim.name
                ),
            ));
        }
        return Ok((true, String::new()));
    }
    if range.lo.compare(&dim.range.lo)? == Ordering::Less {
        return Ok((
            false,
            format!(
                "[{}] new lower bound {} is below the maximum domain bound {}",
                dim.name, range.lo, dim.range.lo
            ),
        ));
    }
    if range.hi.compare(&range.lo)? == Ordering::Less {
        return Ok((
            false,
            format!("[{}] range [{}, {}] is inverted", dim.name, range.lo, range.hi),
        ));
    }
    validate_new_hi(dim, &range.hi, existing.map(|r| &r.hi))
}

/// The current-domain range installed for a dimension whose bounds are
/// copied from the maximum domain.
fn max_domain_copy(dim: &Dimension) -> ScalarRange {
    if dim.datatype.is_var_sized() {
        ScalarRange::new("", bytes_domain_hi())
    } else {
        dim.range.clone()
    }
}

fn bytes_domain_hi() -> Scalar {
    Scalar::Bytes(BYTES_DOMAIN_HI.to_vec())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use strata_dtype::Datatype;

    use crate::scalar::{Scalar, ScalarRange};
    use crate::schema::Dimension;
    use crate::shape::{validate_new_hi, validate_new_range};

    fn dim() -> Dimension {
        Dimension {
            name: "joinid".into(),
            datatype: Datatype::Int64,
            range: ScalarRange::new(0i64, 99i64),
        }
    }

    #[test]
    fn bound_checks_name_both_values() {
        let (ok, reason) = validate_new_hi(&dim(), &Scalar::Int64(100), None).unwrap();
        assert!(!ok);
        assert!(reason.contains("joinid"));
        assert!(reason.contains("100"));
        assert!(reason.contains("99"));

        let (ok, reason) =
            validate_new_hi(&dim(), &Scalar::Int64(5), Some(&Scalar::Int64(10))).unwrap();
        assert!(!ok);
        assert!(reason.contains('5'));
        assert!(reason.contains("10"));

        let (ok, _) = validate_new_hi(&dim(), &Scalar::Int64(99), None).unwrap();
        assert!(ok);
    }

    #[test]
    fn byte_string_ranges_are_special_cased() {
        let dim = Dimension {
            name: "label".into(),
            datatype: Datatype::Bytes,
            range: ScalarRange::new("", "\u{7f}"),
        };
        let empty = ScalarRange::new("", "");
        assert!(validate_new_range(&dim, &empty, None).unwrap().0);

        let full = ScalarRange {
            lo: Scalar::Bytes(Vec::new()),
            hi: Scalar::Bytes(vec![0xff]),
        };
        assert!(validate_new_range(&dim, &full, None).unwrap().0);

        let arbitrary = ScalarRange::new("a", "z");
        assert!(!validate_new_range(&dim, &arbitrary, None).unwrap().0);
    }
}
