use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use strata_dtype::{Datatype, NativeDatatype};
use strata_error::{StrataResult, strata_bail};

/// A single typed value, used for domain bounds and enumeration entries.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// A boolean value (stored as one byte)
    Bool(bool),
    /// 8-bit signed integer
    Int8(i8),
    /// 16-bit signed integer
    Int16(i16),
    /// 32-bit signed integer
    Int32(i32),
    /// 64-bit signed integer
    Int64(i64),
    /// 8-bit unsigned integer
    UInt8(u8),
    /// 16-bit unsigned integer
    UInt16(u16),
    /// 32-bit unsigned integer
    UInt32(u32),
    /// 64-bit unsigned integer
    UInt64(u64),
    /// 32-bit float
    Float32(f32),
    /// 64-bit float
    Float64(f64),
    /// Variable-length byte string
    Bytes(Vec<u8>),
}

impl Scalar {
    /// The datatype tag of this value.
    pub fn datatype(&self) -> Datatype {
        match self {
            Self::Bool(_) => Datatype::Bool,
            Self::Int8(_) => Datatype::Int8,
            Self::Int16(_) => Datatype::Int16,
            Self::Int32(_) => Datatype::Int32,
            Self::Int64(_) => Datatype::Int64,
            Self::UInt8(_) => Datatype::UInt8,
            Self::UInt16(_) => Datatype::UInt16,
            Self::UInt32(_) => Datatype::UInt32,
            Self::UInt64(_) => Datatype::UInt64,
            Self::Float32(_) => Datatype::Float32,
            Self::Float64(_) => Datatype::Float64,
            Self::Bytes(_) => Datatype::Bytes,
        }
    }

    /// Build a scalar of the given storage datatype from a native value.
    pub fn from_native<T: NativeDatatype>(datatype: Datatype, value: T) -> StrataResult<Self> {
        let scalar = match datatype.storage() {
            Datatype::Bool => Self::Bool(
                num_traits::cast::<T, u8>(value)
                    .ok_or_else(|| strata_error::strata_err!(Internal: "bool out of range"))?
                    != 0,
            ),
            Datatype::Int8 => Self::Int8(cast_native(value)?),
            Datatype::Int16 => Self::Int16(cast_native(value)?),
            Datatype::Int32 => Self::Int32(cast_native(value)?),
            Datatype::Int64 => Self::Int64(cast_native(value)?),
            Datatype::UInt8 => Self::UInt8(cast_native(value)?),
            Datatype::UInt16 => Self::UInt16(cast_native(value)?),
            Datatype::UInt32 => Self::UInt32(cast_native(value)?),
            Datatype::UInt64 => Self::UInt64(cast_native(value)?),
            Datatype::Float32 => Self::Float32(cast_native(value)?),
            Datatype::Float64 => Self::Float64(cast_native(value)?),
            other => strata_bail!(Internal: "cannot build a {} scalar from a native value", other),
        };
        Ok(scalar)
    }

    /// The value as `i64`, for 64-bit signed integer scalars only.
    pub fn as_i64(&self) -> StrataResult<i64> {
        match self {
            Self::Int64(v) => Ok(*v),
            other => strata_bail!(Internal: "expected an i64 scalar; got {}", other.datatype()),
        }
    }

    /// The value as a byte string, for `Bytes` scalars only.
    pub fn as_bytes(&self) -> StrataResult<&[u8]> {
        match self {
            Self::Bytes(v) => Ok(v),
            other => strata_bail!(Internal: "expected a bytes scalar; got {}", other.datatype()),
        }
    }

    /// Append the storage encoding of this value to `data`.
    pub(crate) fn write_storage(&self, data: &mut Vec<u8>) {
        match self {
            Self::Bool(v) => data.push(u8::from(*v)),
            Self::Int8(v) => v.write_le(data),
            Self::Int16(v) => v.write_le(data),
            Self::Int32(v) => v.write_le(data),
            Self::Int64(v) => v.write_le(data),
            Self::UInt8(v) => v.write_le(data),
            Self::UInt16(v) => v.write_le(data),
            Self::UInt32(v) => v.write_le(data),
            Self::UInt64(v) => v.write_le(data),
            Self::Float32(v) => v.write_le(data),
            Self::Float64(v) => v.write_le(data),
            Self::Bytes(v) => data.extend_from_slice(v),
        }
    }

    /// Compare against another scalar of the same datatype.
    ///
    /// Cross-type comparison is an internal error; NaN float bounds are
    /// rejected rather than silently unordered.
    pub fn compare(&self, other: &Self) -> StrataResult<Ordering> {
        let ordering = match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int8(a), Self::Int8(b)) => a.cmp(b),
            (Self::Int16(a), Self::Int16(b)) => a.cmp(b),
            (Self::Int32(a), Self::Int32(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::UInt8(a), Self::UInt8(b)) => a.cmp(b),
            (Self::UInt16(a), Self::UInt16(b)) => a.cmp(b),
            (Self::UInt32(a), Self::UInt32(b)) => a.cmp(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.cmp(b),
            (Self::Float32(a), Self::Float32(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| strata_error::strata_err!(InvalidArgument: "NaN domain bound"))?,
            (Self::Float64(a), Self::Float64(b)) => a
                .partial_cmp(b)
                .ok_or_else(|| strata_error::strata_err!(InvalidArgument: "NaN domain bound"))?,
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            (a, b) => {
                strata_bail!(
                    Internal: "cannot compare {} against {}",
                    a.datatype(),
                    b.datatype()
                )
            }
        };
        Ok(ordering)
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::UInt8(v) => write!(f, "{v}"),
            Self::UInt16(v) => write!(f, "{v}"),
            Self::UInt32(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Bytes(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Int64(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::Bytes(value.as_bytes().to_vec())
    }
}

fn cast_native<T: NativeDatatype, U: NativeDatatype>(value: T) -> StrataResult<U> {
    num_traits::cast::<T, U>(value).ok_or_else(|| {
        strata_error::strata_err!(
            Internal: "value {} does not fit in {}", value, U::DATATYPE
        )
    })
}

/// An inclusive `[lo, hi]` range of one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRange {
    /// Inclusive lower bound
    pub lo: Scalar,
    /// Inclusive upper bound
    pub hi: Scalar,
}

impl ScalarRange {
    /// Create a new inclusive range.
    pub fn new(lo: impl Into<Scalar>, hi: impl Into<Scalar>) -> Self {
        Self {
            lo: lo.into(),
            hi: hi.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::cmp::Ordering;

    use crate::scalar::Scalar;

    #[test]
    fn same_type_compare() {
        assert_eq!(
            Scalar::Int64(3).compare(&Scalar::Int64(5)).unwrap(),
            Ordering::Less
        );
        assert_eq!(
            Scalar::from("abc").compare(&Scalar::from("ab")).unwrap(),
            Ordering::Greater
        );
    }

    #[test]
    fn cross_type_compare_is_internal_error() {
        assert!(Scalar::Int64(3).compare(&Scalar::Int32(3)).is_err());
    }
}
