use std::fmt::{Display, Formatter};

use strata_error::{StrataResult, strata_bail};

/// Granularity of a temporal datatype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TimeUnit {
    /// Years
    Year,
    /// Months
    Month,
    /// Weeks
    Week,
    /// Days
    Day,
    /// Hours
    Hour,
    /// Minutes
    Minute,
    /// Seconds
    Second,
    /// Milliseconds
    Millisecond,
    /// Microseconds
    Microsecond,
    /// Nanoseconds
    Nanosecond,
    /// Picoseconds
    Picosecond,
    /// Femtoseconds
    Femtosecond,
    /// Attoseconds
    Attosecond,
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Year => write!(f, "Y"),
            Self::Month => write!(f, "M"),
            Self::Week => write!(f, "W"),
            Self::Day => write!(f, "D"),
            Self::Hour => write!(f, "h"),
            Self::Minute => write!(f, "m"),
            Self::Second => write!(f, "s"),
            Self::Millisecond => write!(f, "ms"),
            Self::Microsecond => write!(f, "us"),
            Self::Nanosecond => write!(f, "ns"),
            Self::Picosecond => write!(f, "ps"),
            Self::Femtosecond => write!(f, "fs"),
            Self::Attosecond => write!(f, "as"),
        }
    }
}

/// The closed set of datatypes a dimension or attribute may carry.
///
/// `DateTime` and `Time` are boundary-only tags for externally-declared
/// columns; they are stored as 64-bit signed integers and never reach the
/// cast engine undecayed (see [`Datatype::storage`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Datatype {
    /// A boolean, stored one byte per value.
    Bool,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 8-bit unsigned integer
    UInt8,
    /// 16-bit unsigned integer
    UInt16,
    /// 32-bit unsigned integer
    UInt32,
    /// 64-bit unsigned integer
    UInt64,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Variable-length byte string (also covers UTF-8 text)
    Bytes,
    /// A point in time, stored as `Int64`
    DateTime(TimeUnit),
    /// A time of day, stored as `Int64`
    Time(TimeUnit),
}

impl Datatype {
    /// The datatype actually held in storage buffers.
    ///
    /// Temporal tags decay to `Int64`; every other tag is its own storage
    /// type.
    pub fn storage(&self) -> Datatype {
        match self {
            Self::DateTime(_) | Self::Time(_) => Self::Int64,
            other => *other,
        }
    }

    /// Check if `self` is a signed integer.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    /// Check if `self` is an unsigned integer.
    pub fn is_unsigned_int(&self) -> bool {
        matches!(
            self,
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64
        )
    }

    /// Check if `self` is an integer (signed or unsigned).
    pub fn is_int(&self) -> bool {
        self.is_signed_int() || self.is_unsigned_int()
    }

    /// Check if `self` is a floating point number.
    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Check if `self` is a temporal boundary tag.
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::DateTime(_) | Self::Time(_))
    }

    /// Check if values of `self` are variable-length.
    pub fn is_var_sized(&self) -> bool {
        matches!(self, Self::Bytes)
    }

    /// The storage width in bytes of one value, or `None` for
    /// variable-length types.
    pub fn byte_width(&self) -> Option<usize> {
        match self.storage() {
            Self::Bool | Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
            Self::Bytes => None,
            Self::DateTime(_) | Self::Time(_) => unreachable!("storage() decays temporal tags"),
        }
    }

    /// The number of distinct values representable by `self` when used as an
    /// enumeration index type. This bounds the total enumeration size.
    pub fn max_index_capacity(&self) -> StrataResult<u64> {
        match self {
            Self::Int8 => Ok(i8::MAX as u64),
            Self::UInt8 => Ok(u8::MAX as u64),
            Self::Int16 => Ok(i16::MAX as u64),
            Self::UInt16 => Ok(u16::MAX as u64),
            Self::Int32 => Ok(i32::MAX as u64),
            Self::UInt32 => Ok(u32::MAX as u64),
            Self::Int64 => Ok(i64::MAX as u64),
            Self::UInt64 => Ok(u64::MAX),
            _ => {
                strata_bail!(SchemaViolation: "invalid enumeration index type {}", self)
            }
        }
    }
}

impl Display for Datatype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool => write!(f, "bool"),
            Self::Int8 => write!(f, "i8"),
            Self::Int16 => write!(f, "i16"),
            Self::Int32 => write!(f, "i32"),
            Self::Int64 => write!(f, "i64"),
            Self::UInt8 => write!(f, "u8"),
            Self::UInt16 => write!(f, "u16"),
            Self::UInt32 => write!(f, "u32"),
            Self::UInt64 => write!(f, "u64"),
            Self::Float32 => write!(f, "f32"),
            Self::Float64 => write!(f, "f64"),
            Self::Bytes => write!(f, "bytes"),
            Self::DateTime(unit) => write!(f, "datetime[{unit}]"),
            Self::Time(unit) => write!(f, "time[{unit}]"),
        }
    }
}

/// Match over each fixed-width storage datatype, binding the corresponding
/// native type.
///
/// The subject is normalized through [`Datatype::storage`] first, so temporal
/// tags dispatch as `i64` and `Bool` dispatches as `u8` (one byte per value
/// in storage). The body must evaluate to a `StrataResult`; a
/// variable-length subject yields an internal error.
#[macro_export]
macro_rules! match_each_native_datatype {
    ($dt:expr, | $_:tt $T:ident | $($body:tt)*) => ({
        macro_rules! __with__ {( $_ $T:ident ) => ( $($body)* )}
        match $crate::Datatype::storage(&$dt) {
            $crate::Datatype::Bool | $crate::Datatype::UInt8 => __with__! { u8 },
            $crate::Datatype::Int8 => __with__! { i8 },
            $crate::Datatype::Int16 => __with__! { i16 },
            $crate::Datatype::UInt16 => __with__! { u16 },
            $crate::Datatype::Int32 => __with__! { i32 },
            $crate::Datatype::UInt32 => __with__! { u32 },
            $crate::Datatype::Int64 => __with__! { i64 },
            $crate::Datatype::UInt64 => __with__! { u64 },
            $crate::Datatype::Float32 => __with__! { f32 },
            $crate::Datatype::Float64 => __with__! { f64 },
            other => Err(::strata_error::strata_err!(
                Internal: "no fixed-width native type for {}", other
            )),
        }
    })
}

/// Match over each integer datatype, binding the corresponding native type.
///
/// Used for enumeration index columns; a non-integer subject yields a schema
/// violation. The body must evaluate to a `StrataResult`.
#[macro_export]
macro_rules! match_each_integer_datatype {
    ($dt:expr, | $_:tt $T:ident | $($body:tt)*) => ({
        macro_rules! __with__ {( $_ $T:ident ) => ( $($body)* )}
        match $dt {
            $crate::Datatype::Int8 => __with__! { i8 },
            $crate::Datatype::UInt8 => __with__! { u8 },
            $crate::Datatype::Int16 => __with__! { i16 },
            $crate::Datatype::UInt16 => __with__! { u16 },
            $crate::Datatype::Int32 => __with__! { i32 },
            $crate::Datatype::UInt32 => __with__! { u32 },
            $crate::Datatype::Int64 => __with__! { i64 },
            $crate::Datatype::UInt64 => __with__! { u64 },
            other => Err(::strata_error::strata_err!(
                SchemaViolation: "expected an integer datatype; got {}", other
            )),
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use strata_error::StrataResult;

    use crate::{Datatype, TimeUnit};

    #[test]
    fn temporal_decays_to_int64() {
        assert_eq!(
            Datatype::DateTime(TimeUnit::Nanosecond).storage(),
            Datatype::Int64
        );
        assert_eq!(Datatype::Time(TimeUnit::Second).storage(), Datatype::Int64);
        assert_eq!(
            Datatype::DateTime(TimeUnit::Millisecond).byte_width(),
            Some(8)
        );
    }

    #[test]
    fn index_capacity() {
        assert_eq!(Datatype::UInt8.max_index_capacity().unwrap(), 255);
        assert_eq!(Datatype::Int8.max_index_capacity().unwrap(), 127);
        assert_eq!(Datatype::Int32.max_index_capacity().unwrap(), i32::MAX as u64);
        assert!(Datatype::Float32.max_index_capacity().is_err());
        assert!(Datatype::Bytes.max_index_capacity().is_err());
    }

    #[test]
    fn native_dispatch_binds_storage_type() {
        let width: StrataResult<usize> = match_each_native_datatype!(
            Datatype::DateTime(TimeUnit::Microsecond),
            |$T| Ok(size_of::<$T>())
        );
        assert_eq!(width.unwrap(), 8);

        let bool_width: StrataResult<usize> =
            match_each_native_datatype!(Datatype::Bool, |$T| Ok(size_of::<$T>()));
        assert_eq!(bool_width.unwrap(), 1);

        let err: StrataResult<usize> =
            match_each_native_datatype!(Datatype::Bytes, |$T| Ok(size_of::<$T>()));
        assert!(err.is_err());
    }
}
