use std::collections::BTreeMap;

use strata_dtype::{Datatype, NativeDatatype};
use strata_error::{StrataResult, strata_bail};

/// Reserved metadata key naming the object type stamped at creation.
pub const OBJECT_TYPE_KEY: &str = "strata_object_type";

/// Reserved metadata key naming the encoding version stamped at creation.
pub const ENCODING_VERSION_KEY: &str = "strata_encoding_version";

/// The encoding version written by [`crate::Array::create`].
pub const ENCODING_VERSION_VAL: &str = "1";

/// One metadata entry: a declared type, a value count, and the raw
/// little-endian value bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataValue {
    /// Declared type of the values
    pub datatype: Datatype,
    /// Number of values in `value`
    pub count: u32,
    /// Raw little-endian value bytes
    pub value: Vec<u8>,
}

impl MetadataValue {
    /// A UTF-8 string entry.
    pub fn utf8(s: &str) -> Self {
        Self {
            datatype: Datatype::Bytes,
            count: s.len() as u32,
            value: s.as_bytes().to_vec(),
        }
    }

    /// A single-value fixed-width entry.
    pub fn from_native<T: NativeDatatype>(v: T) -> Self {
        let mut value = Vec::with_capacity(T::WIDTH);
        v.write_le(&mut value);
        Self {
            datatype: T::DATATYPE,
            count: 1,
            value,
        }
    }

    /// Decode the entry as UTF-8 text.
    pub fn as_utf8(&self) -> StrataResult<&str> {
        if self.datatype != Datatype::Bytes {
            strata_bail!(SchemaViolation: "metadata entry holds {}, not text", self.datatype);
        }
        std::str::from_utf8(&self.value)
            .map_err(|_| strata_error::strata_err!(SchemaViolation: "metadata entry is not UTF-8"))
    }

    /// Decode a single fixed-width value.
    pub fn as_native<T: NativeDatatype>(&self) -> StrataResult<T> {
        if self.datatype.storage() != T::DATATYPE || self.count != 1 {
            strata_bail!(
                SchemaViolation: "metadata entry holds {} x{}; requested one {}",
                self.datatype,
                self.count,
                T::DATATYPE
            );
        }
        if self.value.len() != T::WIDTH {
            strata_bail!(SchemaViolation: "metadata entry has malformed value bytes");
        }
        Ok(T::read_le(&self.value))
    }
}

/// The per-handle metadata cache, rebuilt on open and cleared on close.
pub type MetadataCache = BTreeMap<String, MetadataValue>;

/// Reject mutation of the two reserved keys unless explicitly forced.
pub(crate) fn guard_reserved(key: &str, force: bool, action: &str) -> StrataResult<()> {
    if !force && (key == OBJECT_TYPE_KEY || key == ENCODING_VERSION_KEY) {
        strata_bail!(SchemaViolation: "{key} cannot be {action}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use crate::metadata::{MetadataValue, OBJECT_TYPE_KEY, guard_reserved};

    #[test]
    fn typed_round_trip() {
        assert_eq!(MetadataValue::utf8("hello").as_utf8().unwrap(), "hello");
        assert_eq!(MetadataValue::from_native(42i64).as_native::<i64>().unwrap(), 42);
        assert!(MetadataValue::from_native(42i64).as_utf8().is_err());
    }

    #[test]
    fn reserved_keys_need_force() {
        assert!(guard_reserved(OBJECT_TYPE_KEY, false, "modified").is_err());
        assert!(guard_reserved(OBJECT_TYPE_KEY, true, "modified").is_ok());
        assert!(guard_reserved("user_key", false, "modified").is_ok());
    }
}
