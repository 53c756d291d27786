use arrow_buffer::bit_util;
use strata_dtype::{Datatype, NativeDatatype};
use strata_error::{StrataResult, strata_bail};

/// Offsets attached to a variable-length column. External batches may carry
/// either width; everything downstream works on the 64-bit normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Offsets {
    /// Fixed-width column, no offsets
    None,
    /// 32-bit offsets, `len + 1` entries
    Small(Vec<u32>),
    /// 64-bit offsets, `len + 1` entries
    Large(Vec<u64>),
}

impl Offsets {
    /// Normalize to 64-bit offsets, checking the `len + 1` entry invariant.
    pub fn normalized(&self, len: usize) -> StrataResult<Vec<u64>> {
        let offsets = match self {
            Self::None => {
                strata_bail!(SchemaViolation: "variable-length column is missing offsets")
            }
            Self::Small(small) => small.iter().map(|o| u64::from(*o)).collect::<Vec<_>>(),
            Self::Large(large) => large.clone(),
        };
        if offsets.len() != len + 1 {
            strata_bail!(
                SchemaViolation: "expected {} offsets for {} values; got {}",
                len + 1,
                len,
                offsets.len()
            );
        }
        Ok(offsets)
    }
}

/// One column's decoded values: a primitive data buffer, optional offsets for
/// variable-length types, and an optional validity bitmap (one bit per value,
/// set meaning valid). Boolean data arrives bit-packed, one bit per value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnData {
    /// Declared type of the values
    pub datatype: Datatype,
    /// Number of logical values
    pub len: usize,
    /// Raw little-endian value bytes (bit-packed for `Bool`)
    pub data: Vec<u8>,
    /// Offsets for variable-length values
    pub offsets: Offsets,
    /// Validity bitmap, absent meaning all-valid
    pub validity: Option<Vec<u8>>,
}

impl ColumnData {
    /// Build a fixed-width column from native values.
    pub fn from_values<T: NativeDatatype>(values: &[T]) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::WIDTH);
        for v in values {
            v.write_le(&mut data);
        }
        Self {
            datatype: T::DATATYPE,
            len: values.len(),
            data,
            offsets: Offsets::None,
            validity: None,
        }
    }

    /// Build a temporal column from raw 64-bit values.
    pub fn from_temporal(datatype: Datatype, values: &[i64]) -> StrataResult<Self> {
        if !datatype.is_temporal() {
            strata_bail!(SchemaViolation: "{} is not a temporal datatype", datatype);
        }
        let mut column = Self::from_values(values);
        column.datatype = datatype;
        Ok(column)
    }

    /// Build a bit-packed boolean column.
    pub fn from_bools(values: &[bool]) -> Self {
        let mut data = vec![0u8; bit_util::ceil(values.len(), 8)];
        for (i, v) in values.iter().enumerate() {
            if *v {
                bit_util::set_bit(&mut data, i);
            }
        }
        Self {
            datatype: Datatype::Bool,
            len: values.len(),
            data,
            offsets: Offsets::None,
            validity: None,
        }
    }

    /// Build a variable-length column from byte strings, with 64-bit offsets.
    pub fn from_byte_strings<S: AsRef<[u8]>>(values: &[S]) -> Self {
        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(values.len() + 1);
        offsets.push(0u64);
        for v in values {
            data.extend_from_slice(v.as_ref());
            offsets.push(data.len() as u64);
        }
        Self {
            datatype: Datatype::Bytes,
            len: values.len(),
            data,
            offsets: Offsets::Large(offsets),
            validity: None,
        }
    }

    /// Build a UTF-8 column, equivalent to [`ColumnData::from_byte_strings`].
    pub fn from_strs(values: &[&str]) -> Self {
        Self::from_byte_strings(&values.iter().map(|s| s.as_bytes()).collect::<Vec<_>>())
    }

    /// Attach a validity bitmap; `valid[i] == false` marks a null.
    pub fn with_validity(mut self, valid: &[bool]) -> Self {
        let mut bitmap = vec![0u8; bit_util::ceil(valid.len(), 8)];
        for (i, v) in valid.iter().enumerate() {
            if *v {
                bit_util::set_bit(&mut bitmap, i);
            }
        }
        self.validity = Some(bitmap);
        self
    }

    /// Decode fixed-width values as the native storage type.
    ///
    /// Boolean columns decode as `u8` after bit-to-byte expansion; requesting
    /// any other native type for them is an internal error.
    pub fn fixed_values<T: NativeDatatype>(&self) -> StrataResult<Vec<T>> {
        let storage = self.datatype.storage();
        if storage == Datatype::Bool {
            if T::DATATYPE != Datatype::UInt8 {
                strata_bail!(Internal: "bool columns decode as u8; requested {}", T::DATATYPE);
            }
            let expanded = self.bool_bytes()?;
            return Ok(expanded.iter().map(|b| T::read_le(&[*b][..])).collect());
        }
        if storage != T::DATATYPE {
            strata_bail!(
                Internal: "column holds {} values; requested {}",
                storage,
                T::DATATYPE
            );
        }
        if self.data.len() != self.len * T::WIDTH {
            strata_bail!(
                SchemaViolation: "column data holds {} bytes; expected {} ({} values of {})",
                self.data.len(),
                self.len * T::WIDTH,
                self.len,
                T::DATATYPE
            );
        }
        Ok(self
            .data
            .chunks_exact(T::WIDTH)
            .map(T::read_le)
            .collect())
    }

    /// Expand a bit-packed boolean buffer to one byte per logical value.
    pub fn bool_bytes(&self) -> StrataResult<Vec<u8>> {
        if self.datatype.storage() != Datatype::Bool {
            strata_bail!(Internal: "expected a bool column; got {}", self.datatype);
        }
        if self.data.len() < bit_util::ceil(self.len, 8) {
            strata_bail!(
                SchemaViolation: "bool column holds {} bytes; {} values need {}",
                self.data.len(),
                self.len,
                bit_util::ceil(self.len, 8)
            );
        }
        Ok((0..self.len)
            .map(|i| u8::from(bit_util::get_bit(&self.data, i)))
            .collect())
    }

    /// Decode variable-length values, normalizing either offset width.
    pub fn byte_string_values(&self) -> StrataResult<Vec<Vec<u8>>> {
        if !self.datatype.is_var_sized() {
            strata_bail!(Internal: "expected a variable-length column; got {}", self.datatype);
        }
        let offsets = self.offsets.normalized(self.len)?;
        let mut values = Vec::with_capacity(self.len);
        for window in offsets.windows(2) {
            let (beg, end) = (window[0] as usize, window[1] as usize);
            if beg > end || end > self.data.len() {
                strata_bail!(
                    SchemaViolation: "offset range {}..{} exceeds data length {}",
                    beg,
                    end,
                    self.data.len()
                );
            }
            values.push(self.data[beg..end].to_vec());
        }
        Ok(values)
    }

    /// Check validity of value `i`. Absent bitmap means all-valid.
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity
            .as_ref()
            .is_none_or(|bitmap| bit_util::get_bit(bitmap, i))
    }

    /// The validity bitmap expanded to one byte per value (1 valid, 0 null),
    /// or `None` when all values are valid.
    pub fn validity_bytes(&self) -> Option<Vec<u8>> {
        self.validity
            .as_ref()
            .map(|bitmap| (0..self.len).map(|i| u8::from(bit_util::get_bit(bitmap, i))).collect())
    }
}

/// One named column of an external batch. When `dictionary` is present the
/// column is dictionary-encoded: `data` holds batch-local integer indices and
/// `dictionary` holds the decoded values they point at.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Dimension or attribute name this column targets
    pub name: String,
    /// Values, or indices when dictionary-encoded
    pub data: ColumnData,
    /// Dictionary values for dictionary-encoded columns
    pub dictionary: Option<ColumnData>,
}

impl Column {
    /// A plain (non-dictionary) column.
    pub fn plain(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
            dictionary: None,
        }
    }

    /// A dictionary-encoded column: integer `indices` into `values`.
    pub fn dictionary(name: impl Into<String>, indices: ColumnData, values: ColumnData) -> Self {
        Self {
            name: name.into(),
            data: indices,
            dictionary: Some(values),
        }
    }
}

/// An ordered collection of named columns, one read or write cycle's worth of
/// data. Owned exclusively by the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnBatch {
    /// The columns, in schema order for reads
    pub columns: Vec<Column>,
}

impl ColumnBatch {
    /// Build a batch from columns, checking that row counts agree.
    pub fn try_new(columns: Vec<Column>) -> StrataResult<Self> {
        if let Some((first, rest)) = columns.split_first() {
            for col in rest {
                if col.data.len != first.data.len {
                    strata_bail!(
                        SchemaViolation: "column '{}' has {} rows; '{}' has {}",
                        col.name,
                        col.data.len,
                        first.name,
                        first.data.len
                    );
                }
            }
        }
        Ok(Self { columns })
    }

    /// Number of rows in the batch.
    pub fn num_rows(&self) -> usize {
        self.columns.first().map(|c| c.data.len).unwrap_or(0)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// An engine-ready write buffer for one column: data in the on-disk storage
/// type, 64-bit offsets for variable-length values, and one-byte-per-value
/// validity.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteColumn {
    /// Target dimension or attribute name
    pub name: String,
    /// On-disk storage datatype of `data`
    pub datatype: Datatype,
    /// Number of cells
    pub len: usize,
    /// Value bytes, one storage-width slot per cell for fixed types
    pub data: Vec<u8>,
    /// Offsets (`len + 1` entries) for variable-length values
    pub offsets: Option<Vec<u64>>,
    /// Validity, one byte per cell (1 valid), absent meaning all-valid
    pub validity: Option<Vec<u8>>,
}

impl WriteColumn {
    /// Build a fixed-width write buffer from native values.
    pub fn fixed<T: NativeDatatype>(
        name: impl Into<String>,
        values: &[T],
        validity: Option<Vec<u8>>,
    ) -> Self {
        let mut data = Vec::with_capacity(values.len() * T::WIDTH);
        for v in values {
            v.write_le(&mut data);
        }
        Self {
            name: name.into(),
            datatype: T::DATATYPE,
            len: values.len(),
            data,
            offsets: None,
            validity,
        }
    }

    /// Build a variable-length write buffer from byte strings.
    pub fn var<S: AsRef<[u8]>>(
        name: impl Into<String>,
        values: &[S],
        validity: Option<Vec<u8>>,
    ) -> Self {
        let mut data = Vec::new();
        let mut offsets = Vec::with_capacity(values.len() + 1);
        offsets.push(0u64);
        for v in values {
            data.extend_from_slice(v.as_ref());
            offsets.push(data.len() as u64);
        }
        Self {
            name: name.into(),
            datatype: Datatype::Bytes,
            len: values.len(),
            data,
            offsets: Some(offsets),
            validity,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use rstest::rstest;

    use crate::buffer::{ColumnData, Offsets};

    #[test]
    fn bool_unpacks_one_byte_per_value() {
        let col = ColumnData::from_bools(&[true, false, true, true, false, false, false, true, true]);
        assert_eq!(col.data.len(), 2);
        assert_eq!(col.bool_bytes().unwrap(), vec![1, 0, 1, 1, 0, 0, 0, 1, 1]);
    }

    #[rstest]
    #[case(Offsets::Small(vec![0, 3, 3, 7]))]
    #[case(Offsets::Large(vec![0, 3, 3, 7]))]
    fn offsets_normalize_to_u64(#[case] offsets: Offsets) {
        assert_eq!(offsets.normalized(3).unwrap(), vec![0, 3, 3, 7]);
    }

    #[test]
    fn offsets_entry_count_checked() {
        assert!(Offsets::Small(vec![0, 3]).normalized(3).is_err());
        assert!(Offsets::None.normalized(3).is_err());
    }

    #[test]
    fn byte_string_slicing() {
        let col = ColumnData::from_strs(&["red", "", "blue"]);
        let values = col.byte_string_values().unwrap();
        assert_eq!(values, vec![b"red".to_vec(), Vec::new(), b"blue".to_vec()]);
    }

    #[test]
    fn validity_round_trip() {
        let col = ColumnData::from_values(&[1i32, 2, 3]).with_validity(&[true, false, true]);
        assert!(col.is_valid(0));
        assert!(!col.is_valid(1));
        assert_eq!(col.validity_bytes().unwrap(), vec![1, 0, 1]);
    }

    #[test]
    fn fixed_values_width_mismatch() {
        let mut col = ColumnData::from_values(&[1i32, 2, 3]);
        col.data.pop();
        assert!(col.fixed_values::<i32>().is_err());
    }
}
