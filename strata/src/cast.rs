//! Casting of user-typed columns to engine-ready write buffers.
//!
//! Incoming batches carry whatever types the caller produced; the schema
//! dictates what lands on disk. This module bridges the two: value-level
//! numeric casts, bit-packed bool expansion, offset normalization, dictionary
//! promotion for non-categorical targets, and the hand-off to the dictionary
//! extension path for categorical ones.

use strata_dtype::{Datatype, match_each_native_datatype};
use strata_error::{StrataResult, strata_bail, strata_err};

use crate::buffer::{Column, ColumnData, WriteColumn};
use crate::dict;
use crate::engine::ArrayConnection;
use crate::schema::Enumeration;

/// The result of casting one column: an engine-ready buffer plus, for
/// categorical attributes that saw new dictionary values, the extended
/// enumeration to commit before the write.
pub struct CastOutcome {
    /// The write buffer, in the on-disk storage type.
    pub column: WriteColumn,
    /// An extended enumeration, when the cast introduced new values.
    pub extension: Option<Enumeration>,
}

/// Cast one incoming column against the schema of `conn`.
pub fn cast_column(conn: &dyn ArrayConnection, column: &Column) -> StrataResult<CastOutcome> {
    let schema = conn.schema();
    let disk = schema.column_datatype(&column.name)?;

    if let Some(attr) = schema.attribute(&column.name) {
        if attr.enumeration.is_some() {
            if column.dictionary.is_none() {
                strata_bail!(
                    SchemaViolation: "categorical attribute '{}' requires dictionary-encoded input",
                    column.name
                );
            }
            return dict::extend_and_remap(conn, attr, column);
        }
    }

    // A dictionary aimed at a plain column decodes to its values first.
    let promoted;
    let data = match &column.dictionary {
        Some(dictionary) => {
            promoted = promote_indexes_to_values(&column.name, &column.data, dictionary)?;
            &promoted
        }
        None => &column.data,
    };
    Ok(CastOutcome {
        column: cast_data(&column.name, disk, data)?,
        extension: None,
    })
}

/// Resolve a dictionary-encoded column into the values its indices point at,
/// carrying the index column's validity.
fn promote_indexes_to_values(
    name: &str,
    indices: &ColumnData,
    dictionary: &ColumnData,
) -> StrataResult<ColumnData> {
    let positions = dict::indices_as_positions(name, indices, dictionary.len)?;

    let mut promoted = if dictionary.datatype.is_var_sized() {
        let values = dictionary.byte_string_values()?;
        let gathered = positions
            .iter()
            .map(|p| p.map(|i| values[i].as_slice()).unwrap_or_default())
            .collect::<Vec<_>>();
        ColumnData::from_byte_strings(&gathered)
    } else if dictionary.datatype.storage() == Datatype::Bool {
        let values = dictionary.bool_bytes()?;
        let gathered = positions
            .iter()
            .map(|p| p.map(|i| values[i] != 0).unwrap_or_default())
            .collect::<Vec<_>>();
        ColumnData::from_bools(&gathered)
    } else {
        match_each_native_datatype!(dictionary.datatype, |$T| {
            let values = dictionary.fixed_values::<$T>()?;
            let gathered = positions
                .iter()
                .map(|p| p.map(|i| values[i]).unwrap_or_default())
                .collect::<Vec<_>>();
            Ok(ColumnData::from_values(&gathered))
        })?
    };
    promoted.datatype = dictionary.datatype;
    promoted.validity = indices.validity.clone();
    promoted.len = positions.len();
    Ok(promoted)
}

/// Cast plain column data to the on-disk storage type of `disk`.
fn cast_data(name: &str, disk: Datatype, data: &ColumnData) -> StrataResult<WriteColumn> {
    let validity = data.validity_bytes();

    if data.datatype.is_var_sized() {
        if !disk.is_var_sized() {
            strata_bail!(
                SchemaViolation: "column '{name}' holds variable-length data; schema expects {disk}"
            );
        }
        let offsets = data.offsets.normalized(data.len)?;
        return Ok(WriteColumn {
            name: name.to_string(),
            datatype: Datatype::Bytes,
            len: data.len,
            data: data.data.clone(),
            offsets: Some(offsets),
            validity,
        });
    }
    if disk.is_var_sized() {
        strata_bail!(
            SchemaViolation: "column '{name}' holds {} values; schema expects variable-length data",
            data.datatype
        );
    }

    match_each_native_datatype!(data.datatype, |$U| {
        let values = data.fixed_values::<$U>()?;
        match_each_native_datatype!(disk, |$T| {
            let cast = values
                .iter()
                .map(|v| {
                    num_traits::cast::<$U, $T>(*v).ok_or_else(|| {
                        strata_err!(
                            InvalidArgument: "value {v} of column '{name}' does not fit in {}",
                            disk.storage()
                        )
                    })
                })
                .collect::<StrataResult<Vec<$T>>>()?;
            let mut column = WriteColumn::fixed(name, &cast, validity);
            column.datatype = disk.storage();
            Ok(column)
        })
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use strata_dtype::Datatype;

    use crate::buffer::{ColumnData, Offsets};
    use crate::cast::cast_data;

    #[test]
    fn widening_and_narrowing_casts() {
        let data = ColumnData::from_values(&[1i32, 2, 300]);
        let wide = cast_data("c", Datatype::Int64, &data).unwrap();
        assert_eq!(wide.datatype, Datatype::Int64);
        assert_eq!(wide.data.len(), 24);

        // 300 does not fit in an i8
        assert!(cast_data("c", Datatype::Int8, &data).is_err());
    }

    #[test]
    fn bool_expands_to_one_byte_per_cell() {
        let data = ColumnData::from_bools(&[true, false, true]);
        let column = cast_data("flag", Datatype::Bool, &data).unwrap();
        assert_eq!(column.datatype, Datatype::Bool);
        assert_eq!(column.data, vec![1, 0, 1]);
    }

    #[test]
    fn small_offsets_normalize() {
        let mut data = ColumnData::from_strs(&["ab", "c"]);
        data.offsets = Offsets::Small(vec![0, 2, 3]);
        let column = cast_data("s", Datatype::Bytes, &data).unwrap();
        assert_eq!(column.offsets.unwrap(), vec![0, 2, 3]);
    }

    #[test]
    fn var_fixed_mismatch_rejected() {
        let strings = ColumnData::from_strs(&["ab"]);
        assert!(cast_data("c", Datatype::Int64, &strings).is_err());
        let ints = ColumnData::from_values(&[1i64]);
        assert!(cast_data("c", Datatype::Bytes, &ints).is_err());
    }

    #[test]
    fn temporal_target_stores_int64() {
        let data = ColumnData::from_values(&[10i64, 20]);
        let column =
            cast_data("t", Datatype::DateTime(strata_dtype::TimeUnit::Millisecond), &data)
                .unwrap();
        assert_eq!(column.datatype, Datatype::Int64);
    }
}
