//! Enumeration extension and index remapping for categorical attributes.
//!
//! A categorical write arrives dictionary-encoded with batch-local indices.
//! Values the array has never seen are appended to the persisted enumeration
//! (order preserved, existing entries untouched), then every incoming index
//! is remapped from its batch-local position to the persisted position. The
//! remap runs even when nothing new arrived: batch-local order and persisted
//! order rarely agree.

use strata_dtype::{Datatype, match_each_integer_datatype, match_each_native_datatype};
use strata_error::{StrataResult, strata_bail, strata_err};

use crate::buffer::{Column, ColumnData, WriteColumn};
use crate::cast::CastOutcome;
use crate::engine::ArrayConnection;
use crate::scalar::Scalar;
use crate::schema::Attribute;

/// Extend the attribute's enumeration with unseen dictionary values and remap
/// the column's indices to persisted positions.
///
/// Nothing is committed here: the returned [`CastOutcome::extension`] carries
/// the extended enumeration for the caller to fold into one schema evolution,
/// so a failure on any column leaves the array untouched.
pub fn extend_and_remap(
    conn: &dyn ArrayConnection,
    attr: &Attribute,
    column: &Column,
) -> StrataResult<CastOutcome> {
    let enmr_name = attr
        .enumeration
        .as_deref()
        .ok_or_else(|| strata_err!(Internal: "attribute '{}' is not categorical", attr.name))?;
    let existing = conn.enumeration(enmr_name)?;
    let dictionary = column
        .dictionary
        .as_ref()
        .ok_or_else(|| strata_err!(Internal: "column '{}' carries no dictionary", column.name))?;

    let incoming = decode_dictionary_values(dictionary)?;
    if let Some(first) = incoming.first() {
        if first.datatype() != existing.datatype.storage() {
            strata_bail!(
                SchemaViolation: "dictionary for '{}' holds {} values; enumeration '{}' holds {}",
                column.name,
                first.datatype(),
                enmr_name,
                existing.datatype.storage()
            );
        }
    }

    // First-seen order, like the batch that introduced them.
    let mut new_values: Vec<Scalar> = Vec::new();
    for value in &incoming {
        if existing.position(value).is_none() && !new_values.contains(value) {
            new_values.push(value.clone());
        }
    }

    let extended = if new_values.is_empty() {
        None
    } else {
        let capacity = attr.datatype.max_index_capacity()?;
        let remaining = capacity.saturating_sub(existing.values.len() as u64);
        if (new_values.len() as u64) > remaining {
            strata_bail!(
                CapacityViolation: "cannot extend enumeration '{enmr_name}' by {} values; {} of {} slots remain",
                new_values.len(),
                remaining,
                capacity
            );
        }
        Some(existing.extend(new_values))
    };
    let target = extended.as_ref().unwrap_or(&existing);

    let positions = indices_as_positions(&column.name, &column.data, incoming.len())?;
    let remapped = positions
        .iter()
        .map(|p| match p {
            Some(batch_local) => target
                .position(&incoming[*batch_local])
                .map(Some)
                .ok_or_else(|| {
                    strata_err!(Internal: "dictionary value missing from enumeration '{enmr_name}'")
                }),
            None => Ok(None),
        })
        .collect::<StrataResult<Vec<Option<usize>>>>()?;

    let validity = column.data.validity_bytes();
    let write = match_each_integer_datatype!(attr.datatype, |$D| {
        let encoded = remapped
            .iter()
            .map(|p| match p {
                Some(position) => num_traits::cast::<usize, $D>(*position).ok_or_else(|| {
                    strata_err!(
                        CapacityViolation: "persisted position {position} does not fit in index type {}",
                        attr.datatype
                    )
                }),
                None => Ok(<$D as Default>::default()),
            })
            .collect::<StrataResult<Vec<$D>>>()?;
        Ok(WriteColumn::fixed(&column.name, &encoded, validity))
    })?;

    Ok(CastOutcome {
        column: write,
        extension: extended,
    })
}

/// Decode dictionary values into scalars, whatever their physical layout.
fn decode_dictionary_values(dictionary: &ColumnData) -> StrataResult<Vec<Scalar>> {
    if dictionary.datatype.is_var_sized() {
        return Ok(dictionary
            .byte_string_values()?
            .into_iter()
            .map(Scalar::Bytes)
            .collect());
    }
    if dictionary.datatype.storage() == Datatype::Bool {
        return Ok(dictionary
            .bool_bytes()?
            .into_iter()
            .map(|b| Scalar::Bool(b != 0))
            .collect());
    }
    match_each_native_datatype!(dictionary.datatype, |$T| {
        dictionary
            .fixed_values::<$T>()?
            .into_iter()
            .map(|v| Scalar::from_native(dictionary.datatype.storage(), v))
            .collect::<StrataResult<Vec<Scalar>>>()
    })
}

/// Decode an index column into batch-local positions, bounds-checked against
/// the dictionary length. Null cells decode as `None`.
pub(crate) fn indices_as_positions(
    name: &str,
    indices: &ColumnData,
    dictionary_len: usize,
) -> StrataResult<Vec<Option<usize>>> {
    match_each_integer_datatype!(indices.datatype.storage(), |$I| {
        let raw = indices.fixed_values::<$I>()?;
        raw.iter()
            .enumerate()
            .map(|(i, v)| {
                if !indices.is_valid(i) {
                    return Ok(None);
                }
                let position = num_traits::cast::<$I, usize>(*v)
                    .filter(|p| *p < dictionary_len)
                    .ok_or_else(|| {
                        strata_err!(
                            InvalidArgument: "index {v} of column '{name}' is out of range for {dictionary_len} dictionary values"
                        )
                    })?;
                Ok(Some(position))
            })
            .collect::<StrataResult<Vec<Option<usize>>>>()
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use crate::buffer::ColumnData;
    use crate::dict::{decode_dictionary_values, indices_as_positions};
    use crate::scalar::Scalar;

    #[test]
    fn dictionary_values_decode_by_layout() {
        let strings = ColumnData::from_strs(&["red", "blue"]);
        assert_eq!(
            decode_dictionary_values(&strings).unwrap(),
            vec![Scalar::from("red"), Scalar::from("blue")]
        );

        let bools = ColumnData::from_bools(&[true, false]);
        assert_eq!(
            decode_dictionary_values(&bools).unwrap(),
            vec![Scalar::Bool(true), Scalar::Bool(false)]
        );

        let ints = ColumnData::from_values(&[7i32]);
        assert_eq!(decode_dictionary_values(&ints).unwrap(), vec![Scalar::Int32(7)]);
    }

    #[test]
    fn out_of_range_index_rejected() {
        let indices = ColumnData::from_values(&[0i32, 2]);
        assert!(indices_as_positions("c", &indices, 2).is_err());
        assert!(indices_as_positions("c", &indices, 3).is_ok());
    }

    #[test]
    fn null_index_decodes_as_none() {
        let indices = ColumnData::from_values(&[0u8, 1]).with_validity(&[true, false]);
        let positions = indices_as_positions("c", &indices, 2).unwrap();
        assert_eq!(positions, vec![Some(0), None]);
    }

    #[test]
    fn non_integer_index_type_rejected() {
        let indices = ColumnData::from_values(&[0.5f32]);
        assert!(indices_as_positions("c", &indices, 2).is_err());
    }
}
