#![allow(clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use strata::engine::mem::MemEngine;
use strata::engine::{OpenMode, StorageEngine, TimestampRange};
use strata::{
    Array, ArrayKind, ArraySchema, Attribute, Column, ColumnBatch, ColumnData, CurrentDomain,
    Dimension, Enumeration, MetadataValue, OBJECT_TYPE_KEY, OpenOptions, Scalar, ScalarRange,
};
use strata_error::StrataError;

fn engine() -> Arc<MemEngine> {
    Arc::new(MemEngine::new())
}

fn dyn_engine(engine: &Arc<MemEngine>) -> Arc<dyn StorageEngine> {
    Arc::clone(engine) as Arc<dyn StorageEngine>
}

fn joinid_schema() -> ArraySchema {
    ArraySchema {
        kind: ArrayKind::Sparse,
        allows_duplicates: false,
        dimensions: vec![Dimension {
            name: "joinid".into(),
            datatype: strata_dtype::Datatype::Int64,
            range: ScalarRange::new(0i64, 9999i64),
        }],
        attributes: vec![Attribute {
            name: "value".into(),
            datatype: strata_dtype::Datatype::Float64,
            enumeration: None,
        }],
        enumerations: vec![],
        current_domain: None,
    }
}

fn categorical_schema(seed_values: Vec<Scalar>) -> ArraySchema {
    ArraySchema {
        kind: ArrayKind::Sparse,
        allows_duplicates: false,
        dimensions: vec![Dimension {
            name: "joinid".into(),
            datatype: strata_dtype::Datatype::Int64,
            range: ScalarRange::new(0i64, 9999i64),
        }],
        attributes: vec![Attribute {
            name: "label".into(),
            datatype: strata_dtype::Datatype::UInt8,
            enumeration: Some("label_enum".into()),
        }],
        enumerations: vec![Enumeration {
            name: "label_enum".into(),
            datatype: strata_dtype::Datatype::Bytes,
            values: seed_values,
        }],
        current_domain: None,
    }
}

fn open(
    engine: &Arc<MemEngine>,
    uri: &str,
    mode: OpenMode,
    timestamp: Option<TimestampRange>,
) -> Array {
    Array::open(
        dyn_engine(engine),
        mode,
        uri,
        OpenOptions {
            timestamp,
            ..OpenOptions::default()
        },
    )
    .unwrap()
}

fn write_ids(engine: &Arc<MemEngine>, uri: &str, ids: &[i64]) {
    let mut array = open(engine, uri, OpenMode::Write, None);
    let values = ids.iter().map(|i| *i as f64).collect::<Vec<_>>();
    let batch = ColumnBatch::try_new(vec![
        Column::plain("joinid", ColumnData::from_values(ids)),
        Column::plain("value", ColumnData::from_values(&values)),
    ])
    .unwrap();
    array.write(batch, true).unwrap();
    array.close();
}

fn scan_count(engine: &Arc<MemEngine>, uri: &str) -> u64 {
    let mut array = open(engine, uri, OpenMode::Read, None);
    let mut total = 0;
    while let Some(batch) = array.read_next().unwrap() {
        total += batch.num_rows() as u64;
    }
    total
}

#[test]
fn nnz_fast_path_sums_disjoint_fragments() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    write_ids(&engine, "a", &(0..10).collect::<Vec<_>>());
    write_ids(&engine, "a", &(10..25).collect::<Vec<_>>());
    write_ids(&engine, "a", &(25..30).collect::<Vec<_>>());

    let array = open(&engine, "a", OpenMode::Read, None);
    assert_eq!(array.nnz().unwrap(), 30);
    assert_eq!(scan_count(&engine, "a"), 30);
}

#[test]
fn nnz_overlapping_fragments_fall_back_to_scan() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    write_ids(&engine, "a", &(0..10).collect::<Vec<_>>());
    write_ids(&engine, "a", &(5..15).collect::<Vec<_>>());

    let array = open(&engine, "a", OpenMode::Read, None);
    // 0..15 distinct ids after duplicate resolution
    assert_eq!(array.nnz().unwrap(), 15);
    assert_eq!(array.nnz().unwrap(), scan_count(&engine, "a"));
}

#[test]
fn nnz_consolidated_fragment_falls_back_to_scan() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    write_ids(&engine, "a", &(0..10).collect::<Vec<_>>());
    write_ids(&engine, "a", &(5..15).collect::<Vec<_>>());
    engine.consolidate("a").unwrap();

    let array = open(&engine, "a", OpenMode::Read, None);
    assert_eq!(array.nnz().unwrap(), 15);
}

#[test]
fn nnz_agrees_with_scan_on_random_fragment_layouts() {
    let mut rng = StdRng::seed_from_u64(17);
    for round in 0..8 {
        let engine = engine();
        let uri = format!("a{round}");
        Array::create(&dyn_engine(&engine), &uri, joinid_schema(), "array", None).unwrap();

        let mut distinct = HashSet::new();
        for _ in 0..rng.random_range(1..6) {
            let start = rng.random_range(0i64..100);
            let len = rng.random_range(1i64..40);
            let ids = (start..start + len).collect::<Vec<_>>();
            distinct.extend(ids.iter().copied());
            write_ids(&engine, &uri, &ids);
        }
        if rng.random_range(0..2) == 1 {
            engine.consolidate(&uri).unwrap();
        }

        let array = open(&engine, &uri, OpenMode::Read, None);
        assert_eq!(array.nnz().unwrap(), distinct.len() as u64);
        assert_eq!(array.nnz().unwrap(), scan_count(&engine, &uri));
    }
}

#[test]
fn nnz_respects_timestamp_window() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    {
        let mut array = open(&engine, "a", OpenMode::Write, Some((10, 10)));
        let batch = ColumnBatch::try_new(vec![
            Column::plain("joinid", ColumnData::from_values(&[0i64, 1])),
            Column::plain("value", ColumnData::from_values(&[0.0f64, 1.0])),
        ])
        .unwrap();
        array.write(batch, true).unwrap();
    }
    {
        let mut array = open(&engine, "a", OpenMode::Write, Some((20, 20)));
        let batch = ColumnBatch::try_new(vec![
            Column::plain("joinid", ColumnData::from_values(&[2i64])),
            Column::plain("value", ColumnData::from_values(&[2.0f64])),
        ])
        .unwrap();
        array.write(batch, true).unwrap();
    }

    assert_eq!(open(&engine, "a", OpenMode::Read, Some((0, 15))).nnz().unwrap(), 2);
    assert_eq!(open(&engine, "a", OpenMode::Read, Some((0, 25))).nnz().unwrap(), 3);
    assert_eq!(open(&engine, "a", OpenMode::Read, Some((15, 25))).nnz().unwrap(), 1);
}

#[test]
fn upgrade_then_resize_lifecycle() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    let mut array = open(&engine, "a", OpenMode::Write, None);

    // resize before any upgrade is a lifecycle violation
    assert!(matches!(
        array.resize(&[100]),
        Err(StrataError::LifecycleViolation(_))
    ));

    array.upgrade_shape(&[100]).unwrap();
    assert_eq!(array.shape().unwrap(), vec![100]);
    assert_eq!(array.maxshape().unwrap(), vec![10000]);

    // upgrading twice is a lifecycle violation
    assert!(matches!(
        array.upgrade_shape(&[200]),
        Err(StrataError::LifecycleViolation(_))
    ));

    // resizing to the identical shape is a no-op success
    array.resize(&[100]).unwrap();
    array.resize(&[100]).unwrap();
    array.resize(&[500]).unwrap();
    assert_eq!(array.shape().unwrap(), vec![500]);

    // shrinking names the dimension and both bounds
    let err = array.resize(&[400]).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("joinid"), "{message}");
    assert!(message.contains("399"), "{message}");
    assert!(message.contains("499"), "{message}");

    // growing past the maximum domain fails too
    assert!(array.resize(&[20000]).is_err());
}

#[test]
fn can_checkers_are_pure() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    let array = open(&engine, "a", OpenMode::Read, None);

    let (ok, _) = array.can_upgrade_shape(&[100]).unwrap();
    assert!(ok);
    let (ok, reason) = array.can_resize(&[100]).unwrap();
    assert!(!ok);
    assert!(reason.contains("no shape"));
    // probing legality never mutated anything
    assert!(array.schema().current_domain.is_none());
}

#[test]
fn joinid_submode_copies_other_dimensions_from_max_domain() {
    let engine = engine();
    let schema = ArraySchema {
        kind: ArrayKind::Sparse,
        allows_duplicates: false,
        dimensions: vec![
            Dimension {
                name: "joinid".into(),
                datatype: strata_dtype::Datatype::Int64,
                range: ScalarRange::new(0i64, 9999i64),
            },
            Dimension {
                name: "key".into(),
                datatype: strata_dtype::Datatype::Bytes,
                range: ScalarRange::new("", "\u{7f}"),
            },
        ],
        attributes: vec![Attribute {
            name: "value".into(),
            datatype: strata_dtype::Datatype::Float64,
            enumeration: None,
        }],
        enumerations: vec![],
        current_domain: None,
    };
    Array::create(&dyn_engine(&engine), "a", schema, "array", None).unwrap();
    let mut array = open(&engine, "a", OpenMode::Write, None);

    assert_eq!(array.joinid_shape().unwrap(), None);
    assert_eq!(array.joinid_maxshape().unwrap(), Some(10000));

    array.upgrade_joinid_shape(50).unwrap();
    assert_eq!(array.joinid_shape().unwrap(), Some(50));
    let current = array.schema().current_domain.clone().unwrap();
    assert_eq!(current.ranges[0], ScalarRange::new(0i64, 49i64));
    assert_eq!(current.ranges[1].hi, Scalar::Bytes(vec![0xff]));

    array.resize_joinid(80).unwrap();
    assert_eq!(array.joinid_shape().unwrap(), Some(80));
    assert!(matches!(
        array.resize_joinid(40),
        Err(StrataError::LifecycleViolation(_))
    ));
}

#[test]
fn mixed_type_domain_upgrade() {
    let engine = engine();
    let schema = ArraySchema {
        kind: ArrayKind::Sparse,
        allows_duplicates: false,
        dimensions: vec![
            Dimension {
                name: "key".into(),
                datatype: strata_dtype::Datatype::Bytes,
                range: ScalarRange::new("", "\u{7f}"),
            },
            Dimension {
                name: "pos".into(),
                datatype: strata_dtype::Datatype::Int32,
                range: ScalarRange {
                    lo: Scalar::Int32(0),
                    hi: Scalar::Int32(999),
                },
            },
        ],
        attributes: vec![],
        enumerations: vec![],
        current_domain: None,
    };
    Array::create(&dyn_engine(&engine), "a", schema, "array", None).unwrap();
    let mut array = open(&engine, "a", OpenMode::Write, None);

    let bad = CurrentDomain {
        ranges: vec![
            ScalarRange::new("a", "z"),
            ScalarRange {
                lo: Scalar::Int32(0),
                hi: Scalar::Int32(100),
            },
        ],
    };
    let (ok, reason) = array.can_upgrade_domain(&bad).unwrap();
    assert!(!ok);
    assert!(reason.contains("key"));

    let good = CurrentDomain {
        ranges: vec![
            ScalarRange::new("", ""),
            ScalarRange {
                lo: Scalar::Int32(0),
                hi: Scalar::Int32(100),
            },
        ],
    };
    array.upgrade_domain(&good).unwrap();
    let current = array.schema().current_domain.clone().unwrap();
    assert_eq!(current.ranges[0].hi, Scalar::Bytes(vec![0xff]));
    assert_eq!(current.ranges[1].hi, Scalar::Int32(100));
}

#[test]
fn categorical_round_trip_first_seen_order() {
    let engine = engine();
    Array::create(
        &dyn_engine(&engine),
        "a",
        categorical_schema(vec![]),
        "array",
        None,
    )
    .unwrap();

    let mut array = open(&engine, "a", OpenMode::Write, None);
    let batch = ColumnBatch::try_new(vec![
        Column::plain("joinid", ColumnData::from_values(&[0i64, 1])),
        Column::dictionary(
            "label",
            ColumnData::from_values(&[0u8, 1]),
            ColumnData::from_strs(&["red", "blue"]),
        ),
    ])
    .unwrap();
    array.write(batch, true).unwrap();

    let enumeration = array.attribute_enumeration("label").unwrap().unwrap();
    assert_eq!(
        enumeration.values,
        vec![Scalar::from("red"), Scalar::from("blue")]
    );

    let mut reader = open(&engine, "a", OpenMode::Read, None);
    let batch = reader.read_next().unwrap().unwrap();
    let indices = batch
        .column("label")
        .unwrap()
        .data
        .fixed_values::<u8>()
        .unwrap();
    let resolved = indices
        .iter()
        .map(|i| enumeration.values[*i as usize].clone())
        .collect::<Vec<_>>();
    assert_eq!(resolved, vec![Scalar::from("red"), Scalar::from("blue")]);
    assert!(reader.read_next().unwrap().is_none());
}

#[test]
fn dictionary_extension_remaps_batch_local_indices() {
    let engine = engine();
    let seed = vec![
        Scalar::from("red"),
        Scalar::from("blue"),
        Scalar::from("green"),
    ];
    Array::create(
        &dyn_engine(&engine),
        "a",
        categorical_schema(seed),
        "array",
        None,
    )
    .unwrap();

    let mut array = open(&engine, "a", OpenMode::Write, None);
    let batch = ColumnBatch::try_new(vec![
        Column::plain("joinid", ColumnData::from_values(&[0i64, 1])),
        Column::dictionary(
            "label",
            ColumnData::from_values(&[0u8, 1]),
            ColumnData::from_strs(&["blue", "yellow"]),
        ),
    ])
    .unwrap();
    array.write(batch, true).unwrap();

    let enumeration = array.attribute_enumeration("label").unwrap().unwrap();
    assert_eq!(
        enumeration.values,
        vec![
            Scalar::from("red"),
            Scalar::from("blue"),
            Scalar::from("green"),
            Scalar::from("yellow"),
        ]
    );

    let mut reader = open(&engine, "a", OpenMode::Read, None);
    let batch = reader.read_next().unwrap().unwrap();
    let indices = batch
        .column("label")
        .unwrap()
        .data
        .fixed_values::<u8>()
        .unwrap();
    assert_eq!(indices, vec![1, 3]);
}

#[test]
fn plain_attribute_rejects_missing_dictionary() {
    let engine = engine();
    Array::create(
        &dyn_engine(&engine),
        "a",
        categorical_schema(vec![]),
        "array",
        None,
    )
    .unwrap();
    let mut array = open(&engine, "a", OpenMode::Write, None);
    let batch = ColumnBatch::try_new(vec![
        Column::plain("joinid", ColumnData::from_values(&[0i64])),
        Column::plain("label", ColumnData::from_values(&[0u8])),
    ])
    .unwrap();
    assert!(matches!(
        array.write(batch, true),
        Err(StrataError::SchemaViolation(_))
    ));
}

#[test]
fn capacity_overflow_leaves_enumeration_untouched() {
    let engine = engine();
    let seed = (0..255)
        .map(|i| Scalar::Bytes(format!("v{i}").into_bytes()))
        .collect::<Vec<_>>();
    Array::create(
        &dyn_engine(&engine),
        "a",
        categorical_schema(seed),
        "array",
        None,
    )
    .unwrap();

    let mut array = open(&engine, "a", OpenMode::Write, None);
    let batch = ColumnBatch::try_new(vec![
        Column::plain("joinid", ColumnData::from_values(&[0i64])),
        Column::dictionary(
            "label",
            ColumnData::from_values(&[0u8]),
            ColumnData::from_strs(&["overflow"]),
        ),
    ])
    .unwrap();
    assert!(matches!(
        array.write(batch, true),
        Err(StrataError::CapacityViolation(_))
    ));

    // no partial mutation: the enumeration and the cell count are unchanged
    let enumeration = array.attribute_enumeration("label").unwrap().unwrap();
    assert_eq!(enumeration.values.len(), 255);
    assert_eq!(scan_count(&engine, "a"), 0);
}

#[test]
fn reserved_metadata_requires_force_and_respects_windows() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", Some((1, 1))).unwrap();

    let mut array = open(&engine, "a", OpenMode::Write, Some((10, 10)));
    assert!(matches!(
        array.set_metadata(OBJECT_TYPE_KEY, MetadataValue::utf8("other"), false),
        Err(StrataError::SchemaViolation(_))
    ));

    array
        .set_metadata(OBJECT_TYPE_KEY, MetadataValue::utf8("other"), true)
        .unwrap();
    // visible immediately on the still-open write handle
    assert_eq!(
        array.get_metadata(OBJECT_TYPE_KEY).unwrap().as_utf8().unwrap(),
        "other"
    );
    array.close();

    let inside = open(&engine, "a", OpenMode::Read, Some((0, 20)));
    assert_eq!(
        inside.get_metadata(OBJECT_TYPE_KEY).unwrap().as_utf8().unwrap(),
        "other"
    );

    // a window past the creation stamp but before the override sees neither
    let outside = open(&engine, "a", OpenMode::Read, Some((2, 5)));
    assert!(!outside.has_metadata(OBJECT_TYPE_KEY));
}

#[test]
fn user_metadata_round_trip() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();

    let mut array = open(&engine, "a", OpenMode::Write, None);
    let before = array.metadata_num();
    array
        .set_metadata("rows_hint", MetadataValue::from_native(42i64), false)
        .unwrap();
    assert_eq!(array.metadata_num(), before + 1);
    assert_eq!(
        array.get_metadata("rows_hint").unwrap().as_native::<i64>().unwrap(),
        42
    );
    array.delete_metadata("rows_hint", false).unwrap();
    assert!(!array.has_metadata("rows_hint"));
}

#[test]
fn zero_row_read_yields_exactly_one_empty_batch() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    let mut array = open(&engine, "a", OpenMode::Read, None);

    let batch = array.read_next().unwrap().unwrap();
    assert_eq!(batch.num_rows(), 0);
    assert!(batch.column("joinid").is_some());
    assert!(array.read_next().unwrap().is_none());
    assert!(array.read_next().unwrap().is_none());
}

#[test]
fn reads_paginate_under_a_small_byte_budget() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    write_ids(&engine, "a", &(0..100).collect::<Vec<_>>());

    let mut array = Array::open(
        dyn_engine(&engine),
        OpenMode::Read,
        "a",
        OpenOptions {
            columns: vec!["joinid".into()],
            byte_budget: 64,
            ..OpenOptions::default()
        },
    )
    .unwrap();
    let mut batches = 0;
    let mut total = 0;
    while let Some(batch) = array.read_next().unwrap() {
        assert!(batch.num_rows() <= 8);
        batches += 1;
        total += batch.num_rows();
    }
    assert_eq!(total, 100);
    assert!(batches > 1);
}

#[test]
fn write_mode_is_enforced() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();

    let mut reader = open(&engine, "a", OpenMode::Read, None);
    let batch = ColumnBatch::try_new(vec![
        Column::plain("joinid", ColumnData::from_values(&[0i64])),
        Column::plain("value", ColumnData::from_values(&[0.0f64])),
    ])
    .unwrap();
    assert!(matches!(
        reader.write(batch, true),
        Err(StrataError::ModeViolation(_))
    ));

    let mut writer = open(&engine, "a", OpenMode::Write, None);
    assert!(matches!(
        writer.read_next(),
        Err(StrataError::ModeViolation(_))
    ));
}

#[test]
fn reopen_refreshes_view() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "array", None).unwrap();
    let reader = open(&engine, "a", OpenMode::Read, None);
    write_ids(&engine, "a", &[0, 1, 2]);

    let mut reader = reader.reopen(OpenMode::Read, None).unwrap();
    let mut total = 0;
    while let Some(batch) = reader.read_next().unwrap() {
        total += batch.num_rows();
    }
    assert_eq!(total, 3);
}

#[test]
fn creation_stamps_reserved_keys() {
    let engine = engine();
    Array::create(&dyn_engine(&engine), "a", joinid_schema(), "frame", None).unwrap();
    let array = open(&engine, "a", OpenMode::Read, None);
    assert_eq!(
        array.get_metadata(OBJECT_TYPE_KEY).unwrap().as_utf8().unwrap(),
        "frame"
    );
    assert_eq!(
        array
            .get_metadata(strata::ENCODING_VERSION_KEY)
            .unwrap()
            .as_utf8()
            .unwrap(),
        strata::ENCODING_VERSION_VAL
    );
}
