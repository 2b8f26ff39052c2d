#[path = "common/mod.rs"]
mod common;

use botlabel::{
    prepare, prepare_model_matrix, standardize, BotLabelPipeline, FeatureTable, LabelRow, SchemaError,
    AVG_COMMENT_LENGTH, AVG_COSINE_SIMILARITY, COMMENT_POST_RATIO, PARENT_CHILD_SIMILARITY,
};
use common::*;

fn table(rows: usize, columns: &[(&str, Vec<Option<f64>>)]) -> FeatureTable {
    let mut t = FeatureTable::with_usernames((0..rows).map(|i| format!("u{i}")).collect());
    for (name, values) in columns {
        t.push_column(name, values.clone());
    }
    t
}

fn full_columns() -> Vec<(&'static str, Vec<Option<f64>>)> {
    vec![
        ("link_karma", vec![Some(1.0), None, Some(3.0)]),
        ("comment_karma", vec![Some(5.0), Some(5.0), Some(5.0)]),
        ("account_age", vec![Some(1.0), Some(2.0), Some(3.0)]),
        ("is_verified", vec![Some(1.0), Some(0.0), None]),
        ("avg_cosine_similarity", vec![None, Some(0.5), Some(1.0)]),
        ("all_users_similarity", vec![None, Some(0.1), Some(0.2)]),
        ("avg_comment_length", vec![Some(2.0), None, Some(4.0)]),
        ("max_comment_length", vec![Some(2.0), None, Some(4.0)]),
        ("min_comment_length", vec![Some(2.0), None, Some(4.0)]),
        ("comment_post_ratio", vec![None, Some(2.0), Some(0.0)]),
        ("avg_thread_depth", vec![None, Some(1.0), Some(0.0)]),
        ("parent_child_similarity", vec![None, Some(0.3), Some(0.0)]),
        ("avg_ttr", vec![None, Some(1.0), Some(0.5)]),
        ("avg_flesch_kincaid_grade", vec![Some(1.0), Some(2.0), Some(3.0)]),
        ("ngram_overlap", vec![None, Some(0.0), Some(1.0)]),
    ]
}

fn labels(flags: &[bool]) -> Vec<LabelRow> {
    flags.iter().enumerate().map(|(i, &is_bot)| LabelRow { username: format!("u{i}"), is_bot }).collect()
}

/// Population z-score over present values; nulls stay null; a constant column is only centred.
#[test]
fn standardize_ignores_nulls() {
    let mut v = vec![Some(1.0), None, Some(3.0)];
    standardize(&mut v);
    assert_eq!(v, vec![Some(-1.0), None, Some(1.0)]);

    let mut flat = vec![Some(5.0), Some(5.0)];
    standardize(&mut flat);
    assert_eq!(flat, vec![Some(0.0), Some(0.0)]);
}

/// Constant fills, fill-then-standardize, standardize-then-fill, column order and 0/1 labels.
#[test]
fn prepares_model_matrix() {
    let t = table(3, &full_columns());
    let m = prepare(&t, &labels(&[true, false, true])).unwrap();
    assert_eq!(m.n_rows, 3);
    assert_eq!(
        m.column_names(),
        vec![
            "avg_comment_length",
            "max_comment_length",
            "min_comment_length",
            "avg_flesch_kincaid_grade",
            "link_karma",
            "comment_karma",
            "account_age",
            "is_verified",
            "avg_cosine_similarity",
            "all_users_similarity",
            "comment_post_ratio",
            "avg_thread_depth",
            "parent_child_similarity",
            "avg_ttr",
            "ngram_overlap",
            "is_bot",
        ]
    );

    assert_eq!(m.column(AVG_COSINE_SIMILARITY).unwrap(), &[Some(0.0), Some(0.5), Some(1.0)]);
    assert_eq!(m.column(COMMENT_POST_RATIO).unwrap(), &[Some(1.0), Some(2.0), Some(0.0)]);
    // untouched remainder keeps its nulls
    assert_eq!(m.column(PARENT_CHILD_SIMILARITY).unwrap(), &[None, Some(0.3), Some(0.0)]);

    // [2, 0, 4] after the zero fill: mean 2, population std sqrt(8/3)
    let len = m.column(AVG_COMMENT_LENGTH).unwrap();
    let s = (8.0f64 / 3.0).sqrt();
    assert!((len[0].unwrap() - 0.0).abs() < 1e-12);
    assert!((len[1].unwrap() + 2.0 / s).abs() < 1e-12);
    assert!((len[2].unwrap() - 2.0 / s).abs() < 1e-12);

    // standardized over [1, 3], then the gap filled with 1
    assert_eq!(m.column("link_karma").unwrap(), &[Some(-1.0), Some(1.0), Some(1.0)]);
    assert_eq!(m.column("comment_karma").unwrap(), &[Some(0.0), Some(0.0), Some(0.0)]);
    assert_eq!(m.column("is_verified").unwrap(), &[Some(1.0), Some(-1.0), Some(1.0)]);

    assert_eq!(m.column("is_bot").unwrap(), &[Some(1.0), Some(0.0), Some(1.0)]);
}

/// Feature rows without a label are left out of the matrix.
#[test]
fn unlabeled_rows_are_skipped() {
    let t = table(3, &full_columns());
    let m = prepare(&t, &labels(&[false, true])).unwrap();
    assert_eq!(m.n_rows, 2);
    assert_eq!(m.column("is_bot").unwrap(), &[Some(0.0), Some(1.0)]);
}

/// A named column missing from the feature table is fatal.
#[test]
fn missing_named_column_is_fatal() {
    let cols: Vec<_> = full_columns().into_iter().filter(|(n, _)| *n != "avg_ttr").collect();
    let t = table(3, &cols);
    let err = prepare(&t, &labels(&[true, true, true])).unwrap_err();
    match err.downcast_ref::<SchemaError>() {
        Some(SchemaError::MissingFrameColumn { column, .. }) => assert_eq!(column, "avg_ttr"),
        other => panic!("expected MissingFrameColumn, got {other:?}"),
    }
}

/// The saved feature and label tables prepare into a matrix file with no null
/// in any filled or standardized column.
#[test]
fn prepare_from_saved_tables() {
    let base = make_corpus_basic();
    BotLabelPipeline::new().data_dir(&base).progress(false).run().unwrap();

    let out = base.join("matrix.csv");
    let m = prepare_model_matrix(base.join("features.csv"), base.join("labels.csv"), &out).unwrap();
    assert_eq!(m.n_rows, basic_usernames().len());
    for name in ["avg_comment_length", "link_karma", "is_verified", "avg_cosine_similarity", "is_bot"] {
        assert!(m.column(name).unwrap().iter().all(Option::is_some), "{name} has nulls");
    }

    let lines = read_lines(&out);
    assert_eq!(lines.len(), 1 + basic_usernames().len());
    assert!(lines[0].starts_with("avg_comment_length,max_comment_length,"));
    assert!(lines[0].ends_with(",is_bot"));
}
