#[path = "common/mod.rs"]
mod common;

use botlabel::{
    discover_dumps, load_tables, merge_raw_dumps, read_comments, read_posts, read_users, PipelineOptions,
    SchemaError, COMMENTS_FILE, POSTS_FILE, USERS_FILE,
};
use common::*;
use std::fs;

const NO_ENGAGEMENT_HEADER: &[&str] = &["id", "parent_id", "post_title", "username", "body", "score"];

/// Rows without a body and exact duplicates are dropped; users keep their first row.
#[test]
fn load_applies_drop_and_dedupe_rules() {
    let base = make_corpus_basic();
    let tables = load_tables(&PipelineOptions::default().with_data_dir(&base)).unwrap();

    // 13 comment rows: one without a body, one exact duplicate
    assert_eq!(tables.comments.len(), 11);
    assert!(tables.comments.iter().all(|c| !c.body.is_empty()));
    assert!(!tables.comments.iter().any(|c| c.id == "c10"));
    // 4 post rows: one exact duplicate
    assert_eq!(tables.posts.len(), 3);
    // 10 user rows: alice twice
    assert_eq!(tables.users.len(), 9);
    let alice = tables.users.iter().find(|u| u.username == "alice").unwrap();
    assert_eq!(alice.link_karma, Some(100.0));
    assert_eq!(alice.is_verified, Some(true));

    let c2 = tables.comments.iter().find(|c| c.id == "c2").unwrap();
    assert_eq!(c2.parent_id, "t1_c1");
    assert_eq!(c2.post_title, "Rust news");
    assert_eq!(c2.username.as_deref(), Some("bob"));
    assert_eq!(c2.score, Some(3.0));
    assert_eq!(c2.stickied, Some(false));
}

/// A missing required column is fatal and can be matched as a `SchemaError`.
#[test]
fn missing_column_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.csv");
    write_csv(&path, &["username", "link_karma", "comment_karma", "is_verified"], &[vec!["a", "1", "2", "True"]]);

    let err = read_users(&path).unwrap_err();
    match err.downcast_ref::<SchemaError>() {
        Some(SchemaError::MissingColumn { table, column, .. }) => {
            assert_eq!(*table, "users");
            assert_eq!(column, "account_age");
        }
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

/// An unparseable numeric field names the row and column.
#[test]
fn bad_number_is_a_schema_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posts.csv");
    write_csv(&path, POST_HEADER, &[vec!["a", "r", "t", "x", "lots", "0.5", "1"]]);

    let err = read_posts(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::BadValue { row: 1, expected: "number", .. })
    ));
}

/// `.zst` inputs are decoded transparently.
#[test]
fn reads_zstd_compressed_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comments.csv.zst");
    write_csv_zst(&path, COMMENT_HEADER, &basic_comments());

    let comments = read_comments(&path).unwrap();
    assert_eq!(comments.len(), 11);
    assert_eq!(comments[0].body, "I love writing Rust code every day!");
}

/// Raw dumps are found by prefix, sorted, and concatenated with a header union.
#[test]
fn merges_raw_dumps_with_header_union() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let r = raw.path();

    write_csv(&r.join("user_data_b.csv"), USER_HEADER, &[vec!["bea", "1", "2", "3", "False"]]);
    write_csv(
        &r.join("user_data_a.csv"),
        &["username", "link_karma", "comment_karma", "account_age", "is_verified", "created"],
        &[vec!["ann", "4", "5", "6", "True", "2020"]],
    );
    write_csv(&r.join("all_comments_rust.csv"), COMMENT_HEADER, &basic_comments()[..3]);
    write_csv_zst(&r.join("all_comments_go.csv.zst"), COMMENT_HEADER, &basic_comments()[3..5]);
    write_csv(&r.join("all_posts_rust.csv"), POST_HEADER, &basic_posts());
    fs::write(r.join("notes.txt"), "not a dump").unwrap();

    let found = discover_dumps(r, "user_data");
    let names: Vec<String> = found.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
    assert_eq!(names, vec!["user_data_a.csv", "user_data_b.csv"]);

    let merged = merge_raw_dumps(r, out.path()).unwrap();
    assert_eq!(merged.users, out.path().join(USERS_FILE));

    let lines = read_lines(&merged.users);
    assert_eq!(lines[0], "username,link_karma,comment_karma,account_age,is_verified,created");
    assert_eq!(lines[1], "ann,4,5,6,True,2020");
    assert_eq!(lines[2], "bea,1,2,3,False,");

    let users = read_users(&merged.users).unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(read_comments(&out.path().join(COMMENTS_FILE)).unwrap().len(), 5);
    assert_eq!(read_posts(&out.path().join(POSTS_FILE)).unwrap().len(), 3);
}

/// Merging with no dumps of a kind is refused.
#[test]
fn merge_without_dumps_fails() {
    let raw = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_csv(&raw.path().join("user_data_x.csv"), USER_HEADER, &[]);

    let err = merge_raw_dumps(raw.path(), out.path()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SchemaError>(),
        Some(SchemaError::NoDumps { prefix: "all_comments", .. })
    ));
}

/// With engagement features on, `num_replies` and `stickied` are required columns.
#[test]
fn engagement_columns_required_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path();
    write_csv(
        &base.join(COMMENTS_FILE),
        NO_ENGAGEMENT_HEADER,
        &[vec!["c1", "t3_p1", "Rust news", "alice", "hello there", "5"]],
    );
    write_csv(&base.join(POSTS_FILE), POST_HEADER, &basic_posts());
    write_csv(&base.join(USERS_FILE), USER_HEADER, &basic_users());

    let plain = PipelineOptions::default().with_data_dir(base);
    assert_eq!(load_tables(&plain).unwrap().comments.len(), 1);

    let err = load_tables(&plain.with_engagement_features(true)).unwrap_err();
    match err.downcast_ref::<SchemaError>() {
        Some(SchemaError::MissingColumn { table, column, .. }) => {
            assert_eq!(*table, "comments");
            assert_eq!(column, "num_replies");
        }
        other => panic!("expected MissingColumn, got {other:?}"),
    }
}

/// Only a truly empty body drops a comment; whitespace is content.
#[test]
fn whitespace_body_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("comments.csv");
    write_csv(
        &path,
        COMMENT_HEADER,
        &[
            comment("c1", "t3_p1", "Rust news", "alice", "   ", "1"),
            comment("c2", "t3_p1", "Rust news", "bob", "", "1"),
        ],
    );

    let comments = read_comments(&path).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, "c1");
    assert_eq!(comments[0].body, "   ");
}
