#![allow(dead_code)]

use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

pub const COMMENT_HEADER: &[&str] = &[
    "id", "parent_id", "post_title", "username", "subreddit", "body", "score", "num_replies", "is_submitter",
    "stickied", "date",
];
pub const POST_HEADER: &[&str] = &["username", "subreddit", "title", "text", "score", "upvote_ratio", "num_comments"];
pub const USER_HEADER: &[&str] = &["username", "link_karma", "comment_karma", "account_age", "is_verified"];

/// Write a plain CSV table.
pub fn write_csv(path: &Path, header: &[&str], rows: &[Vec<&str>]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut w = csv::Writer::from_path(path).unwrap();
    w.write_record(header).unwrap();
    for r in rows {
        w.write_record(r).unwrap();
    }
    w.flush().unwrap();
}

/// Write a zstd-compressed CSV table (`*.csv.zst`).
pub fn write_csv_zst(path: &Path, header: &[&str], rows: &[Vec<&str>]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let f = File::create(path).unwrap();
    let enc = zstd::stream::write::Encoder::new(f, 3).unwrap().auto_finish();
    let mut w = csv::Writer::from_writer(enc);
    w.write_record(header).unwrap();
    for r in rows {
        w.write_record(r).unwrap();
    }
    w.flush().unwrap();
}

/// Read a text file line-by-line (skips empty lines).
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    BufReader::new(f).lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// One comment row in `COMMENT_HEADER` order.
pub fn comment<'a>(id: &'a str, parent: &'a str, thread: &'a str, user: &'a str, body: &'a str, score: &'a str) -> Vec<&'a str> {
    vec![id, parent, thread, user, "rust", body, score, "0", "False", "False", "2024-01-01"]
}

pub fn basic_comments() -> Vec<Vec<&'static str>> {
    vec![
        // "Rust news": a reply chain p1 <- c1 <- c2 <- c3 <- c4
        comment("c1", "t3_p1", "Rust news", "alice", "I love writing Rust code every day!", "5"),
        comment("c2", "t1_c1", "Rust news", "bob", "Rust code is great for systems work.", "3"),
        comment("c3", "t1_c2", "Rust news", "alice", "Systems work in Rust is fun, honestly.", "4"),
        comment("c4", "t1_c3", "Rust news", "carol", "Indeed, fun stuff.", "1"),
        comment("c9", "t3_p1", "Rust news", "AutoModBot", "Please read the rules before posting.", "1"),
        // "Weekend"
        comment("c5", "t3_p2", "Weekend", "bob", "Going hiking this weekend with friends", "2"),
        comment("c5", "t3_p2", "Weekend", "bob", "Going hiking this weekend with friends", "2"),
        comment("c6", "t3_p2", "Weekend", "emojifan", "😀😀", "1"),
        comment("c7", "t1_c6", "Weekend", "emojifan", "🎉", "1"),
        comment("c10", "t3_p2", "Weekend", "alice", "", "1"),
        // "Deals": same text twice
        comment("c11", "t3_p3", "Deals", "echo", "buy cheap tokens now", "0"),
        comment("c12", "t3_p3", "Deals", "echo", "buy cheap tokens now", "0"),
        // "Links": one comment full of slashes
        comment("c13", "t3_p4", "Links", "spammer", "see /r/a/b/c/d/e/f/g/h/i/j/k/l", "1"),
    ]
}

pub fn basic_posts() -> Vec<Vec<&'static str>> {
    vec![
        vec!["bob", "rust", "Rust news", "what is new", "10", "0.9", "5"],
        vec!["bob", "rust", "Weekend", "", "4", "0.8", "3"],
        vec!["bob", "rust", "Weekend", "", "4", "0.8", "3"],
        vec!["dave", "rust", "Deals", "cheap stuff", "2", "0.7", "2"],
    ]
}

pub fn basic_users() -> Vec<Vec<&'static str>> {
    vec![
        vec!["alice", "100", "500", "1000", "True"],
        vec!["bob", "50", "400", "700", "False"],
        vec!["carol", "10", "200", "300", "True"],
        vec!["dave", "10", "0", "365", "False"],
        vec!["emojifan", "5", "50", "200", "False"],
        vec!["echo", "5", "50", "200", "False"],
        vec!["spammer", "5", "50", "200", ""],
        vec!["AutoModBot", "1", "1", "3000", "True"],
        vec!["player99999999", "1", "20", "90", "False"],
        vec!["alice", "999", "999", "1", "False"],
    ]
}

/// Build a tiny corpus in a temp dir holding the three merged tables:
/// - a reply chain c1 <- c2 <- c3 <- c4 under post p1 ("Rust news");
/// - alice, bob and carol writing ordinary text; dave posting but never commenting;
/// - emojifan commenting only emoji; echo repeating one comment; spammer full of slashes;
/// - AutoModBot and player99999999 for the username rules;
/// - one comment without a body, one duplicated comment row, one duplicated post row,
///   and a second `alice` user row that must be ignored.
pub fn make_corpus_basic() -> PathBuf {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.into_path();
    write_csv(&base.join(botlabel::COMMENTS_FILE), COMMENT_HEADER, &basic_comments());
    write_csv(&base.join(botlabel::POSTS_FILE), POST_HEADER, &basic_posts());
    write_csv(&base.join(botlabel::USERS_FILE), USER_HEADER, &basic_users());
    base
}

/// Distinct usernames of the basic corpus's users table.
pub fn basic_usernames() -> Vec<&'static str> {
    vec!["alice", "bob", "carol", "dave", "emojifan", "echo", "spammer", "AutoModBot", "player99999999"]
}
