//! Table ingestion: CSV (optionally zstd-compressed) into typed rows.
//!
//! Rules applied here, never at feature time:
//! - comments without a `body` are dropped;
//! - exact-duplicate comment and post rows are dropped;
//! - users are deduplicated by `username`, keeping the first occurrence.
//!
//! A missing required column is fatal and surfaces as [`SchemaError`].

use crate::config::{PipelineOptions, COMMENTS_FILE, POSTS_FILE, USERS_FILE};
use crate::error::SchemaError;
use crate::schema::{Comment, Post, Tables, User, COMMENT_COLUMNS, ENGAGEMENT_COLUMNS, POST_COLUMNS, USER_COLUMNS};
use crate::util::{open_with_backoff, replace_file_with_backoff};
use ahash::{AHashMap, AHashSet};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Open a table for reading; `.zst` files are decoded on the fly.
pub fn open_table(path: &Path) -> Result<Box<dyn Read>> {
    let f = open_with_backoff(path, 16, 50).with_context(|| format!("open {}", path.display()))?;
    let is_zst = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("zst"))
        .unwrap_or(false);
    if is_zst {
        let dec = zstd::stream::read::Decoder::new(f).with_context(|| format!("zstd header {}", path.display()))?;
        Ok(Box::new(dec))
    } else {
        Ok(Box::new(BufReader::with_capacity(256 * 1024, f)))
    }
}

fn csv_reader(path: &Path) -> Result<csv::Reader<Box<dyn Read>>> {
    Ok(ReaderBuilder::new().flexible(true).from_reader(open_table(path)?))
}

/// Header lookup for one table, validated against its required columns.
pub(crate) struct Columns {
    table: &'static str,
    index: AHashMap<String, usize>,
}

impl Columns {
    pub(crate) fn from_headers(
        table: &'static str,
        path: &Path,
        headers: &StringRecord,
        required: &[&str],
    ) -> Result<Self> {
        if headers.is_empty() {
            return Err(SchemaError::NoHeader { table, path: path.to_path_buf() }.into());
        }
        let mut index = AHashMap::with_capacity(headers.len());
        for (i, h) in headers.iter().enumerate() {
            index.entry(h.trim().to_string()).or_insert(i);
        }
        for col in required {
            if !index.contains_key(*col) {
                return Err(SchemaError::MissingColumn {
                    table,
                    path: path.to_path_buf(),
                    column: (*col).to_string(),
                }
                .into());
            }
        }
        Ok(Self { table, index })
    }

    /// Raw field; empty and whitespace-only fields read as missing.
    #[inline]
    pub(crate) fn get<'r>(&self, rec: &'r StringRecord, col: &str) -> Option<&'r str> {
        self.raw(rec, col).filter(|s| !s.trim().is_empty())
    }

    /// Raw field; only a truly empty field reads as missing.
    #[inline]
    pub(crate) fn raw<'r>(&self, rec: &'r StringRecord, col: &str) -> Option<&'r str> {
        let i = *self.index.get(col)?;
        rec.get(i).filter(|s| !s.is_empty())
    }

    pub(crate) fn text(&self, rec: &StringRecord, col: &str) -> Option<String> {
        self.get(rec, col).map(str::to_string)
    }

    pub(crate) fn num(&self, rec: &StringRecord, col: &str, row: u64) -> Result<Option<f64>> {
        match self.get(rec, col) {
            None => Ok(None),
            Some(raw) => parse_num(raw.trim())
                .map(|v| if v.is_nan() { None } else { Some(v) })
                .ok_or_else(|| self.bad_value(row, col, raw, "number")),
        }
    }

    pub(crate) fn flag(&self, rec: &StringRecord, col: &str, row: u64) -> Result<Option<bool>> {
        match self.get(rec, col) {
            None => Ok(None),
            Some(raw) => parse_flag(raw.trim())
                .map(Some)
                .ok_or_else(|| self.bad_value(row, col, raw, "boolean")),
        }
    }

    fn bad_value(&self, row: u64, col: &str, raw: &str, expected: &'static str) -> anyhow::Error {
        SchemaError::BadValue {
            table: self.table,
            row,
            column: col.to_string(),
            value: raw.to_string(),
            expected,
        }
        .into()
    }
}

fn parse_num(s: &str) -> Option<f64> {
    match s {
        "True" | "true" => Some(1.0),
        "False" | "false" => Some(0.0),
        _ => s.parse::<f64>().ok(),
    }
}

pub(crate) fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "True" | "true" | "TRUE" | "1" | "1.0" => Some(true),
        "False" | "false" | "FALSE" | "0" | "0.0" => Some(false),
        _ => None,
    }
}

#[inline]
fn row_key(rec: &StringRecord) -> String {
    let mut key = String::with_capacity(rec.as_slice().len() + rec.len());
    for field in rec.iter() {
        key.push_str(field);
        key.push('\u{1f}');
    }
    key
}

/// Read the comments table. Rows without a body, and exact duplicates, are dropped.
/// A whitespace-only body is kept.
pub fn read_comments(path: &Path) -> Result<Vec<Comment>> {
    read_comments_requiring(path, &[])
}

/// [`read_comments`], additionally requiring the `extra` columns in the header.
pub fn read_comments_requiring(path: &Path, extra: &[&str]) -> Result<Vec<Comment>> {
    let mut rdr = csv_reader(path)?;
    let required: Vec<&str> = COMMENT_COLUMNS.iter().chain(extra).copied().collect();
    let cols = Columns::from_headers("comments", path, rdr.headers()?, &required)?;

    let mut seen = AHashSet::<String>::new();
    let mut out = Vec::new();
    let (mut no_body, mut dupes) = (0u64, 0u64);
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("read {}", path.display()))?;
        let row = row as u64 + 1;
        let Some(body) = cols.raw(&rec, "body") else {
            no_body += 1;
            continue;
        };
        if !seen.insert(row_key(&rec)) {
            dupes += 1;
            continue;
        }
        out.push(Comment {
            id: cols.text(&rec, "id").unwrap_or_default(),
            parent_id: cols.text(&rec, "parent_id").unwrap_or_default(),
            post_title: cols.text(&rec, "post_title").unwrap_or_default(),
            username: cols.text(&rec, "username"),
            subreddit: cols.text(&rec, "subreddit"),
            body: body.to_string(),
            score: cols.num(&rec, "score", row)?,
            num_replies: cols.num(&rec, "num_replies", row)?,
            is_submitter: cols.flag(&rec, "is_submitter", row)?,
            stickied: cols.flag(&rec, "stickied", row)?,
            date: cols.text(&rec, "date"),
        });
    }
    tracing::info!(kept = out.len(), no_body, dupes, "comments loaded from {}", path.display());
    Ok(out)
}

/// Read the posts table. Exact duplicates are dropped.
pub fn read_posts(path: &Path) -> Result<Vec<Post>> {
    let mut rdr = csv_reader(path)?;
    let cols = Columns::from_headers("posts", path, rdr.headers()?, POST_COLUMNS)?;

    let mut seen = AHashSet::<String>::new();
    let mut out = Vec::new();
    let mut dupes = 0u64;
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("read {}", path.display()))?;
        let row = row as u64 + 1;
        if !seen.insert(row_key(&rec)) {
            dupes += 1;
            continue;
        }
        out.push(Post {
            username: cols.text(&rec, "username"),
            subreddit: cols.text(&rec, "subreddit"),
            title: cols.text(&rec, "title"),
            text: cols.text(&rec, "text"),
            score: cols.num(&rec, "score", row)?,
            upvote_ratio: cols.num(&rec, "upvote_ratio", row)?,
            num_comments: cols.num(&rec, "num_comments", row)?,
        });
    }
    tracing::info!(kept = out.len(), dupes, "posts loaded from {}", path.display());
    Ok(out)
}

/// Read the users table, keeping the first row per username.
pub fn read_users(path: &Path) -> Result<Vec<User>> {
    let mut rdr = csv_reader(path)?;
    let cols = Columns::from_headers("users", path, rdr.headers()?, USER_COLUMNS)?;

    let mut seen = AHashSet::<String>::new();
    let mut out = Vec::new();
    let (mut dupes, mut anonymous) = (0u64, 0u64);
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("read {}", path.display()))?;
        let row = row as u64 + 1;
        let Some(username) = cols.text(&rec, "username") else {
            anonymous += 1;
            continue;
        };
        if !seen.insert(username.clone()) {
            dupes += 1;
            continue;
        }
        out.push(User {
            username,
            link_karma: cols.num(&rec, "link_karma", row)?,
            comment_karma: cols.num(&rec, "comment_karma", row)?,
            account_age: cols.num(&rec, "account_age", row)?,
            is_verified: cols.flag(&rec, "is_verified", row)?,
        });
    }
    if anonymous > 0 {
        tracing::warn!("dropped {} user rows without a username", anonymous);
    }
    tracing::info!(kept = out.len(), dupes, "users loaded from {}", path.display());
    Ok(out)
}

/// Load all three tables. The engagement columns become required when
/// `opts.engagement_features` is on.
pub fn load_tables(opts: &PipelineOptions) -> Result<Tables> {
    let extra: &[&str] = if opts.engagement_features { ENGAGEMENT_COLUMNS } else { &[] };
    Ok(Tables {
        posts: read_posts(&opts.posts_path)?,
        comments: read_comments_requiring(&opts.comments_path, extra)?,
        users: read_users(&opts.users_path)?,
    })
}

// ----------------------------- Raw dump merging ------------------------------------

/// Output paths of [`merge_raw_dumps`].
#[derive(Clone, Debug)]
pub struct MergedPaths {
    pub comments: PathBuf,
    pub posts: PathBuf,
    pub users: PathBuf,
}

const MERGED_NAMES: [&str; 3] = [COMMENTS_FILE, POSTS_FILE, USERS_FILE];

/// Per-subreddit dump files in `raw_dir` whose name starts with `prefix`
/// (`.csv` or `.csv.zst`), sorted by path. Previously merged outputs are skipped.
pub fn discover_dumps(raw_dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(raw_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.starts_with(prefix)
                && (name.ends_with(".csv") || name.ends_with(".csv.zst"))
                && !MERGED_NAMES.contains(&name.as_ref())
        })
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

/// Concatenate the raw dumps of each kind into the three merged tables under `out_dir`.
/// Headers are unioned in first-seen order; fields missing from a dump are left empty.
/// Deduplication is deferred to load time.
pub fn merge_raw_dumps(raw_dir: &Path, out_dir: &Path) -> Result<MergedPaths> {
    std::fs::create_dir_all(out_dir).with_context(|| format!("create {}", out_dir.display()))?;
    let merge = |prefix: &'static str, name: &str| -> Result<PathBuf> {
        let inputs = discover_dumps(raw_dir, prefix);
        if inputs.is_empty() {
            return Err(SchemaError::NoDumps { prefix, dir: raw_dir.to_path_buf() }.into());
        }
        let out = out_dir.join(name);
        let rows = concat_tables(&inputs, &out)?;
        tracing::info!("merged {} {} files into {} ({} rows)", inputs.len(), prefix, out.display(), rows);
        Ok(out)
    };
    Ok(MergedPaths {
        users: merge("user_data", USERS_FILE)?,
        comments: merge("all_comments", COMMENTS_FILE)?,
        posts: merge("all_posts", POSTS_FILE)?,
    })
}

fn concat_tables(inputs: &[PathBuf], out: &Path) -> Result<u64> {
    let mut union: Vec<String> = Vec::new();
    let mut union_idx: AHashMap<String, usize> = AHashMap::new();
    for p in inputs {
        let mut rdr = csv_reader(p)?;
        for h in rdr.headers()?.iter() {
            let h = h.trim();
            if !union_idx.contains_key(h) {
                union_idx.insert(h.to_string(), union.len());
                union.push(h.to_string());
            }
        }
    }

    let tmp = out.with_extension("csv.tmp");
    let mut w = WriterBuilder::new()
        .from_path(&tmp)
        .with_context(|| format!("create {}", tmp.display()))?;
    w.write_record(&union)?;

    let mut rows = 0u64;
    let mut line: Vec<String> = vec![String::new(); union.len()];
    for p in inputs {
        let mut rdr = csv_reader(p)?;
        // position in union -> position in this file
        let headers = rdr.headers()?.clone();
        let mut slot: Vec<Option<usize>> = vec![None; union.len()];
        for (i, h) in headers.iter().enumerate() {
            if let Some(&u) = union_idx.get(h.trim()) {
                slot[u].get_or_insert(i);
            }
        }
        for rec in rdr.records() {
            let rec = rec.with_context(|| format!("read {}", p.display()))?;
            for (u, cell) in line.iter_mut().enumerate() {
                cell.clear();
                if let Some(field) = slot[u].and_then(|i| rec.get(i)) {
                    cell.push_str(field);
                }
            }
            w.write_record(&line)?;
            rows += 1;
        }
    }
    w.flush()?;
    drop(w);
    replace_file_with_backoff(&tmp, out)?;
    Ok(rows)
}
