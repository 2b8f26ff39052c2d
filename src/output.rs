//! CSV writers and readers for the feature, label and model-matrix tables.
//!
//! Writes go to a `.tmp` sibling first and are moved into place afterwards, so a
//! reader never sees a half-written table. Nulls are encoded as empty fields.

use crate::error::SchemaError;
use crate::features::FeatureTable;
use crate::load::{open_table, parse_flag, Columns};
use crate::prepare::ModelMatrix;
use crate::schema::LabelRow;
use crate::util::replace_file_with_backoff;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use std::fs::File;
use std::path::{Path, PathBuf};

const USERNAME: &str = "username";
const IS_BOT: &str = "is_bot";

fn tmp_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    dest.with_file_name(name)
}

fn create_writer(tmp: &Path) -> Result<Writer<File>> {
    if let Some(parent) = tmp.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    WriterBuilder::new()
        .from_path(tmp)
        .with_context(|| format!("create {}", tmp.display()))
}

fn finish(mut w: Writer<File>, tmp: &Path, dest: &Path) -> Result<()> {
    w.flush().with_context(|| format!("flush {}", tmp.display()))?;
    drop(w);
    replace_file_with_backoff(tmp, dest)
}

#[inline]
fn encode(v: Option<f64>) -> String {
    v.map(|x| x.to_string()).unwrap_or_default()
}

/// Write `username` followed by every feature column, one row per user.
pub fn write_features(table: &FeatureTable, path: &Path) -> Result<()> {
    let tmp = tmp_path(path);
    let mut w = create_writer(&tmp)?;

    let mut header = vec![USERNAME.to_string()];
    header.extend(table.columns().iter().map(|c| c.name.clone()));
    w.write_record(&header)?;

    let mut line: Vec<String> = Vec::with_capacity(header.len());
    for (row, user) in table.usernames().iter().enumerate() {
        line.clear();
        line.push(user.clone());
        line.extend(table.columns().iter().map(|c| encode(c.values[row])));
        w.write_record(&line)?;
    }
    finish(w, &tmp, path)?;
    tracing::info!("wrote {} feature rows to {}", table.len(), path.display());
    Ok(())
}

/// Write the `username,is_bot` table.
pub fn write_labels(labels: &[LabelRow], path: &Path) -> Result<()> {
    let tmp = tmp_path(path);
    let mut w = create_writer(&tmp)?;
    for row in labels {
        w.serialize(row)?;
    }
    if labels.is_empty() {
        w.write_record([USERNAME, IS_BOT])?;
    }
    finish(w, &tmp, path)?;
    tracing::info!("wrote {} labels to {}", labels.len(), path.display());
    Ok(())
}

/// Write a prepared matrix: one header row of column names, then the values.
pub fn write_matrix(matrix: &ModelMatrix, path: &Path) -> Result<()> {
    let tmp = tmp_path(path);
    let mut w = create_writer(&tmp)?;
    w.write_record(matrix.column_names())?;
    for row in 0..matrix.n_rows {
        w.write_record(matrix.columns.iter().map(|c| encode(c.values[row])))?;
    }
    finish(w, &tmp, path)
}

/// Read a feature table written by [`write_features`] (or any CSV with a
/// `username` column followed by numeric columns).
pub fn read_feature_table(path: &Path) -> Result<FeatureTable> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(open_table(path)?);
    let headers = rdr.headers()?.clone();
    let cols = Columns::from_headers("features", path, &headers, &[USERNAME])?;
    let names: Vec<&str> = headers.iter().map(str::trim).filter(|h| *h != USERNAME).collect();

    let mut usernames = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); names.len()];
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("read {}", path.display()))?;
        let row = row as u64 + 1;
        let Some(user) = cols.text(&rec, USERNAME) else { continue };
        usernames.push(user);
        for (name, col) in names.iter().zip(values.iter_mut()) {
            col.push(cols.num(&rec, name, row)?);
        }
    }

    let mut table = FeatureTable::with_usernames(usernames);
    for (name, col) in names.into_iter().zip(values) {
        table.push_column(name, col);
    }
    Ok(table)
}

/// Read a label table. `is_bot` accepts `true`/`false`, `True`/`False` and `1`/`0`.
pub fn read_labels(path: &Path) -> Result<Vec<LabelRow>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(open_table(path)?);
    let cols = Columns::from_headers("labels", path, rdr.headers()?, &[USERNAME, IS_BOT])?;
    let mut out = Vec::new();
    for (row, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("read {}", path.display()))?;
        let Some(username) = cols.text(&rec, USERNAME) else { continue };
        let raw = cols.get(&rec, IS_BOT).unwrap_or_default();
        let is_bot = parse_flag(raw.trim()).ok_or_else(|| SchemaError::BadValue {
            table: "labels",
            row: row as u64 + 1,
            column: IS_BOT.to_string(),
            value: raw.to_string(),
            expected: "boolean",
        })?;
        out.push(LabelRow { username, is_bot });
    }
    Ok(out)
}
