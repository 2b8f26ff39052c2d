//! Model-matrix preparation: turn the feature and label tables into a fully
//! numeric matrix ready for a classifier.
//!
//! Steps, in order:
//! 1. join labels onto features by username, then drop `username`;
//! 2. fill nulls of [`FILL_CONSTANTS`] columns with their constant;
//! 3. [`FILL_THEN_STANDARDIZE`] columns: nulls -> 0, then z-score;
//! 4. [`STANDARDIZE_THEN_FILL`] columns: z-score over present values, then nulls -> 1;
//! 5. column order: step-3 columns, step-4 columns, everything else as it came;
//! 6. `is_bot` as 0/1 (it is the last remainder column).

use crate::error::SchemaError;
use crate::features::{
    Column, FeatureTable, ALL_USERS_SIMILARITY, AVG_COMMENT_LENGTH, AVG_COSINE_SIMILARITY,
    AVG_FLESCH_KINCAID_GRADE, AVG_THREAD_DEPTH, AVG_TTR, COMMENT_POST_RATIO, MAX_COMMENT_LENGTH,
    MIN_COMMENT_LENGTH, NGRAM_OVERLAP,
};
use crate::output::{read_feature_table, read_labels, write_matrix};
use crate::schema::LabelRow;
use ahash::AHashMap;
use anyhow::Result;
use std::path::Path;

pub const IS_BOT: &str = "is_bot";

pub const FILL_CONSTANTS: [(&str, f64); 6] = [
    (AVG_COSINE_SIMILARITY, 0.0),
    (ALL_USERS_SIMILARITY, 0.0),
    (COMMENT_POST_RATIO, 1.0),
    (AVG_THREAD_DEPTH, 0.0),
    (AVG_TTR, 0.0),
    (NGRAM_OVERLAP, 0.0),
];

pub const FILL_THEN_STANDARDIZE: [&str; 4] =
    [AVG_COMMENT_LENGTH, MAX_COMMENT_LENGTH, MIN_COMMENT_LENGTH, AVG_FLESCH_KINCAID_GRADE];

pub const STANDARDIZE_THEN_FILL: [&str; 4] = ["link_karma", "comment_karma", "account_age", "is_verified"];
const STANDARDIZED_FILL: f64 = 1.0;

/// Numeric matrix in column-major form. Remainder columns may still carry nulls.
#[derive(Clone, Debug, Default)]
pub struct ModelMatrix {
    pub columns: Vec<Column>,
    pub n_rows: usize,
}

impl ModelMatrix {
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.values.as_slice())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Z-score in place over the present values (population standard deviation).
/// Nulls stay null. A constant column is only centred.
pub fn standardize(values: &mut [Option<f64>]) {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return;
    }
    let n = present.len() as f64;
    let mean = present.iter().sum::<f64>() / n;
    let var = present.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = var.sqrt();
    let scale = if std > 0.0 { std } else { 1.0 };
    for v in values.iter_mut().flatten() {
        *v = (*v - mean) / scale;
    }
}

fn fill(values: &mut [Option<f64>], with: f64) {
    for v in values.iter_mut() {
        v.get_or_insert(with);
    }
}

/// Build the model matrix from a feature table and its labels.
/// Users without a label are left out.
pub fn prepare(features: &FeatureTable, labels: &[LabelRow]) -> Result<ModelMatrix> {
    let label_of: AHashMap<&str, bool> = labels.iter().map(|l| (l.username.as_str(), l.is_bot)).collect();
    let rows: Vec<usize> = features
        .usernames()
        .iter()
        .enumerate()
        .filter(|(_, u)| label_of.contains_key(u.as_str()))
        .map(|(i, _)| i)
        .collect();
    let unlabeled = features.len() - rows.len();
    if unlabeled > 0 {
        tracing::warn!("{} feature rows have no label and are left out", unlabeled);
    }

    let mut columns: Vec<Column> = features
        .columns()
        .iter()
        .map(|c| Column { name: c.name.clone(), values: rows.iter().map(|&r| c.values[r]).collect() })
        .collect();
    let is_bot = rows
        .iter()
        .map(|&r| {
            let bot = label_of.get(features.usernames()[r].as_str()).copied().unwrap_or(false);
            Some(if bot { 1.0 } else { 0.0 })
        })
        .collect();
    columns.push(Column { name: IS_BOT.to_string(), values: is_bot });

    let take = |columns: &mut Vec<Column>, name: &str| -> Result<Column> {
        let pos = columns.iter().position(|c| c.name == name).ok_or_else(|| SchemaError::MissingFrameColumn {
            table: "features",
            column: name.to_string(),
        })?;
        Ok(columns.remove(pos))
    };

    for (name, value) in FILL_CONSTANTS {
        let pos = columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| SchemaError::MissingFrameColumn { table: "features", column: name.to_string() })?;
        fill(&mut columns[pos].values, value);
    }

    let mut ordered = Vec::with_capacity(columns.len());
    for name in FILL_THEN_STANDARDIZE {
        let mut col = take(&mut columns, name)?;
        fill(&mut col.values, 0.0);
        standardize(&mut col.values);
        ordered.push(col);
    }
    for name in STANDARDIZE_THEN_FILL {
        let mut col = take(&mut columns, name)?;
        standardize(&mut col.values);
        fill(&mut col.values, STANDARDIZED_FILL);
        ordered.push(col);
    }
    ordered.extend(columns);

    Ok(ModelMatrix { columns: ordered, n_rows: rows.len() })
}

/// Read both tables from disk, prepare, and write the matrix to `out`.
pub fn prepare_files(features: &Path, labels: &Path, out: &Path) -> Result<ModelMatrix> {
    let table = read_feature_table(features)?;
    let labels = read_labels(labels)?;
    let matrix = prepare(&table, &labels)?;
    write_matrix(&matrix, out)?;
    tracing::info!(rows = matrix.n_rows, columns = matrix.columns.len(), "model matrix written to {}", out.display());
    Ok(matrix)
}
