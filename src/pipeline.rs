use crate::config::PipelineOptions;
use crate::features::{build_feature_table, FeatureTable};
use crate::labels::label_users;
use crate::load::{load_tables, merge_raw_dumps, MergedPaths};
use crate::output::{write_features, write_labels};
use crate::prepare::{prepare_files, ModelMatrix};
use crate::schema::{LabelRow, Tables};
use crate::util::{init_thread_pool, init_tracing_once};
use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Clone, Default)]
pub struct BotLabelPipeline {
    pub(crate) opts: PipelineOptions,
}

/// What a full run read and wrote.
#[derive(Clone, Debug, Serialize)]
pub struct RunSummary {
    pub users: usize,
    pub comments: usize,
    pub posts: usize,
    pub bots: usize,
    pub feature_columns: Vec<String>,
    pub features_path: PathBuf,
    pub labels_path: PathBuf,
    pub elapsed_secs: f64,
}

impl BotLabelPipeline {
    pub fn new() -> Self {
        Self { opts: PipelineOptions::default() }
    }

    pub fn from_options(opts: PipelineOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self { self.opts = self.opts.with_data_dir(dir); self }
    pub fn comments_path(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_comments_path(p); self }
    pub fn posts_path(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_posts_path(p); self }
    pub fn users_path(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_users_path(p); self }
    pub fn features_out(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_features_out(p); self }
    pub fn labels_out(mut self, p: impl AsRef<Path>) -> Self { self.opts = self.opts.with_labels_out(p); self }
    pub fn sample(mut self, size: usize, seed: u64) -> Self { self.opts = self.opts.with_sample(size, seed); self }
    pub fn ngram_n(mut self, n: usize) -> Self { self.opts = self.opts.with_ngram_n(n); self }
    pub fn max_chain_hops(mut self, hops: usize) -> Self { self.opts = self.opts.with_max_chain_hops(hops); self }
    pub fn engagement_features(mut self, yes: bool) -> Self { self.opts = self.opts.with_engagement_features(yes); self }
    pub fn parallelism(mut self, threads: usize) -> Self { self.opts = self.opts.with_parallelism(threads); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }

    // -------- Operations --------

    fn init(&self) {
        init_tracing_once();
        init_thread_pool(self.opts.parallelism);
    }

    /// Load the three input tables named by the options.
    pub fn load(&self) -> Result<Tables> {
        self.init();
        load_tables(&self.opts)
    }

    /// Feature table for already-loaded tables.
    pub fn build_features(&self, tables: &Tables) -> Result<FeatureTable> {
        self.init();
        build_feature_table(tables, &self.opts)
    }

    /// Bot labels for already-loaded tables.
    pub fn label(&self, tables: &Tables) -> Vec<LabelRow> {
        self.init();
        label_users(tables)
    }

    /// Load, build features, label, and save both tables.
    pub fn run(self) -> Result<RunSummary> {
        let started = Instant::now();
        let tables = self.load()?;

        let features = self.build_features(&tables)?;
        write_features(&features, &self.opts.features_out)?;

        let labels = self.label(&tables);
        write_labels(&labels, &self.opts.labels_out)?;

        let summary = RunSummary {
            users: tables.users.len(),
            comments: tables.comments.len(),
            posts: tables.posts.len(),
            bots: labels.iter().filter(|l| l.is_bot).count(),
            feature_columns: features.columns().iter().map(|c| c.name.clone()).collect(),
            features_path: self.opts.features_out.clone(),
            labels_path: self.opts.labels_out.clone(),
            elapsed_secs: started.elapsed().as_secs_f64(),
        };
        tracing::info!(
            users = summary.users,
            bots = summary.bots,
            "run finished in {:.1}s",
            summary.elapsed_secs
        );
        Ok(summary)
    }
}

/// Merge raw per-subreddit dumps into the three tables the pipeline reads.
pub fn merge_dumps(raw_dir: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Result<MergedPaths> {
    init_tracing_once();
    merge_raw_dumps(raw_dir.as_ref(), out_dir.as_ref())
}

/// Turn saved feature and label tables into a model matrix at `out`.
pub fn prepare_model_matrix(
    features: impl AsRef<Path>,
    labels: impl AsRef<Path>,
    out: impl AsRef<Path>,
) -> Result<ModelMatrix> {
    init_tracing_once();
    prepare_files(features.as_ref(), labels.as_ref(), out.as_ref())
}
