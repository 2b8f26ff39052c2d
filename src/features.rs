//! Per-user feature extraction.
//!
//! Each [`Feature`] computes one or more columns keyed by username. Columns are
//! merged left onto a table seeded from the users table, so every user keeps a
//! row and users a feature has nothing to say about get nulls. Steps are
//! independent of one another; the shared [`FeatureContext`] cleans the text and
//! fits the corpus-wide TF-IDF vectors once, before any step runs.

use crate::config::PipelineOptions;
use crate::progress::StepProgress;
use crate::schema::{Comment, Post, Tables, User};
use crate::text::{clean, flesch_kincaid_grade, is_degenerate, ngrams, type_token_ratio};
use crate::tfidf::{mean_pairwise_cosine, PopulationSample, SparseVec, TfidfModel};
use crate::threads::{group_by_thread, ThreadIndex};
use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use rayon::prelude::*;
use std::collections::BTreeMap;

pub const AVG_COSINE_SIMILARITY: &str = "avg_cosine_similarity";
pub const ALL_USERS_SIMILARITY: &str = "all_users_similarity";
pub const AVG_COMMENT_LENGTH: &str = "avg_comment_length";
pub const MAX_COMMENT_LENGTH: &str = "max_comment_length";
pub const MIN_COMMENT_LENGTH: &str = "min_comment_length";
pub const COMMENT_POST_RATIO: &str = "comment_post_ratio";
pub const AVG_THREAD_DEPTH: &str = "avg_thread_depth";
pub const PARENT_CHILD_SIMILARITY: &str = "parent_child_similarity";
pub const AVG_TTR: &str = "avg_ttr";
pub const AVG_FLESCH_KINCAID_GRADE: &str = "avg_flesch_kincaid_grade";
pub const NGRAM_OVERLAP: &str = "ngram_overlap";
pub const AVG_SCORE: &str = "avg_score";
pub const AVG_NUM_REPLIES: &str = "avg_num_replies";
pub const AVG_STICKIED: &str = "avg_stickied";

/// Profile columns copied from the users table, in output order.
pub const PROFILE_COLUMNS: [&str; 4] = ["link_karma", "comment_karma", "account_age", "is_verified"];

pub type UserValues = BTreeMap<String, f64>;

// ----------------------------- Feature table ------------------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// One row per username, in users-table order, plus named nullable numeric columns.
#[derive(Clone, Debug, Default)]
pub struct FeatureTable {
    usernames: Vec<String>,
    index: AHashMap<String, usize>,
    columns: Vec<Column>,
}

impl FeatureTable {
    /// Seed the table with one row per user and the profile columns.
    /// `is_verified` is encoded as 1/0.
    pub fn from_users(users: &[User]) -> Self {
        let usernames: Vec<String> = users.iter().map(|u| u.username.clone()).collect();
        let mut table = Self::with_usernames(usernames);
        let flag = |b: Option<bool>| b.map(|b| if b { 1.0 } else { 0.0 });
        table.push_column("link_karma", users.iter().map(|u| u.link_karma).collect());
        table.push_column("comment_karma", users.iter().map(|u| u.comment_karma).collect());
        table.push_column("account_age", users.iter().map(|u| u.account_age).collect());
        table.push_column("is_verified", users.iter().map(|u| flag(u.is_verified)).collect());
        table
    }

    /// Empty table over `usernames`; later duplicates of a name are ignored by lookups.
    pub fn with_usernames(usernames: Vec<String>) -> Self {
        let mut index = AHashMap::with_capacity(usernames.len());
        for (i, u) in usernames.iter().enumerate() {
            index.entry(u.clone()).or_insert(i);
        }
        Self { usernames, index, columns: Vec::new() }
    }

    /// Append (or replace) a column given one value per row.
    pub fn push_column(&mut self, name: &str, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.usernames.len());
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(col) => col.values = values,
            None => self.columns.push(Column { name: name.to_string(), values }),
        }
    }

    /// Left join: every row keeps its place, usernames missing from `values` get null,
    /// and keys that are not rows of this table are ignored.
    pub fn merge_left(&mut self, name: &str, values: &UserValues) {
        let col = self.usernames.iter().map(|u| values.get(u).copied()).collect();
        self.push_column(name, col);
    }

    pub fn usernames(&self) -> &[String] {
        &self.usernames
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.values.as_slice())
    }

    /// Value of `column` for `username`; `None` for a null or an unknown row/column.
    pub fn get(&self, username: &str, column: &str) -> Option<f64> {
        let row = *self.index.get(username)?;
        self.column(column)?.get(row).copied().flatten()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.index.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.usernames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.usernames.is_empty()
    }
}

// ----------------------------- Shared context ------------------------------------

/// Inputs every feature reads: the raw tables, cleaned comment text, the
/// corpus-wide TF-IDF vectors and comment indices grouped by author.
pub struct FeatureContext<'a> {
    pub comments: &'a [Comment],
    pub posts: &'a [Post],
    pub users: &'a [User],
    pub cleaned: Vec<String>,
    pub vectors: Vec<SparseVec>,
    pub by_user: BTreeMap<&'a str, Vec<usize>>,
    pub opts: &'a PipelineOptions,
}

impl<'a> FeatureContext<'a> {
    /// Clean every comment and fit the corpus-wide vectorizer once.
    pub fn new(tables: &'a Tables, opts: &'a PipelineOptions) -> Self {
        let cleaned: Vec<String> = tables.comments.par_iter().map(|c| clean(&c.body)).collect();
        let (model, vectors) = TfidfModel::fit_transform(&cleaned);
        tracing::info!(
            comments = cleaned.len(),
            vocabulary = model.vocabulary_len(),
            "fitted corpus TF-IDF vectors"
        );

        let mut by_user: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (i, c) in tables.comments.iter().enumerate() {
            if let Some(u) = c.username.as_deref() {
                by_user.entry(u).or_default().push(i);
            }
        }

        Self {
            comments: &tables.comments,
            posts: &tables.posts,
            users: &tables.users,
            cleaned,
            vectors,
            by_user,
            opts,
        }
    }

    pub fn texts(&self, idx: &[usize]) -> Vec<&str> {
        idx.iter().map(|&i| self.cleaned[i].as_str()).collect()
    }

    /// Run `f` over every commenting user in parallel; users for which it returns
    /// `None` are left out. Output is ordered by username.
    pub fn per_user<T, F>(&self, label: &str, f: F) -> Vec<(String, T)>
    where
        T: Send,
        F: Fn(&[usize]) -> Option<T> + Sync,
    {
        let groups: Vec<(&&str, &Vec<usize>)> = self.by_user.iter().collect();
        let pb = StepProgress::new(self.opts.progress, groups.len(), label);
        let out: Vec<(String, T)> = groups
            .par_iter()
            .filter_map(|(user, idx)| {
                let v = f(idx.as_slice());
                pb.inc(1);
                v.map(|v| ((**user).to_string(), v))
            })
            .collect();
        pb.finish();
        out
    }

    /// Per-user mean of a per-comment measure.
    pub fn per_user_mean(&self, label: &str, per_comment: &[f64]) -> UserValues {
        self.per_user(label, |idx| mean(idx.iter().map(|&i| per_comment[i])))
            .into_iter()
            .collect()
    }
}

pub fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (mut sum, mut n) = (0.0, 0usize);
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 { None } else { Some(sum / n as f64) }
}

// ----------------------------- Features ------------------------------------

/// One feature step producing named per-user columns.
pub trait Feature: Send + Sync {
    fn name(&self) -> &'static str;
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>>;
}

/// Mean pairwise cosine similarity across a user's own comments, with a
/// vocabulary fitted on that user's comments alone.
/// One comment: null. A degenerate group of several comments: 1.0.
pub struct AvgCosineSimilarity;

impl Feature for AvgCosineSimilarity {
    fn name(&self) -> &'static str {
        AVG_COSINE_SIMILARITY
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let vals = ctx.per_user("Cosine similarity of own comments", |idx| {
            let texts = ctx.texts(idx);
            if texts.len() < 2 {
                return None;
            }
            if is_degenerate(&texts) {
                return Some(1.0);
            }
            let (_, vecs) = TfidfModel::fit_transform(&texts);
            mean_pairwise_cosine(&vecs)
        });
        Ok(vec![(AVG_COSINE_SIMILARITY, vals.into_iter().collect())])
    }
}

/// Mean similarity of a user's comments against a seeded random sample of all comments.
pub struct AllUsersSimilarity;

impl Feature for AllUsersSimilarity {
    fn name(&self) -> &'static str {
        ALL_USERS_SIMILARITY
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let Some(sample) = PopulationSample::draw(&ctx.cleaned, ctx.opts.sample_size, ctx.opts.sample_seed) else {
            tracing::warn!("no comments to sample; {} left null", ALL_USERS_SIMILARITY);
            return Ok(vec![(ALL_USERS_SIMILARITY, UserValues::new())]);
        };
        if sample.size() < ctx.opts.sample_size {
            tracing::warn!(
                "population sample holds {} comments (fewer than the requested {})",
                sample.size(),
                ctx.opts.sample_size
            );
        }
        let vals = ctx.per_user("Similarity against population sample", |idx| {
            sample.mean_similarity(&ctx.texts(idx))
        });
        Ok(vec![(ALL_USERS_SIMILARITY, vals.into_iter().collect())])
    }
}

/// Average, maximum and minimum character length of cleaned comments.
pub struct CommentLength;

impl Feature for CommentLength {
    fn name(&self) -> &'static str {
        "comment_length"
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let stats = ctx.per_user("Comment lengths", |idx| {
            let lens: Vec<usize> = idx.iter().map(|&i| ctx.cleaned[i].chars().count()).collect();
            let max = *lens.iter().max()?;
            let min = *lens.iter().min()?;
            let avg = lens.iter().sum::<usize>() as f64 / lens.len() as f64;
            Some((avg, max as f64, min as f64))
        });
        let (mut avg, mut max, mut min) = (UserValues::new(), UserValues::new(), UserValues::new());
        for (user, (a, hi, lo)) in stats {
            avg.insert(user.clone(), a);
            max.insert(user.clone(), hi);
            min.insert(user, lo);
        }
        Ok(vec![(AVG_COMMENT_LENGTH, avg), (MAX_COMMENT_LENGTH, max), (MIN_COMMENT_LENGTH, min)])
    }
}

/// Comments per post. No comments: 0 (whatever the post count). Comments but no posts: 1.
pub struct CommentPostRatio;

impl Feature for CommentPostRatio {
    fn name(&self) -> &'static str {
        COMMENT_POST_RATIO
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let mut posts: AHashMap<&str, usize> = AHashMap::new();
        for p in ctx.posts {
            if let Some(u) = p.username.as_deref() {
                *posts.entry(u).or_insert(0) += 1;
            }
        }
        let vals = ctx
            .users
            .iter()
            .map(|u| {
                let c = ctx.by_user.get(u.username.as_str()).map_or(0, Vec::len);
                let p = posts.get(u.username.as_str()).copied().unwrap_or(0);
                let ratio = match (c, p) {
                    (0, _) => 0.0,
                    (_, 0) => 1.0,
                    (c, p) => c as f64 / p as f64,
                };
                (u.username.clone(), ratio)
            })
            .collect();
        Ok(vec![(COMMENT_POST_RATIO, vals)])
    }
}

/// Run `per_thread` over every thread in parallel and scatter its
/// `(comment index, value)` results into one value per comment.
fn per_comment_over_threads<F>(ctx: &FeatureContext<'_>, label: &str, per_thread: F) -> Vec<f64>
where
    F: Fn(&ThreadIndex<'_>, &[usize]) -> Vec<(usize, f64)> + Sync,
{
    let threads: Vec<(&str, Vec<usize>)> = group_by_thread(ctx.comments).into_iter().collect();
    let pb = StepProgress::new(ctx.opts.progress, threads.len(), label);
    let parts: Vec<Vec<(usize, f64)>> = threads
        .par_iter()
        .map(|(_, members)| {
            let index = ThreadIndex::for_members(ctx.comments, members, ctx.opts.max_chain_hops);
            let out = per_thread(&index, members);
            pb.inc(1);
            out
        })
        .collect();
    pb.finish();

    let mut values = vec![0.0; ctx.comments.len()];
    for (i, v) in parts.into_iter().flatten() {
        values[i] = v;
    }
    values
}

/// Mean reply depth of a user's comments (0 = direct reply to the post).
pub struct AvgThreadDepth;

impl Feature for AvgThreadDepth {
    fn name(&self) -> &'static str {
        AVG_THREAD_DEPTH
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let depths = per_comment_over_threads(ctx, "Thread depth", |index, members| {
            members
                .iter()
                .map(|&i| (i, index.depth(ctx.comments[i].id.as_str()) as f64))
                .collect()
        });
        Ok(vec![(AVG_THREAD_DEPTH, ctx.per_user_mean("Average thread depth", &depths))])
    }
}

/// Mean similarity between each comment and its ancestors, averaged per user.
/// Uses the corpus-wide vectors; comments with no ancestor chain count as 0.
pub struct ParentChildSimilarity;

impl Feature for ParentChildSimilarity {
    fn name(&self) -> &'static str {
        PARENT_CHILD_SIMILARITY
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let sims = per_comment_over_threads(ctx, "Parent-child similarity", |index, members| {
            let vectors: AHashMap<&str, &SparseVec> =
                members.iter().map(|&i| (ctx.comments[i].id.as_str(), &ctx.vectors[i])).collect();
            members
                .iter()
                .map(|&i| (i, index.chain_similarity(ctx.comments[i].id.as_str(), &vectors)))
                .collect()
        });
        Ok(vec![(PARENT_CHILD_SIMILARITY, ctx.per_user_mean("Average parent-child similarity", &sims))])
    }
}

/// Mean type-token ratio of cleaned comments.
pub struct AvgTtr;

impl Feature for AvgTtr {
    fn name(&self) -> &'static str {
        AVG_TTR
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let ttr: Vec<f64> = ctx.cleaned.par_iter().map(|t| type_token_ratio(t)).collect();
        Ok(vec![(AVG_TTR, ctx.per_user_mean("Type-token ratio", &ttr))])
    }
}

/// Mean Flesch–Kincaid grade of cleaned comments.
pub struct AvgFleschKincaidGrade;

impl Feature for AvgFleschKincaidGrade {
    fn name(&self) -> &'static str {
        AVG_FLESCH_KINCAID_GRADE
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let grades: Vec<f64> = ctx.cleaned.par_iter().map(|t| flesch_kincaid_grade(t)).collect();
        Ok(vec![(AVG_FLESCH_KINCAID_GRADE, ctx.per_user_mean("Flesch-Kincaid grade", &grades))])
    }
}

/// Word n-gram overlap across all pairs of a user's comments:
/// summed intersections over summed unions. Fewer than two comments, or an
/// empty union, gives 0.
pub struct NgramOverlap {
    pub n: usize,
}

impl Feature for NgramOverlap {
    fn name(&self) -> &'static str {
        NGRAM_OVERLAP
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let vals = ctx.per_user("N-gram overlap", |idx| Some(ngram_overlap(&ctx.texts(idx), self.n)));
        Ok(vec![(NGRAM_OVERLAP, vals.into_iter().collect())])
    }
}

pub fn ngram_overlap<S: AsRef<str>>(comments: &[S], n: usize) -> f64 {
    if comments.len() < 2 {
        return 0.0;
    }
    let sets: Vec<AHashSet<String>> = comments.iter().map(|c| ngrams(c.as_ref(), n)).collect();
    let (mut overlap, mut total) = (0usize, 0usize);
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            let inter = sets[i].intersection(&sets[j]).count();
            overlap += inter;
            total += sets[i].len() + sets[j].len() - inter;
        }
    }
    if total == 0 { 0.0 } else { overlap as f64 / total as f64 }
}

/// Mean comment score, reply count and stickied fraction. Missing values count as 0/false.
pub struct Engagement;

impl Feature for Engagement {
    fn name(&self) -> &'static str {
        "engagement"
    }
    fn compute(&self, ctx: &FeatureContext<'_>) -> Result<Vec<(&'static str, UserValues)>> {
        let score: Vec<f64> = ctx.comments.iter().map(|c| c.score.unwrap_or(0.0)).collect();
        let replies: Vec<f64> = ctx.comments.iter().map(|c| c.num_replies.unwrap_or(0.0)).collect();
        let stickied: Vec<f64> = ctx
            .comments
            .iter()
            .map(|c| if c.stickied.unwrap_or(false) { 1.0 } else { 0.0 })
            .collect();
        Ok(vec![
            (AVG_SCORE, ctx.per_user_mean("Average score", &score)),
            (AVG_NUM_REPLIES, ctx.per_user_mean("Average replies", &replies)),
            (AVG_STICKIED, ctx.per_user_mean("Stickied fraction", &stickied)),
        ])
    }
}

/// The fixed, ordered feature list.
pub fn default_features(opts: &PipelineOptions) -> Vec<Box<dyn Feature>> {
    let mut steps: Vec<Box<dyn Feature>> = vec![
        Box::new(AvgCosineSimilarity),
        Box::new(AllUsersSimilarity),
        Box::new(CommentLength),
        Box::new(CommentPostRatio),
        Box::new(AvgThreadDepth),
        Box::new(ParentChildSimilarity),
        Box::new(AvgTtr),
        Box::new(AvgFleschKincaidGrade),
        Box::new(NgramOverlap { n: opts.ngram_n }),
    ];
    if opts.engagement_features {
        steps.push(Box::new(Engagement));
    }
    steps
}

/// Build the feature table: profile columns followed by every feature column.
pub fn build_feature_table(tables: &Tables, opts: &PipelineOptions) -> Result<FeatureTable> {
    let ctx = FeatureContext::new(tables, opts);
    let mut table = FeatureTable::from_users(&tables.users);
    for step in default_features(opts) {
        for (column, values) in step.compute(&ctx)? {
            let covered = values.keys().filter(|u| table.contains(u)).count();
            table.merge_left(column, &values);
            tracing::info!("Feature {} created ({} of {} users non-null)", column, covered, table.len());
        }
        tracing::debug!("step {} done", step.name());
    }
    Ok(table)
}
