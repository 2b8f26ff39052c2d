use std::path::{Path, PathBuf};

pub const COMMENTS_FILE: &str = "all_comments-merged.csv";
pub const POSTS_FILE: &str = "all_posts-merged.csv";
pub const USERS_FILE: &str = "user_data-merged.csv";
pub const FEATURES_FILE: &str = "features.csv";
pub const LABELS_FILE: &str = "labels.csv";

/// Pipeline options with sensible defaults and builder chaining.
/// Every path is derived from `data_dir` unless overridden individually.
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    pub data_dir: PathBuf,
    pub comments_path: PathBuf,
    pub posts_path: PathBuf,
    pub users_path: PathBuf,
    pub features_out: PathBuf,
    pub labels_out: PathBuf,

    pub sample_size: usize,    // population background corpus for all_users_similarity
    pub sample_seed: u64,
    pub ngram_n: usize,        // n for ngram_overlap
    pub max_chain_hops: usize, // cap on parent-link walks (cycles in malformed input)

    pub engagement_features: bool, // avg_score / avg_num_replies / avg_stickied

    pub parallelism: Option<usize>, // Some(N) to set rayon threads, None to use default
    pub progress: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        let base = PathBuf::from("./data");
        Self {
            comments_path: base.join(COMMENTS_FILE),
            posts_path: base.join(POSTS_FILE),
            users_path: base.join(USERS_FILE),
            features_out: base.join(FEATURES_FILE),
            labels_out: base.join(LABELS_FILE),
            data_dir: base,

            sample_size: 5000,
            sample_seed: 42,
            ngram_n: 2,
            max_chain_hops: 10_000,

            engagement_features: false,

            parallelism: None,
            progress: true,
        }
    }
}

impl PipelineOptions {
    pub fn with_data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        let base = dir.as_ref().to_path_buf();
        self.comments_path = base.join(COMMENTS_FILE);
        self.posts_path = base.join(POSTS_FILE);
        self.users_path = base.join(USERS_FILE);
        self.features_out = base.join(FEATURES_FILE);
        self.labels_out = base.join(LABELS_FILE);
        self.data_dir = base;
        self
    }
    pub fn with_comments_path(mut self, p: impl AsRef<Path>) -> Self {
        self.comments_path = p.as_ref().to_path_buf();
        self
    }
    pub fn with_posts_path(mut self, p: impl AsRef<Path>) -> Self {
        self.posts_path = p.as_ref().to_path_buf();
        self
    }
    pub fn with_users_path(mut self, p: impl AsRef<Path>) -> Self {
        self.users_path = p.as_ref().to_path_buf();
        self
    }
    pub fn with_features_out(mut self, p: impl AsRef<Path>) -> Self {
        self.features_out = p.as_ref().to_path_buf();
        self
    }
    pub fn with_labels_out(mut self, p: impl AsRef<Path>) -> Self {
        self.labels_out = p.as_ref().to_path_buf();
        self
    }
    pub fn with_sample(mut self, size: usize, seed: u64) -> Self {
        self.sample_size = size.max(1);
        self.sample_seed = seed;
        self
    }
    pub fn with_ngram_n(mut self, n: usize) -> Self {
        self.ngram_n = n.max(1);
        self
    }
    pub fn with_max_chain_hops(mut self, hops: usize) -> Self {
        self.max_chain_hops = hops.max(1);
        self
    }
    pub fn with_engagement_features(mut self, yes: bool) -> Self {
        self.engagement_features = yes;
        self
    }
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = Some(threads);
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
}
