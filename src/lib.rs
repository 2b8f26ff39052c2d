mod config;
mod error;
mod schema;
mod util;
mod progress;

mod load;
mod text;
mod tfidf;
mod threads;
mod features;
mod labels;

mod output;
mod prepare;
mod pipeline;

pub use crate::config::{PipelineOptions, COMMENTS_FILE, FEATURES_FILE, LABELS_FILE, POSTS_FILE, USERS_FILE};
pub use crate::error::SchemaError;
pub use crate::schema::{Comment, LabelRow, Post, Tables, User, ENGAGEMENT_COLUMNS};
pub use crate::pipeline::{merge_dumps, prepare_model_matrix, BotLabelPipeline, RunSummary};

// ingestion
pub use crate::load::{discover_dumps, load_tables, merge_raw_dumps, open_table, read_comments, read_comments_requiring, read_posts, read_users, MergedPaths};

// text normalizer and vectorizer
pub use crate::text::{
    clean, emoji_char_count, emoji_sequence_count, flesch_kincaid_grade, is_degenerate, is_emoji_char, ngrams,
    sentence_count, syllable_count, tokens, type_token_ratio,
};
pub use crate::tfidf::{cosine, mean_pairwise_cosine, PopulationSample, SparseVec, TfidfModel};
pub use crate::threads::{group_by_thread, parse_parent, Ancestors, ParentRef, ThreadIndex};

// features: the Feature trait is the extension seam
pub use crate::features::{
    build_feature_table, default_features, mean, ngram_overlap, Column, Feature, FeatureContext, FeatureTable,
    UserValues,
};
pub use crate::features::{
    AllUsersSimilarity, AvgCosineSimilarity, AvgFleschKincaidGrade, AvgThreadDepth, AvgTtr, CommentLength,
    CommentPostRatio, Engagement, NgramOverlap, ParentChildSimilarity,
};
pub use crate::features::{
    ALL_USERS_SIMILARITY, AVG_COMMENT_LENGTH, AVG_COSINE_SIMILARITY, AVG_FLESCH_KINCAID_GRADE, AVG_NUM_REPLIES,
    AVG_SCORE, AVG_STICKIED, AVG_THREAD_DEPTH, AVG_TTR, COMMENT_POST_RATIO, MAX_COMMENT_LENGTH, MIN_COMMENT_LENGTH,
    NGRAM_OVERLAP, PARENT_CHILD_SIMILARITY, PROFILE_COLUMNS,
};

// labeler
pub use crate::labels::{
    evaluate_rules, label_users, lexical_bot_usernames, user_activity, username_looks_automated, username_words,
    RuleVerdict, Signal, SpecialChars, UserActivity, SIGNALS, SIGNAL_THRESHOLD,
};

// outputs and model preparation
pub use crate::output::{read_feature_table, read_labels, write_features, write_labels, write_matrix};
pub use crate::prepare::{prepare, prepare_files, standardize, ModelMatrix};

// export robust file ops and logging setup so binaries can import from crate root.
pub use crate::progress::{make_count_progress, StepProgress};
pub use crate::util::{init_thread_pool, init_tracing_once, open_with_backoff, replace_file_with_backoff};
