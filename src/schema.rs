//! Row types for the three input tables and the two output tables.

use serde::{Deserialize, Serialize};

pub const COMMENT_COLUMNS: &[&str] = &["id", "parent_id", "post_title", "username", "body", "score"];
/// Extra comment columns required once the engagement features are switched on.
pub const ENGAGEMENT_COLUMNS: &[&str] = &["num_replies", "stickied"];
pub const POST_COLUMNS: &[&str] = &["username", "title", "text", "score", "upvote_ratio"];
pub const USER_COLUMNS: &[&str] = &["username", "link_karma", "comment_karma", "account_age", "is_verified"];

/// One comment. `parent_id` carries a type prefix: `t3_` (post) or `t1_` (comment).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Comment {
    pub id: String,
    pub parent_id: String,
    pub post_title: String, // thread key
    pub username: Option<String>,
    pub subreddit: Option<String>,
    pub body: String,
    pub score: Option<f64>,
    pub num_replies: Option<f64>,
    pub is_submitter: Option<bool>,
    pub stickied: Option<bool>,
    pub date: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Post {
    pub username: Option<String>,
    pub subreddit: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub score: Option<f64>,
    pub upvote_ratio: Option<f64>,
    pub num_comments: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct User {
    pub username: String,
    pub link_karma: Option<f64>,
    pub comment_karma: Option<f64>,
    pub account_age: Option<f64>, // days
    pub is_verified: Option<bool>,
}

/// Final label: rule-based signal OR lexical signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelRow {
    pub username: String,
    pub is_bot: bool,
}

/// The three input tables, fully materialized.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub posts: Vec<Post>,
    pub comments: Vec<Comment>,
    pub users: Vec<User>,
}
