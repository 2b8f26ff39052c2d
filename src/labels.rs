//! Heuristic bot labeling.
//!
//! Two detectors, OR-combined per user:
//! - a lexical detector over raw comment bodies (slash and emoji counts);
//! - a rule-based detector over username patterns and aggregate activity.

use crate::schema::{Comment, LabelRow, Post, Tables, User};
use crate::text::emoji_char_count;
use ahash::AHashMap;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

// ----------------------------- Lexical detector ------------------------------------

pub const AVG_EMOJI_LIMIT: f64 = 5.0;
pub const AVG_SLASH_LIMIT: f64 = 6.0;
pub const AVG_COMBINED_LIMIT: f64 = 8.0;
pub const MAX_SLASH_LIMIT: usize = 10;
pub const MAX_EMOJI_LIMIT: usize = 10;
pub const MAX_COMBINED_LIMIT: usize = 15;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpecialChars {
    pub slashes: usize,
    pub emojis: usize,
}

impl SpecialChars {
    pub fn of(body: &str) -> Self {
        Self { slashes: body.matches('/').count(), emojis: emoji_char_count(body) }
    }
    #[inline]
    pub fn combined(&self) -> usize {
        self.slashes + self.emojis
    }
    fn exceeds_single_limits(&self) -> bool {
        self.slashes > MAX_SLASH_LIMIT || self.emojis > MAX_EMOJI_LIMIT || self.combined() > MAX_COMBINED_LIMIT
    }
}

#[derive(Default)]
struct CharTotals {
    slashes: usize,
    emojis: usize,
    comments: usize,
    any_over_limit: bool,
}

/// Users whose comments are dominated by slashes (links, paths) or emoji:
/// average emoji > 5, average slashes > 6 or average combined > 8, or any single
/// comment with > 10 slashes, > 10 emoji or > 15 combined.
pub fn lexical_bot_usernames(comments: &[Comment]) -> BTreeSet<String> {
    let mut per_user: AHashMap<&str, CharTotals> = AHashMap::new();
    for c in comments {
        let Some(user) = c.username.as_deref() else { continue };
        let counts = SpecialChars::of(&c.body);
        let t = per_user.entry(user).or_default();
        t.slashes += counts.slashes;
        t.emojis += counts.emojis;
        t.comments += 1;
        t.any_over_limit |= counts.exceeds_single_limits();
    }

    per_user
        .into_iter()
        .filter(|(_, t)| {
            let n = t.comments as f64;
            t.any_over_limit
                || t.emojis as f64 / n > AVG_EMOJI_LIMIT
                || t.slashes as f64 / n > AVG_SLASH_LIMIT
                || (t.slashes + t.emojis) as f64 / n > AVG_COMBINED_LIMIT
        })
        .map(|(u, _)| u.to_string())
        .collect()
}

// ----------------------------- Rule-based detector ------------------------------------

pub const BOT_KEYWORDS: [&str; 9] = ["bot", "auto", "mod", "helper", "AI", "assist", "news", "alert", "info"];
pub const SIGNAL_THRESHOLD: u32 = 3;

fn keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(r"(?i)^(?:{})$", BOT_KEYWORDS.join("|"));
        Regex::new(&pattern).expect("valid regex")
    })
}

fn trailing_digits_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[a-zA-Z]+[0-9]{5,}$").expect("valid regex"))
}

/// Split a username into words at separators, letter/digit changes and case
/// humps: `AutoModBot` -> `Auto Mod Bot`, `OpenAIHelper` -> `Open AI Helper`.
pub fn username_words(name: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = name.char_indices().collect();
    let mut words = Vec::new();
    let mut start: Option<usize> = None;
    for (k, &(pos, c)) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if let Some(s) = start.take() {
                words.push(&name[s..pos]);
            }
            continue;
        }
        let Some(s) = start else {
            start = Some(pos);
            continue;
        };
        let prev = chars[k - 1].1;
        let next = chars.get(k + 1).map(|&(_, n)| n);
        let boundary = (prev.is_alphabetic() != c.is_alphabetic())
            || (prev.is_lowercase() && c.is_uppercase())
            || (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase));
        if boundary {
            words.push(&name[s..pos]);
            start = Some(pos);
        }
    }
    if let Some(s) = start {
        words.push(&name[s..]);
    }
    words
}

/// Username contains a bot keyword as a whole word, or ends in letters followed by ≥5 digits.
pub fn username_looks_automated(name: &str) -> bool {
    username_words(name).into_iter().any(|w| keyword_re().is_match(w)) || trailing_digits_re().is_match(name)
}

/// Aggregate activity of one user over posts and comments, joined onto the profile.
/// Missing values are already neutral (0) here.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserActivity {
    pub username: String,
    pub link_karma: f64,
    pub comment_karma: f64,
    pub account_age: f64,
    pub num_posts: f64,
    pub num_texts: f64,
    pub num_comments: f64,
    pub avg_score: f64,
    pub avg_upvote_ratio: f64,
}

impl UserActivity {
    #[inline]
    pub fn total_activity(&self) -> f64 {
        self.num_posts + self.num_comments
    }
}

#[derive(Default)]
struct ActivityAcc {
    posts: usize,
    texts: usize,
    comments: usize,
    score_sum: f64,
    score_n: usize,
    ratio_sum: f64,
    ratio_n: usize,
}

/// Per-user activity for every user in `users`; users with no activity get zeros.
pub fn user_activity(posts: &[Post], comments: &[Comment], users: &[User]) -> Vec<UserActivity> {
    let mut acc: AHashMap<&str, ActivityAcc> = AHashMap::new();
    for p in posts {
        let Some(u) = p.username.as_deref() else { continue };
        let a = acc.entry(u).or_default();
        a.posts += p.title.is_some() as usize;
        a.texts += p.text.is_some() as usize;
        if let Some(s) = p.score {
            a.score_sum += s;
            a.score_n += 1;
        }
        if let Some(r) = p.upvote_ratio {
            a.ratio_sum += r;
            a.ratio_n += 1;
        }
    }
    for c in comments {
        let Some(u) = c.username.as_deref() else { continue };
        let a = acc.entry(u).or_default();
        a.comments += 1;
        if let Some(s) = c.score {
            a.score_sum += s;
            a.score_n += 1;
        }
    }

    let avg = |sum: f64, n: usize| if n == 0 { 0.0 } else { sum / n as f64 };
    users
        .iter()
        .map(|u| {
            let a = acc.get(u.username.as_str());
            UserActivity {
                username: u.username.clone(),
                link_karma: u.link_karma.unwrap_or(0.0),
                comment_karma: u.comment_karma.unwrap_or(0.0),
                account_age: u.account_age.unwrap_or(0.0),
                num_posts: a.map_or(0.0, |a| a.posts as f64),
                num_texts: a.map_or(0.0, |a| a.texts as f64),
                num_comments: a.map_or(0.0, |a| a.comments as f64),
                avg_score: a.map_or(0.0, |a| avg(a.score_sum, a.score_n)),
                avg_upvote_ratio: a.map_or(0.0, |a| avg(a.ratio_sum, a.ratio_n)),
            }
        })
        .collect()
}

/// One weighted sub-signal of the rule-based detector.
pub struct Signal {
    pub name: &'static str,
    pub weight: u32,
    /// Whether the running total is compared against the threshold right after this signal fires.
    pub checks_threshold: bool,
    pub test: fn(&UserActivity) -> bool,
}

/// Sub-signals in evaluation order. The order and the per-signal threshold
/// placement are part of the rule: the first signal never checks the threshold.
pub static SIGNALS: [Signal; 5] = [
    Signal {
        name: "young_and_busy",
        weight: 1,
        checks_threshold: false,
        test: |u| u.account_age < 60.0 && u.total_activity() > 100.0,
    },
    Signal {
        name: "negative_karma",
        weight: 1,
        checks_threshold: true,
        test: |u| u.link_karma < -30.0 || u.comment_karma < -30.0,
    },
    Signal {
        name: "low_engagement",
        weight: 1,
        checks_threshold: true,
        test: |u| u.avg_score < 0.5 && u.total_activity() > 10.0,
    },
    Signal {
        name: "extreme_upvote_ratio",
        weight: 1,
        checks_threshold: true,
        test: |u| (u.avg_upvote_ratio < 0.05 || u.avg_upvote_ratio > 0.96) && u.avg_upvote_ratio != 0.0,
    },
    Signal {
        name: "link_heavy_karma",
        weight: 1,
        checks_threshold: true,
        test: |u| u.link_karma > 10.0 * u.comment_karma,
    },
];

/// Why the rule-based detector decided the way it did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RuleVerdict {
    UsernamePattern,
    Signals { points: u32, tripped_by: &'static str },
    Human { points: u32 },
}

impl RuleVerdict {
    pub fn is_bot(&self) -> bool {
        !matches!(self, RuleVerdict::Human { .. })
    }
}

/// Username patterns short-circuit to bot; otherwise sub-signals accumulate in
/// order and the first threshold check that sees more than [`SIGNAL_THRESHOLD`]
/// points labels the user.
pub fn evaluate_rules(user: &UserActivity) -> RuleVerdict {
    if username_looks_automated(&user.username) {
        return RuleVerdict::UsernamePattern;
    }
    let mut points = 0u32;
    for signal in &SIGNALS {
        if (signal.test)(user) {
            points += signal.weight;
            if signal.checks_threshold && points > SIGNAL_THRESHOLD {
                return RuleVerdict::Signals { points, tripped_by: signal.name };
            }
        }
    }
    RuleVerdict::Human { points }
}

/// Final labels, one per user in users-table order:
/// rule-based verdict OR membership in the lexical detector's set.
pub fn label_users(tables: &Tables) -> Vec<LabelRow> {
    let lexical = lexical_bot_usernames(&tables.comments);
    let rows: Vec<LabelRow> = user_activity(&tables.posts, &tables.comments, &tables.users)
        .into_iter()
        .map(|u| {
            let verdict = evaluate_rules(&u);
            let is_bot = verdict.is_bot() || lexical.contains(&u.username);
            LabelRow { username: u.username, is_bot }
        })
        .collect();
    tracing::info!(
        users = rows.len(),
        bots = rows.iter().filter(|r| r.is_bot).count(),
        lexical = lexical.len(),
        "bots labeled"
    );
    rows
}
