#[path = "common/mod.rs"]
mod common;

use botlabel::{
    evaluate_rules, is_emoji_char, lexical_bot_usernames, username_looks_automated, username_words, BotLabelPipeline, Comment,
    RuleVerdict, SpecialChars, UserActivity,
};
use common::*;
use std::collections::BTreeMap;

fn neutral(username: &str) -> UserActivity {
    UserActivity {
        username: username.to_string(),
        link_karma: 10.0,
        comment_karma: 100.0,
        account_age: 400.0,
        avg_score: 2.0,
        avg_upvote_ratio: 0.5,
        ..Default::default()
    }
}

fn body(user: &str, text: &str) -> Comment {
    Comment { username: Some(user.to_string()), body: text.to_string(), ..Default::default() }
}

/// Keyword and digit-suffix usernames are bots whatever the activity says.
#[test]
fn username_patterns_short_circuit() {
    assert_eq!(username_words("AutoModBot"), vec!["Auto", "Mod", "Bot"]);
    assert_eq!(username_words("OpenAIHelper"), vec!["Open", "AI", "Helper"]);
    assert_eq!(username_words("news_feed-2"), vec!["news", "feed", "2"]);

    assert!(username_looks_automated("AutoModBot"));
    assert!(username_looks_automated("player99999999"));
    assert!(username_looks_automated("daily_news"));
    assert!(!username_looks_automated("player1234"));
    assert!(!username_looks_automated("robotics_fan"));
    assert!(!username_looks_automated("alice"));

    assert_eq!(evaluate_rules(&neutral("AutoModBot")), RuleVerdict::UsernamePattern);
    assert_eq!(evaluate_rules(&neutral("player99999999")), RuleVerdict::UsernamePattern);
}

/// A young, busy account with otherwise neutral fields scores one point and stays human.
#[test]
fn one_signal_is_not_enough() {
    let u = UserActivity { account_age: 10.0, num_posts: 50.0, num_comments: 100.0, ..neutral("newcomer") };
    assert_eq!(evaluate_rules(&u), RuleVerdict::Human { points: 1 });
}

/// Points accumulate in order and the first check that sees more than 3 labels the user.
#[test]
fn four_signals_trip_the_threshold() {
    let u = UserActivity {
        account_age: 10.0,
        num_comments: 150.0,
        link_karma: -50.0,
        comment_karma: -100.0,
        avg_score: 0.1,
        avg_upvote_ratio: 0.99,
        ..neutral("plain")
    };
    assert_eq!(
        evaluate_rules(&u),
        RuleVerdict::Signals { points: 4, tripped_by: "extreme_upvote_ratio" }
    );

    // without the age signal the fourth point comes from the karma ratio
    let older = UserActivity { account_age: 400.0, ..u };
    assert_eq!(
        evaluate_rules(&older),
        RuleVerdict::Signals { points: 4, tripped_by: "link_heavy_karma" }
    );
}

/// A zero upvote ratio (no posts) never counts as extreme.
#[test]
fn zero_upvote_ratio_is_neutral() {
    let u = UserActivity { avg_upvote_ratio: 0.0, ..neutral("lurker") };
    assert_eq!(evaluate_rules(&u), RuleVerdict::Human { points: 0 });
}

/// Lexical detector: averages and single-comment maxima.
#[test]
fn lexical_signal_thresholds() {
    assert_eq!(SpecialChars::of("a/b/c 😀🎉"), SpecialChars { slashes: 2, emojis: 2 });
    // a skin-toned thumbs up is two emoji characters, and a bare modifier is one
    assert!(is_emoji_char('\u{1f3fb}'));
    assert_eq!(SpecialChars::of("\u{1f44d}\u{1f3fd}"), SpecialChars { slashes: 0, emojis: 2 });
    assert_eq!(SpecialChars::of("\u{1f3ff}"), SpecialChars { slashes: 0, emojis: 1 });

    let comments = vec![
        body("links", "see /r/a/b/c/d/e/f/g/h/i/j/k/l"),
        body("links", "ok"),
        body("smiley", "😀😀😀😀😀😀"),
        body("mixed", "a/b/c/d/e 😀😀😀😀😀"),
        body("calm", "a/b 😀"),
        body("calm", "plain words"),
    ];
    let flagged: Vec<String> = lexical_bot_usernames(&comments).into_iter().collect();
    assert_eq!(flagged, vec!["links", "mixed", "smiley"]);
}

/// Final labels over the basic corpus: one per user, OR of both detectors.
#[test]
fn labels_for_basic_corpus() {
    let base = make_corpus_basic();
    let pipeline = BotLabelPipeline::new().data_dir(&base).progress(false);
    let tables = pipeline.load().unwrap();
    let labels = pipeline.label(&tables);

    let names: Vec<&str> = labels.iter().map(|l| l.username.as_str()).collect();
    assert_eq!(names, basic_usernames());

    let by_user: BTreeMap<&str, bool> = labels.iter().map(|l| (l.username.as_str(), l.is_bot)).collect();
    assert!(by_user["AutoModBot"]);
    assert!(by_user["player99999999"]);
    assert!(by_user["spammer"]);
    for human in ["alice", "bob", "carol", "dave", "emojifan", "echo"] {
        assert!(!by_user[human], "{human} should not be labeled");
    }
}
