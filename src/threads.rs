//! Reply-tree reconstruction within one discussion thread.
//!
//! Comments are flat `(id, parent_id)` pairs. A parent id carries a kind prefix:
//! `t1_` points at another comment, `t3_` at the post (the thread root). Walks
//! follow comment-kind parents only and are capped at `max_hops` so a cycle in
//! malformed input cannot loop forever.

use crate::schema::Comment;
use crate::tfidf::{cosine, SparseVec};
use ahash::AHashMap;
use std::collections::BTreeMap;

pub const COMMENT_PREFIX: &str = "t1_";
pub const POST_PREFIX: &str = "t3_";

/// Decoded `parent_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentRef<'a> {
    Comment(&'a str),
    Post(&'a str),
    Other(&'a str),
}

pub fn parse_parent(parent_id: &str) -> ParentRef<'_> {
    if let Some(id) = parent_id.strip_prefix(COMMENT_PREFIX) {
        ParentRef::Comment(id)
    } else if let Some(id) = parent_id.strip_prefix(POST_PREFIX) {
        ParentRef::Post(id)
    } else {
        ParentRef::Other(parent_id)
    }
}

/// Indices of `comments` grouped by thread key (post title), in input order.
pub fn group_by_thread(comments: &[Comment]) -> BTreeMap<&str, Vec<usize>> {
    let mut threads: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (i, c) in comments.iter().enumerate() {
        threads.entry(c.post_title.as_str()).or_default().push(i);
    }
    threads
}

/// Parent links of one thread: comment id -> raw parent id.
/// A duplicated id keeps its last parent.
pub struct ThreadIndex<'a> {
    parents: AHashMap<&'a str, &'a str>,
    max_hops: usize,
}

impl<'a> ThreadIndex<'a> {
    pub fn new(links: impl IntoIterator<Item = (&'a str, &'a str)>, max_hops: usize) -> Self {
        Self { parents: links.into_iter().collect(), max_hops: max_hops.max(1) }
    }

    /// Index the comments at `members` (indices into `comments`).
    pub fn for_members(comments: &'a [Comment], members: &[usize], max_hops: usize) -> Self {
        Self::new(
            members.iter().map(|&i| (comments[i].id.as_str(), comments[i].parent_id.as_str())),
            max_hops,
        )
    }

    /// Ancestor comment ids of `id`, nearest first. Stops at a post parent, at an
    /// id absent from this thread (that id is still yielded), or after `max_hops`.
    pub fn ancestors(&self, id: &str) -> Ancestors<'_, 'a> {
        Ancestors { index: self, next_parent: self.parents.get(id).copied(), hops: 0 }
    }

    /// Number of comment-kind parent hops from `id`; 0 for a top-level reply.
    pub fn depth(&self, id: &str) -> usize {
        self.ancestors(id).count()
    }

    /// Mean cosine similarity between `id`'s vector and each ancestor's vector
    /// along the chain. Ancestors without a vector are skipped; an empty chain gives 0.
    pub fn chain_similarity(&self, id: &str, vectors: &AHashMap<&str, &SparseVec>) -> f64 {
        let Some(own) = vectors.get(id) else { return 0.0 };
        let (mut sum, mut n) = (0.0, 0usize);
        for anc in self.ancestors(id) {
            if let Some(v) = vectors.get(anc) {
                sum += cosine(own, v);
                n += 1;
            }
        }
        if n == 0 { 0.0 } else { sum / n as f64 }
    }
}

pub struct Ancestors<'i, 'a> {
    index: &'i ThreadIndex<'a>,
    next_parent: Option<&'a str>,
    hops: usize,
}

impl<'i, 'a> Iterator for Ancestors<'i, 'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.hops >= self.index.max_hops {
            if self.next_parent.take().is_some() {
                tracing::debug!("parent walk stopped at the {}-hop cap", self.index.max_hops);
            }
            return None;
        }
        match parse_parent(self.next_parent.take()?) {
            ParentRef::Comment(pid) => {
                self.hops += 1;
                self.next_parent = self.index.parents.get(pid).copied();
                Some(pid)
            }
            ParentRef::Post(_) | ParentRef::Other(_) => None,
        }
    }
}
