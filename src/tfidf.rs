//! TF-IDF vectorizer with L2-normalized sparse rows.
//!
//! Weighting: raw term counts times smoothed idf, `ln((1 + n) / (1 + df)) + 1`,
//! then each row scaled to unit length. The vocabulary belongs to the corpus a
//! model was fitted on; every similarity feature fits its own model, so terms
//! from one comparison group never leak into another.

use crate::text::tokens;
use ahash::AHashMap;
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeSet;

/// Sparse vector as `(term index, weight)` pairs sorted by index.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SparseVec {
    entries: Vec<(u32, f64)>,
}

impl SparseVec {
    pub fn from_entries(mut entries: Vec<(u32, f64)>) -> Self {
        entries.sort_unstable_by_key(|e| e.0);
        Self { entries }
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn is_zero(&self) -> bool {
        self.entries.iter().all(|&(_, w)| w == 0.0)
    }

    pub fn norm(&self) -> f64 {
        self.entries.iter().map(|&(_, w)| w * w).sum::<f64>().sqrt()
    }

    /// Dot product by merging the two sorted index lists.
    pub fn dot(&self, other: &SparseVec) -> f64 {
        let (a, b) = (&self.entries, &other.entries);
        let (mut i, mut j, mut acc) = (0usize, 0usize, 0.0f64);
        while i < a.len() && j < b.len() {
            match a[i].0.cmp(&b[j].0) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += a[i].1 * b[j].1;
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }

    /// Dot product against a dense vector over the same vocabulary.
    pub fn dot_dense(&self, dense: &[f64]) -> f64 {
        self.entries
            .iter()
            .filter_map(|&(i, w)| dense.get(i as usize).map(|d| w * d))
            .sum()
    }

    fn normalize(&mut self) {
        let n = self.norm();
        if n > 0.0 {
            for e in &mut self.entries {
                e.1 /= n;
            }
        }
    }
}

/// Cosine similarity clamped to `[0, 1]`; a zero vector is similar to nothing.
pub fn cosine(u: &SparseVec, v: &SparseVec) -> f64 {
    let denom = u.norm() * v.norm();
    if denom == 0.0 {
        return 0.0;
    }
    (u.dot(v) / denom).clamp(0.0, 1.0)
}

/// A fitted vocabulary with its idf weights.
#[derive(Clone, Debug, Default)]
pub struct TfidfModel {
    vocab: AHashMap<String, u32>,
    idf: Vec<f64>,
    n_docs: usize,
}

impl TfidfModel {
    /// Fit vocabulary and idf on `corpus`. Term indices follow sorted term order.
    pub fn fit<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut df: AHashMap<&str, usize> = AHashMap::new();
        for doc in corpus {
            let unique: BTreeSet<&str> = tokens(doc.as_ref()).collect();
            for t in unique {
                *df.entry(t).or_insert(0) += 1;
            }
        }
        let terms: BTreeSet<&str> = df.keys().copied().collect();
        let n = corpus.len() as f64;
        let mut vocab = AHashMap::with_capacity(terms.len());
        let mut idf = Vec::with_capacity(terms.len());
        for (i, t) in terms.into_iter().enumerate() {
            let d = df.get(t).copied().unwrap_or(0) as f64;
            idf.push(((1.0 + n) / (1.0 + d)).ln() + 1.0);
            vocab.insert(t.to_string(), i as u32);
        }
        Self { vocab, idf, n_docs: corpus.len() }
    }

    /// Fit on `corpus` and return the model plus one vector per document.
    pub fn fit_transform<S: AsRef<str>>(corpus: &[S]) -> (Self, Vec<SparseVec>) {
        let model = Self::fit(corpus);
        let vecs = corpus.iter().map(|d| model.transform(d.as_ref())).collect();
        (model, vecs)
    }

    /// Vectorize one document; out-of-vocabulary terms carry no weight.
    pub fn transform(&self, doc: &str) -> SparseVec {
        let mut counts: AHashMap<u32, f64> = AHashMap::new();
        for t in tokens(doc) {
            if let Some(&i) = self.vocab.get(t) {
                *counts.entry(i).or_insert(0.0) += 1.0;
            }
        }
        let entries = counts.into_iter().map(|(i, tf)| (i, tf * self.idf[i as usize])).collect();
        let mut v = SparseVec::from_entries(entries);
        v.normalize();
        v
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    pub fn n_docs(&self) -> usize {
        self.n_docs
    }
}

/// Mean pairwise cosine similarity over distinct pairs (self-pairs excluded).
/// `None` for fewer than two vectors.
pub fn mean_pairwise_cosine(vecs: &[SparseVec]) -> Option<f64> {
    let n = vecs.len();
    if n < 2 {
        return None;
    }
    let mut total = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            total += cosine(&vecs[i], &vecs[j]);
        }
    }
    Some(total / (n * (n - 1) / 2) as f64)
}

/// Background corpus for population similarity: a seeded random sample of
/// cleaned comments, its fitted model and the mean of its row vectors.
///
/// Since every row is unit length, the mean cosine of a vector against all
/// sampled rows equals its dot product with that mean.
pub struct PopulationSample {
    model: TfidfModel,
    centroid: Vec<f64>,
    size: usize,
}

impl PopulationSample {
    /// Draw `min(size, corpus.len())` documents without replacement.
    /// Returns `None` on an empty corpus.
    pub fn draw<S: AsRef<str>>(corpus: &[S], size: usize, seed: u64) -> Option<Self> {
        if corpus.is_empty() || size == 0 {
            return None;
        }
        let amount = size.min(corpus.len());
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        let picked: Vec<&str> = sample(&mut rng, corpus.len(), amount)
            .into_iter()
            .map(|i| corpus[i].as_ref())
            .collect();
        Some(Self::from_docs(&picked))
    }

    /// Use `docs` as the whole background corpus.
    pub fn from_docs<S: AsRef<str>>(docs: &[S]) -> Self {
        let (model, rows) = TfidfModel::fit_transform(docs);
        let mut centroid = vec![0.0; model.vocabulary_len()];
        for row in &rows {
            for &(i, w) in row.entries() {
                centroid[i as usize] += w;
            }
        }
        let size = rows.len();
        if size > 0 {
            for c in &mut centroid {
                *c /= size as f64;
            }
        }
        Self { model, centroid, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Mean, over `docs`, of each doc's mean cosine similarity against every sampled row.
    pub fn mean_similarity<S: AsRef<str>>(&self, docs: &[S]) -> Option<f64> {
        if docs.is_empty() {
            return None;
        }
        let total: f64 = docs
            .iter()
            .map(|d| self.model.transform(d.as_ref()).dot_dense(&self.centroid).clamp(0.0, 1.0))
            .sum();
        Some(total / docs.len() as f64)
    }
}
