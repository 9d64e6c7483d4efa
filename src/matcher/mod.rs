//! Fuzzy matching of OCR text against the name vocabulary
//!
//! The matcher owns an immutable [`NormalizedIndex`] behind a lock. A
//! vocabulary change builds a complete new index first and then swaps the
//! `Arc`, so readers holding a snapshot never see a half-built table.

pub mod normalize;
pub mod vocabulary;

use serde::Serialize;
use std::sync::{Arc, RwLock};

pub use normalize::{clean_text, normalize, words};
pub use vocabulary::{NormalizedIndex, VocabularyEntry, VocabularySource, VocabularyTable};

/// How a candidate was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// The whole cleaned text matched the name
    FullText,
    /// A single word of the text matched the name
    Word,
}

/// A vocabulary name the text resembles
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NameMatch {
    pub canonical_name: String,
    /// Similarity in [0, 1], already discounted for word matches
    pub similarity: f32,
    pub kind: MatchKind,
    /// The cleaned text or word that produced the match
    pub matched_text: String,
}

/// Matching cutoffs and limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherTuning {
    /// Minimum similarity for a whole-text match
    pub full_text_cutoff: f32,
    /// Whole-text candidates kept before merging
    pub full_text_limit: usize,
    /// Minimum similarity for a single-word match (before discount)
    pub word_cutoff: f32,
    /// Candidates kept per word
    pub word_limit: usize,
    /// Multiplier applied to word-match similarity
    pub word_discount: f32,
    /// Words shorter than this (in characters) are not matched alone
    pub min_word_len: usize,
}

impl Default for MatcherTuning {
    fn default() -> Self {
        Self {
            full_text_cutoff: 0.6,
            full_text_limit: 5,
            word_cutoff: 0.7,
            word_limit: 3,
            word_discount: 0.9,
            min_word_len: 3,
        }
    }
}

pub struct NameMatcher {
    index: RwLock<Arc<NormalizedIndex>>,
    tuning: MatcherTuning,
}

impl NameMatcher {
    pub fn new(table: &VocabularyTable) -> Self {
        Self::with_tuning(table, MatcherTuning::default())
    }

    pub fn with_tuning(table: &VocabularyTable, tuning: MatcherTuning) -> Self {
        Self {
            index: RwLock::new(Arc::new(NormalizedIndex::build(table))),
            tuning,
        }
    }

    pub fn tuning(&self) -> &MatcherTuning {
        &self.tuning
    }

    /// Rebuild the index from `table` and swap it in
    pub fn replace_vocabulary(&self, table: &VocabularyTable) {
        let rebuilt = Arc::new(NormalizedIndex::build(table));
        let size = rebuilt.len();

        let mut guard = self
            .index
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = rebuilt;
        drop(guard);

        tracing::info!("Vocabulary replaced: {} entries, {} index keys", table.len(), size);
    }

    /// The index as of now; later replacements do not affect it
    pub fn snapshot(&self) -> Arc<NormalizedIndex> {
        self.index
            .read()
            .map(|guard| Arc::clone(&guard))
            .unwrap_or_else(|poisoned| Arc::clone(&poisoned.into_inner()))
    }

    /// Match `text` against the current vocabulary
    pub fn find_matches(&self, text: &str, limit: usize) -> Vec<NameMatch> {
        find_in(&self.snapshot(), &self.tuning, text, limit)
    }
}

/// Match `text` against `index`.
///
/// The whole cleaned text is compared first; every word of at least
/// `min_word_len` characters is then compared on its own at a stricter
/// cutoff, with a discounted similarity. Candidates are merged per name
/// (best similarity wins) and returned best first.
pub fn find_in(index: &NormalizedIndex, tuning: &MatcherTuning, text: &str, limit: usize) -> Vec<NameMatch> {
    if index.is_empty() || limit == 0 {
        return Vec::new();
    }

    let cleaned = clean_text(text);
    let mut matches = Vec::new();

    let normalized_text = normalize(&cleaned);
    if !normalized_text.is_empty() {
        for (canonical, similarity) in
            close_matches(index, &normalized_text, tuning.full_text_cutoff, tuning.full_text_limit)
        {
            matches.push(NameMatch {
                canonical_name: canonical.to_string(),
                similarity,
                kind: MatchKind::FullText,
                matched_text: cleaned.clone(),
            });
        }
    }

    for word in words(&cleaned) {
        if word.chars().count() < tuning.min_word_len {
            continue;
        }
        let normalized_word = normalize(word);
        if normalized_word.is_empty() {
            continue;
        }
        for (canonical, similarity) in
            close_matches(index, &normalized_word, tuning.word_cutoff, tuning.word_limit)
        {
            matches.push(NameMatch {
                canonical_name: canonical.to_string(),
                similarity: similarity * tuning.word_discount,
                kind: MatchKind::Word,
                matched_text: word.to_string(),
            });
        }
    }

    let mut unique: Vec<NameMatch> = Vec::new();
    for candidate in matches {
        match unique
            .iter_mut()
            .find(|m| m.canonical_name == candidate.canonical_name)
        {
            Some(existing) if candidate.similarity > existing.similarity => *existing = candidate,
            Some(_) => {}
            None => unique.push(candidate),
        }
    }

    unique.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    unique.truncate(limit);
    unique
}

/// Index keys within `cutoff` of `query`, best first, at most `limit`
fn close_matches<'a>(index: &'a NormalizedIndex, query: &str, cutoff: f32, limit: usize) -> Vec<(&'a str, f32)> {
    let mut scored: Vec<(&str, f32)> = index
        .keys()
        .filter_map(|(key, canonical)| {
            let similarity = strsim::normalized_levenshtein(query, key) as f32;
            (similarity >= cutoff).then_some((canonical, similarity))
        })
        .collect();

    // Stable: equal scores keep index order
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}
