//! Turns the text read from one capture into 1–3 identified entities
//!
//! Each extraction result is matched as a whole first; multi-word text that
//! does not match convincingly as a whole is split and matched word by word,
//! which is how duo and trio battle captures ("Rattata Keldeo") come apart.
//! Accepted names are then ranked and pruned so that closely related names
//! (one contained in the other) never appear together.

use crate::extraction::ExtractionResult;
use crate::matcher::{self, MatchKind, NameMatch, NameMatcher, NormalizedIndex};
use crate::preprocessing::Variant;
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Most entities reported for one capture
pub const MAX_ENTITIES: usize = 3;

/// A name candidate scored against the variant it was read from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchCandidate {
    pub canonical_name: String,
    pub similarity: f32,
    pub match_kind: MatchKind,
    pub matched_text: String,
    pub variant: Variant,
    /// similarity × the variant's base confidence
    pub combined_confidence: f32,
}

impl MatchCandidate {
    fn scored(found: NameMatch, extraction: &ExtractionResult) -> Self {
        Self {
            combined_confidence: found.similarity * extraction.base_confidence,
            canonical_name: found.canonical_name,
            similarity: found.similarity,
            match_kind: found.kind,
            matched_text: found.matched_text,
            variant: extraction.variant,
        }
    }
}

/// Entities identified in one capture, best first
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionSet {
    pub entities: Vec<MatchCandidate>,
    /// Every candidate seen while resolving, best per name, best first
    pub considered: Vec<MatchCandidate>,
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Up to `limit` other names seen for this capture, best first
    pub fn alternatives_for(&self, canonical_name: &str, limit: usize) -> Vec<MatchCandidate> {
        self.considered
            .iter()
            .filter(|c| c.canonical_name != canonical_name)
            .take(limit)
            .cloned()
            .collect()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("no text detected")]
    NoText,

    #[error("no entity recognized with sufficient confidence")]
    NoConfidentMatch,
}

/// Acceptance constants of the resolver
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolverTuning {
    /// Multi-word text accepted as a whole only at or above this similarity
    pub whole_text_similarity: f32,
    /// Alternatives listed per reported entity
    pub alternatives: usize,
}

impl Default for ResolverTuning {
    fn default() -> Self {
        Self {
            whole_text_similarity: 0.75,
            alternatives: 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MultiEntityResolver {
    tuning: ResolverTuning,
}

impl MultiEntityResolver {
    pub fn new(tuning: ResolverTuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &ResolverTuning {
        &self.tuning
    }

    /// Resolve against the matcher's current vocabulary.
    ///
    /// One snapshot of the index is used for the whole call.
    pub fn resolve(
        &self,
        matcher: &NameMatcher,
        extractions: &[ExtractionResult],
        max_entities: usize,
        confidence_threshold: f32,
    ) -> Result<DetectionSet, ResolveError> {
        let index = matcher.snapshot();
        self.resolve_with(
            &index,
            matcher.tuning(),
            extractions,
            max_entities,
            confidence_threshold,
        )
    }

    pub fn resolve_with(
        &self,
        index: &NormalizedIndex,
        matcher_tuning: &matcher::MatcherTuning,
        extractions: &[ExtractionResult],
        max_entities: usize,
        confidence_threshold: f32,
    ) -> Result<DetectionSet, ResolveError> {
        if extractions.is_empty() {
            return Err(ResolveError::NoText);
        }

        let max_entities = max_entities.clamp(1, MAX_ENTITIES);
        let mut claimed: HashSet<String> = HashSet::new();
        let mut accepted: Vec<MatchCandidate> = Vec::new();
        let mut considered: Vec<MatchCandidate> = Vec::new();

        for extraction in extractions {
            let cleaned = matcher::clean_text(&extraction.text);
            let word_list = matcher::words(&cleaned);

            let candidates: Vec<MatchCandidate> = matcher::find_in(
                index,
                matcher_tuning,
                &extraction.text,
                matcher_tuning.full_text_limit,
            )
            .into_iter()
            .map(|found| MatchCandidate::scored(found, extraction))
            .collect();
            considered.extend(candidates.iter().cloned());

            let best_full = best_unclaimed(
                candidates
                    .into_iter()
                    .filter(|c| c.match_kind == MatchKind::FullText),
                &claimed,
                confidence_threshold,
            );

            match best_full {
                Some(best)
                    if word_list.len() == 1
                        || best.similarity >= self.tuning.whole_text_similarity =>
                {
                    tracing::debug!(
                        "Whole text '{}' -> {} ({:.2})",
                        cleaned,
                        best.canonical_name,
                        best.combined_confidence
                    );
                    claim(&mut claimed, &mut accepted, best);
                }
                _ if word_list.len() > 1 => {
                    tracing::debug!("No convincing whole-text match for '{}', trying words", cleaned);
                    for word in word_list {
                        if word.chars().count() < matcher_tuning.min_word_len {
                            continue;
                        }
                        let Some(found) = matcher::find_in(index, matcher_tuning, word, 1).into_iter().next()
                        else {
                            continue;
                        };
                        let candidate = MatchCandidate::scored(found, extraction);
                        considered.push(candidate.clone());

                        if candidate.combined_confidence >= confidence_threshold
                            && !claimed.contains(&candidate.canonical_name.to_lowercase())
                        {
                            tracing::debug!(
                                "Word '{}' -> {} ({:.2})",
                                word,
                                candidate.canonical_name,
                                candidate.combined_confidence
                            );
                            claim(&mut claimed, &mut accepted, candidate);
                        }
                    }
                }
                Some(best) => {
                    tracing::debug!(
                        "Weak whole-text match '{}' -> {} ({:.2})",
                        cleaned,
                        best.canonical_name,
                        best.combined_confidence
                    );
                    claim(&mut claimed, &mut accepted, best);
                }
                None => {
                    tracing::debug!("No match above threshold for '{}'", cleaned);
                }
            }
        }

        if accepted.is_empty() {
            return Err(ResolveError::NoConfidentMatch);
        }

        sort_by_confidence(&mut accepted);
        let entities = prune_related_names(accepted, max_entities);

        Ok(DetectionSet {
            entities,
            considered: best_per_name(considered),
        })
    }
}

fn best_unclaimed(
    candidates: impl Iterator<Item = MatchCandidate>,
    claimed: &HashSet<String>,
    confidence_threshold: f32,
) -> Option<MatchCandidate> {
    let mut best: Option<MatchCandidate> = None;
    for candidate in candidates {
        if candidate.combined_confidence < confidence_threshold
            || claimed.contains(&candidate.canonical_name.to_lowercase())
        {
            continue;
        }
        let better = best
            .as_ref()
            .map_or(true, |b| candidate.combined_confidence > b.combined_confidence);
        if better {
            best = Some(candidate);
        }
    }
    best
}

fn claim(claimed: &mut HashSet<String>, accepted: &mut Vec<MatchCandidate>, candidate: MatchCandidate) {
    claimed.insert(candidate.canonical_name.to_lowercase());
    accepted.push(candidate);
}

fn sort_by_confidence(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| b.combined_confidence.total_cmp(&a.combined_confidence));
}

/// Keep the best candidates whose names do not contain one another.
///
/// `candidates` must be sorted best first, so a dropped name always loses
/// to a stronger related one (e.g. "Rattata" vs "Rattatac").
fn prune_related_names(candidates: Vec<MatchCandidate>, max_entities: usize) -> Vec<MatchCandidate> {
    let mut kept: Vec<MatchCandidate> = Vec::new();
    let mut kept_names: Vec<String> = Vec::new();

    for candidate in candidates {
        let name = candidate.canonical_name.to_lowercase();
        if let Some(existing) = kept_names
            .iter()
            .find(|existing| existing.contains(name.as_str()) || name.contains(existing.as_str()))
        {
            tracing::debug!(
                "Dropping '{}' ({:.2}): related to kept '{}'",
                candidate.canonical_name,
                candidate.combined_confidence,
                existing
            );
            continue;
        }

        kept_names.push(name);
        kept.push(candidate);
        if kept.len() >= max_entities {
            break;
        }
    }

    kept
}

fn best_per_name(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut unique: Vec<MatchCandidate> = Vec::new();
    for candidate in candidates {
        match unique
            .iter_mut()
            .find(|c| c.canonical_name == candidate.canonical_name)
        {
            Some(existing) if candidate.combined_confidence > existing.combined_confidence => {
                *existing = candidate
            }
            Some(_) => {}
            None => unique.push(candidate),
        }
    }
    sort_by_confidence(&mut unique);
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::VocabularyTable;
    use proptest::prelude::*;

    fn matcher(names: &[&str]) -> NameMatcher {
        NameMatcher::new(&VocabularyTable::from_display_strings(names.iter().copied()))
    }

    fn read(text: &str) -> Vec<ExtractionResult> {
        vec![ExtractionResult {
            text: text.to_string(),
            variant: Variant::Enhanced,
            base_confidence: Variant::Enhanced.base_confidence(),
        }]
    }

    fn names(set: &DetectionSet) -> Vec<&str> {
        set.entities.iter().map(|c| c.canonical_name.as_str()).collect()
    }

    #[test]
    fn test_empty_extraction_is_no_text() {
        let result = MultiEntityResolver::default().resolve(&matcher(&["mew"]), &[], 3, 0.6);
        assert_eq!(result, Err(ResolveError::NoText));
    }

    #[test]
    fn test_single_name_with_level_noise() {
        let matcher = matcher(&["charizard", "charmeleon"]);

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &read("CHARIZARD LV50"), 3, 0.6)
            .unwrap();

        assert_eq!(names(&set), vec!["charizard"]);
        assert!(set.entities[0].combined_confidence >= 0.6);
    }

    #[test]
    fn test_two_names_split_by_word() {
        let matcher = matcher(&["pikachu", "raichu"]);

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &read("PIKACHU RAICHU"), 3, 0.6)
            .unwrap();

        let mut found = names(&set);
        found.sort();
        assert_eq!(found, vec!["pikachu", "raichu"]);
        assert!(set.entities.iter().all(|c| c.match_kind == MatchKind::FullText));
    }

    #[test]
    fn test_related_names_keep_only_the_best() {
        let matcher = matcher(&["rattata", "rattatac"]);

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &read("RATTATA"), 3, 0.6)
            .unwrap();

        assert_eq!(names(&set), vec!["rattata"]);
        assert_eq!(set.alternatives_for("rattata", 3)[0].canonical_name, "rattatac");
    }

    #[test]
    fn test_substring_dedup_prefers_higher_confidence() {
        let matcher = matcher(&["mime", "mimejr"]);
        let extractions = vec![
            ExtractionResult {
                text: "Mime Jr".to_string(),
                variant: Variant::Enhanced,
                base_confidence: 0.9,
            },
            ExtractionResult {
                text: "Mime".to_string(),
                variant: Variant::Original,
                base_confidence: 0.7,
            },
        ];

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &extractions, 3, 0.6)
            .unwrap();

        assert_eq!(names(&set), vec!["mimejr"]);
    }

    #[test]
    fn test_later_extraction_cannot_reclaim_name() {
        let matcher = matcher(&["pikachu", "pichu"]);
        let extractions = vec![
            ExtractionResult {
                text: "Pikachu".to_string(),
                variant: Variant::Enhanced,
                base_confidence: 0.9,
            },
            ExtractionResult {
                text: "Pikachu".to_string(),
                variant: Variant::AdaptiveThreshold,
                base_confidence: 0.8,
            },
        ];

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &extractions, 3, 0.6)
            .unwrap();

        assert_eq!(set.len(), 1);
        assert_eq!(set.entities[0].variant, Variant::Enhanced);
    }

    #[test]
    fn test_below_threshold_is_no_confident_match() {
        let matcher = matcher(&["charizard"]);

        let result = MultiEntityResolver::default().resolve(&matcher, &read("Charizrd"), 3, 0.95);

        assert_eq!(result, Err(ResolveError::NoConfidentMatch));
    }

    #[test]
    fn test_max_entities_bounds_result() {
        let matcher = matcher(&["pikachu", "raichu", "bulbasaur", "squirtle"]);

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &read("Pikachu Raichu Bulbasaur Squirtle"), 2, 0.6)
            .unwrap();

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_weak_whole_text_single_word_is_accepted() {
        // One word: accepted even though similarity is under 0.75
        let matcher = matcher(&["dracaufeu"]);

        let set = MultiEntityResolver::default()
            .resolve(&matcher, &read("Drakofeu"), 1, 0.5)
            .unwrap();

        assert_eq!(names(&set), vec!["dracaufeu"]);
        assert!(set.entities[0].similarity < 0.75);
    }

    const VOCABULARY: &[&str] = &[
        "rattata", "rattatac", "raticate", "pikachu", "raichu", "pichu", "mew", "mewtwo", "mime",
        "mimejr", "charizard", "charmander", "charmeleon", "eevee", "evoli",
    ];

    proptest! {
        #[test]
        fn prop_detection_set_is_bounded_and_unrelated(
            picks in proptest::collection::vec(0..VOCABULARY.len(), 1..5),
            max_entities in 1usize..=3,
            noise in "[A-Za-z0-9 ]{0,8}",
        ) {
            let matcher = matcher(VOCABULARY);
            let text = picks
                .iter()
                .map(|&i| VOCABULARY[i].to_uppercase())
                .collect::<Vec<_>>()
                .join(" ")
                + " "
                + &noise;

            if let Ok(set) = MultiEntityResolver::default().resolve(&matcher, &read(&text), max_entities, 0.6) {
                prop_assert!(set.len() <= max_entities);
                for (i, a) in set.entities.iter().enumerate() {
                    prop_assert!(a.combined_confidence >= 0.6);
                    for b in set.entities.iter().skip(i + 1) {
                        let a = a.canonical_name.to_lowercase();
                        let b = b.canonical_name.to_lowercase();
                        prop_assert!(!a.contains(&b) && !b.contains(&a));
                    }
                }
            }
        }
    }
}
