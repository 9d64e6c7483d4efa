use crate::resolver::{DetectionSet, MatchCandidate, ResolveError};
use serde::Serialize;

/// Result of analysing one image
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Single(SingleResult),
    Multi(MultiResult),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    pub confidence: f32,
    pub alternatives: Vec<Alternative>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiResult {
    pub success: bool,
    pub count: usize,
    pub entities: Vec<EntityResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityResult {
    pub canonical_name: String,
    pub confidence: f32,
    pub alternatives: Vec<Alternative>,
}

/// Another name the image might show
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alternative {
    pub canonical_name: String,
    pub confidence: f32,
}

impl From<&MatchCandidate> for Alternative {
    fn from(candidate: &MatchCandidate) -> Self {
        Self {
            canonical_name: candidate.canonical_name.clone(),
            confidence: candidate.combined_confidence,
        }
    }
}

impl AnalysisResult {
    /// Shape a resolver outcome.
    ///
    /// Exactly one entity gives the single shape. Failures keep the shape
    /// the caller asked for: single when `max_entities` is 1, multi otherwise.
    pub fn from_resolution(
        resolution: Result<DetectionSet, ResolveError>,
        max_entities: usize,
        alternatives: usize,
    ) -> Self {
        match resolution {
            Ok(set) if set.len() == 1 => {
                let entity = &set.entities[0];
                AnalysisResult::Single(SingleResult {
                    success: true,
                    canonical_name: Some(entity.canonical_name.clone()),
                    confidence: entity.combined_confidence,
                    alternatives: alternatives_of(&set, entity, alternatives),
                    error: None,
                })
            }
            Ok(set) => AnalysisResult::Multi(MultiResult {
                success: true,
                count: set.len(),
                entities: set
                    .entities
                    .iter()
                    .map(|entity| EntityResult {
                        canonical_name: entity.canonical_name.clone(),
                        confidence: entity.combined_confidence,
                        alternatives: alternatives_of(&set, entity, alternatives),
                    })
                    .collect(),
                error: None,
            }),
            Err(e) => Self::failure(e.to_string(), max_entities),
        }
    }

    /// An unsuccessful result carrying `error`
    pub fn failure(error: impl Into<String>, max_entities: usize) -> Self {
        let error = Some(error.into());
        if max_entities <= 1 {
            AnalysisResult::Single(SingleResult {
                success: false,
                canonical_name: None,
                confidence: 0.0,
                alternatives: Vec::new(),
                error,
            })
        } else {
            AnalysisResult::Multi(MultiResult {
                success: false,
                count: 0,
                entities: Vec::new(),
                error,
            })
        }
    }

    pub fn is_success(&self) -> bool {
        match self {
            AnalysisResult::Single(single) => single.success,
            AnalysisResult::Multi(multi) => multi.success,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            AnalysisResult::Single(single) => single.error.as_deref(),
            AnalysisResult::Multi(multi) => multi.error.as_deref(),
        }
    }

    /// Identified names, best first
    pub fn entity_names(&self) -> Vec<&str> {
        match self {
            AnalysisResult::Single(single) => single.canonical_name.as_deref().into_iter().collect(),
            AnalysisResult::Multi(multi) => multi
                .entities
                .iter()
                .map(|e| e.canonical_name.as_str())
                .collect(),
        }
    }

    /// Stable identity of what was seen, used to debounce live detections.
    ///
    /// Several entities give their names sorted and joined with `_`, so the
    /// key does not depend on confidence order. Failures have no key.
    pub fn detection_key(&self) -> Option<String> {
        if !self.is_success() {
            return None;
        }
        let mut names = self.entity_names();
        match names.len() {
            0 => None,
            1 => Some(names[0].to_string()),
            _ => {
                names.sort_unstable();
                Some(names.join("_"))
            }
        }
    }
}

fn alternatives_of(set: &DetectionSet, entity: &MatchCandidate, limit: usize) -> Vec<Alternative> {
    set.alternatives_for(&entity.canonical_name, limit)
        .iter()
        .map(Alternative::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchKind;
    use crate::preprocessing::Variant;

    fn candidate(name: &str, confidence: f32) -> MatchCandidate {
        MatchCandidate {
            canonical_name: name.to_string(),
            similarity: confidence / 0.9,
            match_kind: MatchKind::FullText,
            matched_text: name.to_string(),
            variant: Variant::Enhanced,
            combined_confidence: confidence,
        }
    }

    fn set(entities: &[(&str, f32)], considered: &[(&str, f32)]) -> DetectionSet {
        DetectionSet {
            entities: entities.iter().map(|&(n, c)| candidate(n, c)).collect(),
            considered: considered.iter().map(|&(n, c)| candidate(n, c)).collect(),
        }
    }

    #[test]
    fn test_one_entity_uses_single_shape() {
        let resolution = Ok(set(&[("rattata", 0.9)], &[("rattata", 0.9), ("rattatac", 0.79)]));

        let result = AnalysisResult::from_resolution(resolution, 3, 3);

        let AnalysisResult::Single(single) = &result else {
            panic!("expected single result, got {:?}", result);
        };
        assert!(single.success);
        assert_eq!(single.canonical_name.as_deref(), Some("rattata"));
        assert_eq!(single.alternatives.len(), 1);
        assert_eq!(single.alternatives[0].canonical_name, "rattatac");
        assert_eq!(result.detection_key().as_deref(), Some("rattata"));
    }

    #[test]
    fn test_multi_key_is_sorted_names() {
        let resolution = Ok(set(&[("raichu", 0.9), ("pikachu", 0.8)], &[]));

        let result = AnalysisResult::from_resolution(resolution, 3, 3);

        assert!(matches!(result, AnalysisResult::Multi(ref m) if m.count == 2));
        assert_eq!(result.entity_names(), vec!["raichu", "pikachu"]);
        assert_eq!(result.detection_key().as_deref(), Some("pikachu_raichu"));
    }

    #[test]
    fn test_failure_has_no_key() {
        let result = AnalysisResult::from_resolution(Err(ResolveError::NoText), 3, 3);

        assert!(!result.is_success());
        assert_eq!(result.error(), Some("no text detected"));
        assert_eq!(result.detection_key(), None);
    }

    #[test]
    fn test_failure_shape_follows_max_entities() {
        let single = AnalysisResult::failure("nope", 1);
        let multi = AnalysisResult::failure("nope", 2);

        assert!(matches!(single, AnalysisResult::Single(_)));
        assert!(matches!(multi, AnalysisResult::Multi(_)));
    }

    #[test]
    fn test_serializes_snake_case_fields() {
        let result = AnalysisResult::from_resolution(Ok(set(&[("mew", 0.9)], &[])), 1, 3);

        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["canonical_name"], "mew");
        assert!(json.get("error").is_none());
    }
}
