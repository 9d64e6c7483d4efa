use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

use super::normalize::normalize;

/// One known entity and the display strings it may appear under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VocabularyEntry {
    pub canonical: String,
    pub variants: Vec<String>,
}

/// Canonical identifiers and their display strings, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabularyTable {
    entries: Vec<VocabularyEntry>,
    /// canonical name -> position in `entries`
    positions: HashMap<String, usize>,
}

/// On-disk vocabulary formats
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum VocabularySource {
    /// `["Pikachu", "Dracaufeu", ...]`, each string its own canonical name
    DisplayStrings(Vec<String>),
    /// `{"charizard": ["Charizard", "Dracaufeu", "リザードン"], ...}`
    Translations(std::collections::BTreeMap<String, Vec<String>>),
}

impl VocabularyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table where every display string is its own canonical name.
    /// Repeated strings are kept once.
    pub fn from_display_strings<I, S>(display_strings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for name in display_strings {
            let name = name.into();
            if name.trim().is_empty() || table.contains(&name) {
                continue;
            }
            table.push_entry(name);
        }
        table
    }

    /// Add display strings for `canonical`, creating the entry if needed
    pub fn insert<I, S>(&mut self, canonical: impl Into<String>, variants: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let canonical = canonical.into();
        let position = match self.positions.get(&canonical) {
            Some(&position) => position,
            None => self.push_entry(canonical),
        };

        let entry = &mut self.entries[position];
        let mut seen: HashSet<String> = entry.variants.iter().cloned().collect();
        for variant in variants {
            let variant = variant.into();
            if variant != entry.canonical && seen.insert(variant.clone()) {
                entry.variants.push(variant);
            }
        }
    }

    fn push_entry(&mut self, canonical: String) -> usize {
        let position = self.entries.len();
        self.positions.insert(canonical.clone(), position);
        self.entries.push(VocabularyEntry {
            canonical,
            variants: Vec::new(),
        });
        position
    }

    pub fn from_source(source: VocabularySource) -> Self {
        match source {
            VocabularySource::DisplayStrings(names) => Self::from_display_strings(names),
            VocabularySource::Translations(map) => {
                let mut table = Self::new();
                for (canonical, variants) in map {
                    table.insert(canonical, variants);
                }
                table
            }
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ScanError> {
        let source: VocabularySource = serde_json::from_str(json)
            .map_err(|e| ScanError::VocabularyError(format!("Failed to parse vocabulary: {}", e)))?;
        Ok(Self::from_source(source))
    }

    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ScanError::VocabularyError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn contains(&self, canonical: &str) -> bool {
        self.positions.contains_key(canonical)
    }

    pub fn entries(&self) -> &[VocabularyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalized display string -> canonical name lookup.
///
/// Built once from a [`VocabularyTable`] and never mutated; a new table
/// means a new index. On collisions the first writer wins.
#[derive(Debug, Clone, Default)]
pub struct NormalizedIndex {
    /// (normalized key, canonical name) in build order
    keys: Vec<(String, String)>,
    lookup: HashMap<String, usize>,
}

impl NormalizedIndex {
    pub fn build(table: &VocabularyTable) -> Self {
        let mut index = Self::default();

        for entry in table.entries() {
            let strings = std::iter::once(&entry.canonical).chain(entry.variants.iter());
            for display in strings {
                let key = normalize(display);
                if key.is_empty() || index.lookup.contains_key(&key) {
                    continue;
                }
                index.lookup.insert(key.clone(), index.keys.len());
                index.keys.push((key, entry.canonical.clone()));
            }
        }

        index
    }

    pub fn canonical_for(&self, normalized: &str) -> Option<&str> {
        self.lookup
            .get(normalized)
            .map(|&i| self.keys[i].1.as_str())
    }

    /// (normalized key, canonical name) pairs in build order
    pub fn keys(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys.iter().map(|(k, c)| (k.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
