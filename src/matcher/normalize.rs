//! Text normalization and OCR clean-up
//!
//! `normalize` produces the comparison key used by the vocabulary index;
//! `clean_text` strips the noise OCR typically reads around a name plate
//! (dex numbers, level and CP tokens, stray symbols).

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Glyphs that do not decompose into ASCII under NFD
const GLYPH_FOLDS: &[(char, &str)] = &[
    ('œ', "oe"),
    ('æ', "ae"),
    ('ß', "ss"),
    ('ø', "o"),
    ('ł', "l"),
    ('đ', "d"),
    ('♀', "f"),
    ('♂', "m"),
];

/// Characters OCR commonly reads in place of letters
const OCR_CONFUSIONS: &[(char, char)] = &[('|', 'l'), ('¡', 'i'), ('§', 's')];

/// Normalize a name for comparison.
///
/// Lowercases, folds ligatures and gender symbols, strips diacritics, and
/// drops everything that is not a letter or digit (spaces, punctuation,
/// apostrophes, hyphens). `normalize(normalize(s)) == normalize(s)`.
pub fn normalize(s: &str) -> String {
    // Folds run after decomposition: "ǿ" only becomes "ø" once its accent is gone
    let lowered = s.to_lowercase();
    let decomposed = lowered
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase);

    let mut folded = String::with_capacity(s.len());
    for c in decomposed {
        match GLYPH_FOLDS.iter().find(|(glyph, _)| *glyph == c) {
            Some((_, ascii)) => folded.push_str(ascii),
            None => folded.push(c),
        }
    }

    folded
        .nfd()
        .filter(|c| !is_combining_mark(*c) && c.is_alphanumeric())
        .collect()
}

struct CleanupRules {
    dex_number: Regex,
    level: Regex,
    combat_power: Regex,
    symbols: Regex,
    digits: Regex,
    whitespace: Regex,
}

fn rules() -> &'static CleanupRules {
    static RULES: OnceLock<CleanupRules> = OnceLock::new();
    RULES.get_or_init(|| CleanupRules {
        dex_number: Regex::new(r"(?i)^\s*(n°|no\.?|#)\s*\d+\s*").expect("valid dex pattern"),
        level: Regex::new(r"(?i)\b(niveau|nivea|niv|lvl|lv)\.?\s*\d+\b").expect("valid level pattern"),
        combat_power: Regex::new(r"(?i)\b(cp|pc)\s*\d+\b").expect("valid cp pattern"),
        symbols: Regex::new(r"[^\w\s♀♂.\-]").expect("valid symbol pattern"),
        digits: Regex::new(r"\d+").expect("valid digit pattern"),
        whitespace: Regex::new(r"\s+").expect("valid whitespace pattern"),
    })
}

/// Remove OCR noise around names while keeping word boundaries.
///
/// "N°006 Charizard Lv.50" becomes "Charizard".
pub fn clean_text(text: &str) -> String {
    let rules = rules();

    let unconfused: String = text
        .chars()
        .map(|c| {
            OCR_CONFUSIONS
                .iter()
                .find(|(wrong, _)| *wrong == c)
                .map_or(c, |(_, right)| *right)
        })
        .collect();

    let cleaned = rules.dex_number.replace(&unconfused, "");
    let cleaned = rules.level.replace_all(&cleaned, " ");
    let cleaned = rules.combat_power.replace_all(&cleaned, " ");
    let cleaned = rules.symbols.replace_all(&cleaned, "");
    let cleaned = rules.digits.replace_all(&cleaned, "");
    let cleaned = rules.whitespace.replace_all(&cleaned, " ");

    cleaned.trim().to_string()
}

/// Words of a cleaned text, in reading order
pub fn words(cleaned: &str) -> Vec<&str> {
    cleaned.split_whitespace().collect()
}
