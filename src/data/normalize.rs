// src/data/normalize.rs

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").expect("static token pattern"));

/// Sentence normalizer for the corpus lines.
pub struct SentenceNormalizer {
    lowercase: bool,
}

impl SentenceNormalizer {
    pub fn new() -> Self {
        Self { lowercase: true }
    }

    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.lowercase = lowercase;
        self
    }

    pub fn normalize(&self, text: &str) -> String {
        // 1. Unicode NFC
        let mut result: String = text.nfc().collect();

        // 2. Curly quotes and dashes
        result = self.normalize_punctuation(&result);

        // 3. Control characters, keeping tabs and newlines as separators
        result = result
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .collect();

        if self.lowercase {
            result = result.to_lowercase();
        }

        result
    }

    /// Normalizes and splits on whitespace.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = self.normalize(text);
        TOKEN
            .find_iter(&normalized)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    fn normalize_punctuation(&self, text: &str) -> String {
        text.replace(['\u{201C}', '\u{201D}'], "\"")
            .replace(['\u{2018}', '\u{2019}'], "'")
            .replace(['\u{2013}', '\u{2014}'], "-")
            .replace('\u{00A0}', " ")
    }
}

impl Default for SentenceNormalizer {
    fn default() -> Self {
        Self::new()
    }
}
