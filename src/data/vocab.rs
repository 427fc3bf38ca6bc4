// src/data/vocab.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{Result, SentenceRnnError};

/// Word-level vocabulary with the four reserved tokens at fixed ids.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Vocab {
    w2i: HashMap<String, usize>,
    i2w: Vec<String>,
}

impl Vocab {
    pub const PAD_TOKEN: &'static str = "<pad>";
    pub const UNK_TOKEN: &'static str = "<unk>";
    pub const SOS_TOKEN: &'static str = "<sos>";
    pub const EOS_TOKEN: &'static str = "<eos>";

    pub const PAD: usize = 0;
    pub const UNK: usize = 1;
    pub const SOS: usize = 2;
    pub const EOS: usize = 3;

    fn special_tokens() -> [&'static str; 4] {
        [Self::PAD_TOKEN, Self::UNK_TOKEN, Self::SOS_TOKEN, Self::EOS_TOKEN]
    }

    /// Builds the vocabulary from tokenized sentences.
    ///
    /// A word is kept when it occurs strictly more than `min_occ` times.
    /// Ids follow first occurrence so the same corpus always yields the same ids.
    pub fn build<'a, I>(sentences: I, min_occ: usize) -> Self
    where
        I: IntoIterator<Item = &'a Vec<String>>,
    {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();

        for sentence in sentences {
            for word in sentence {
                let count = counts.entry(word.as_str()).or_insert_with(|| {
                    order.push(word.as_str());
                    0
                });
                *count += 1;
            }
        }

        let mut i2w: Vec<String> = Self::special_tokens().iter().map(|s| s.to_string()).collect();
        for word in order {
            if counts[word] > min_occ && !Self::special_tokens().contains(&word) {
                i2w.push(word.to_string());
            }
        }

        Self::from_words(i2w)
    }

    fn from_words(i2w: Vec<String>) -> Self {
        let w2i = i2w.iter().enumerate().map(|(i, w)| (w.clone(), i)).collect();
        Self { w2i, i2w }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|source| SentenceRnnError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let vocab: Vocab = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            SentenceRnnError::CacheCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        vocab.check(path)?;
        Ok(vocab)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| SentenceRnnError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::to_writer(BufWriter::new(file), self).map_err(|e| {
            SentenceRnnError::FileWrite {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::Other, e),
            }
        })
    }

    fn check(&self, path: &Path) -> Result<()> {
        let corrupt = |reason: String| SentenceRnnError::CacheCorrupt {
            path: path.to_path_buf(),
            reason,
        };
        if self.i2w.len() != self.w2i.len() {
            return Err(corrupt(format!(
                "{} words but {} ids",
                self.i2w.len(),
                self.w2i.len()
            )));
        }
        for (idx, token) in Self::special_tokens().iter().enumerate() {
            if self.w2i.get(*token) != Some(&idx) {
                return Err(corrupt(format!("{} is not at id {}", token, idx)));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.i2w.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2w.is_empty()
    }

    pub fn index(&self, word: &str) -> usize {
        self.w2i.get(word).copied().unwrap_or(Self::UNK)
    }

    pub fn word(&self, idx: usize) -> Option<&str> {
        self.i2w.get(idx).map(String::as_str)
    }

    /// Renders ids back to text, stopping at the first padding id.
    pub fn decode(&self, ids: &[usize]) -> String {
        ids.iter()
            .take_while(|&&id| id != Self::PAD)
            .map(|&id| self.word(id).unwrap_or(Self::UNK_TOKEN))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sentences(lines: &[&str]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|l| l.split_whitespace().map(String::from).collect())
            .collect()
    }

    #[test]
    fn test_special_tokens_have_fixed_ids() {
        let vocab = Vocab::build(&sentences(&["a b", "a"]), 0);
        assert_eq!(vocab.index("<pad>"), Vocab::PAD);
        assert_eq!(vocab.index("<unk>"), Vocab::UNK);
        assert_eq!(vocab.index("<sos>"), Vocab::SOS);
        assert_eq!(vocab.index("<eos>"), Vocab::EOS);
    }

    #[test]
    fn test_min_occ_is_strict() {
        let vocab = Vocab::build(&sentences(&["a b c", "a b", "a"]), 1);
        // a=3, b=2, c=1
        assert_eq!(vocab.len(), 4 + 2);
        assert_eq!(vocab.index("a"), 4);
        assert_eq!(vocab.index("b"), 5);
        assert_eq!(vocab.index("c"), Vocab::UNK);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        let vocab = Vocab::build(&sentences(&["the cat sat", "the dog"]), 0);
        vocab.save(&path).unwrap();

        let loaded = Vocab::load(&path).unwrap();
        assert_eq!(loaded.len(), vocab.len());
        assert_eq!(loaded.index("dog"), vocab.index("dog"));
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            Vocab::load(&path),
            Err(SentenceRnnError::CacheCorrupt { .. })
        ));
    }

    #[test]
    fn test_decode_stops_at_padding() {
        let vocab = Vocab::build(&sentences(&["hello world"]), 0);
        let ids = [Vocab::SOS, vocab.index("hello"), vocab.index("world"), Vocab::PAD, 4];
        assert_eq!(vocab.decode(&ids), "<sos> hello world");
    }
}
