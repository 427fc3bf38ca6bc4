// src/data/corpus.rs
//! Sentence corpus: `ptb.{split}.txt` files turned into padded examples,
//! with JSON caches next to the text.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::normalize::SentenceNormalizer;
use super::split::Split;
use super::vocab::Vocab;
use crate::error::{Result, SentenceRnnError};

/// One padded example. `input` starts with `<sos>`, `target` ends with `<eos>`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Example {
    pub input: Vec<usize>,
    pub target: Vec<usize>,
    pub length: usize,
}

impl Example {
    /// Encodes a tokenized sentence, truncating to `max_len - 1` words.
    pub fn encode(words: &[String], vocab: &Vocab, max_len: usize) -> Self {
        let ids: Vec<usize> = words
            .iter()
            .take(max_len.saturating_sub(1))
            .map(|w| vocab.index(w))
            .collect();

        let mut input = Vec::with_capacity(max_len);
        input.push(Vocab::SOS);
        input.extend_from_slice(&ids);

        let mut target = ids;
        target.push(Vocab::EOS);

        let length = input.len();
        input.resize(max_len, Vocab::PAD);
        target.resize(max_len, Vocab::PAD);

        Self {
            input,
            target,
            length,
        }
    }
}

/// Examples of one split, all padded to the same length.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SplitDataset {
    split: Split,
    max_sequence_length: usize,
    examples: Vec<Example>,
}

impl SplitDataset {
    pub fn new(split: Split, max_sequence_length: usize, examples: Vec<Example>) -> Result<Self> {
        let dataset = Self {
            split,
            max_sequence_length,
            examples,
        };
        dataset.check(None)?;
        Ok(dataset)
    }

    pub fn from_sentences(
        split: Split,
        sentences: &[Vec<String>],
        vocab: &Vocab,
        max_sequence_length: usize,
    ) -> Self {
        let examples = sentences
            .par_iter()
            .map(|words| Example::encode(words, vocab, max_sequence_length))
            .collect();
        Self {
            split,
            max_sequence_length,
            examples,
        }
    }

    pub fn split(&self) -> Split {
        self.split
    }

    pub fn max_sequence_length(&self) -> usize {
        self.max_sequence_length
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Example> {
        self.examples.get(idx)
    }

    /// Number of real (non-padding) target tokens.
    pub fn num_tokens(&self) -> usize {
        self.examples.iter().map(|e| e.length).sum()
    }

    fn check(&self, vocab_size: Option<usize>) -> Result<()> {
        for (idx, example) in self.examples.iter().enumerate() {
            if example.input.len() != self.max_sequence_length
                || example.target.len() != self.max_sequence_length
            {
                return Err(SentenceRnnError::DataIntegrity(format!(
                    "{} example {} is not padded to {}",
                    self.split, idx, self.max_sequence_length
                )));
            }
            if example.length > self.max_sequence_length {
                return Err(SentenceRnnError::DataIntegrity(format!(
                    "{} example {} has length {} > {}",
                    self.split, idx, example.length, self.max_sequence_length
                )));
            }
            if let Some(vocab_size) = vocab_size {
                let out_of_range = example
                    .input
                    .iter()
                    .chain(example.target.iter())
                    .any(|&id| id >= vocab_size);
                if out_of_range {
                    return Err(SentenceRnnError::DataIntegrity(format!(
                        "{} example {} has token ids outside a vocabulary of {}",
                        self.split, idx, vocab_size
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn load(path: &Path, vocab_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|source| SentenceRnnError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset: SplitDataset = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            SentenceRnnError::CacheCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        dataset.check(Some(vocab_size))?;
        Ok(dataset)
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
}

/// How to find or (re)build the corpus.
#[derive(Clone, Debug)]
pub struct CorpusConfig {
    pub data_dir: PathBuf,
    pub create_data: bool,
    pub max_sequence_length: usize,
    pub min_occ: usize,
}

/// Vocabulary plus one dataset per requested split.
pub struct Corpus {
    pub vocab: Vocab,
    datasets: Vec<Arc<SplitDataset>>,
}

impl Corpus {
    pub fn text_path(data_dir: &Path, split: Split) -> PathBuf {
        data_dir.join(format!("ptb.{}.txt", split.name()))
    }

    pub fn cache_path(data_dir: &Path, split: Split) -> PathBuf {
        data_dir.join(format!("ptb.{}.json", split.name()))
    }

    pub fn vocab_path(data_dir: &Path) -> PathBuf {
        data_dir.join("ptb.vocab.json")
    }

    /// Loads caches, rebuilding whatever is missing or stale.
    ///
    /// The vocabulary always comes from the train split. Rebuilding it
    /// invalidates every split cache.
    pub fn open(config: &CorpusConfig, splits: &[Split]) -> Result<Self> {
        let normalizer = SentenceNormalizer::new();
        let vocab_path = Self::vocab_path(&config.data_dir);
        let rebuild_all = config.create_data || !vocab_path.exists();

        let mut train_sentences = None;
        let vocab = if rebuild_all {
            tracing::info!("Creating new vocabulary from train split");
            let sentences = read_sentences(&Self::text_path(&config.data_dir, Split::Train), &normalizer)?;
            let vocab = Vocab::build(&sentences, config.min_occ);
            vocab.save(&vocab_path)?;
            tracing::info!("Vocabulary of {} words written to {:?}", vocab.len(), vocab_path);
            train_sentences = Some(sentences);
            vocab
        } else {
            Vocab::load(&vocab_path)?
        };

        let mut datasets = Vec::with_capacity(splits.len());
        for &split in splits {
            let cache = Self::cache_path(&config.data_dir, split);
            let cached = if rebuild_all || !cache.exists() {
                None
            } else {
                let dataset = SplitDataset::load(&cache, vocab.len())?;
                if dataset.max_sequence_length() == config.max_sequence_length {
                    Some(dataset)
                } else {
                    tracing::info!(
                        "Cache {:?} uses max length {}, rebuilding for {}",
                        cache,
                        dataset.max_sequence_length(),
                        config.max_sequence_length
                    );
                    None
                }
            };

            let dataset = match cached {
                Some(dataset) => dataset,
                None => {
                    let reused = if split.is_train() { train_sentences.take() } else { None };
                    let sentences = match reused {
                        Some(sentences) => sentences,
                        None => read_sentences(&Self::text_path(&config.data_dir, split), &normalizer)?,
                    };
                    let dataset = SplitDataset::from_sentences(
                        split,
                        &sentences,
                        &vocab,
                        config.max_sequence_length,
                    );
                    dataset.save(&cache)?;
                    tracing::info!("{} split: {} examples cached at {:?}", split.tag(), dataset.len(), cache);
                    dataset
                }
            };
            datasets.push(Arc::new(dataset));
        }

        Ok(Self { vocab, datasets })
    }

    pub fn dataset(&self, split: Split) -> Option<Arc<SplitDataset>> {
        self.datasets.iter().find(|d| d.split() == split).cloned()
    }

    pub fn datasets(&self) -> &[Arc<SplitDataset>] {
        &self.datasets
    }
}

/// One sentence per non-blank line.
fn read_sentences(path: &Path, normalizer: &SentenceNormalizer) -> Result<Vec<Vec<String>>> {
    if !path.exists() {
        return Err(SentenceRnnError::FileNotFound(path.to_path_buf()));
    }
    let text = std::fs::read_to_string(path).map_err(|source| SentenceRnnError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let lines: Vec<&str> = text.lines().collect();
    Ok(lines
        .par_iter()
        .map(|line| normalizer.tokenize(line))
        .filter(|words| !words.is_empty())
        .collect())
}
