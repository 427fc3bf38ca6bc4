// src/data/mod.rs

mod batch;
mod corpus;
mod normalize;
mod split;
mod vocab;

pub use batch::{Batch, BatchLoader, BatchSource};
pub use corpus::{Corpus, CorpusConfig, Example, SplitDataset};
pub use normalize::SentenceNormalizer;
pub use split::Split;
pub use vocab::Vocab;
