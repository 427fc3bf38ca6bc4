//! sentence-rnn: recurrent sentence autoencoder with a masked-NLL training loop

pub mod backend;
pub mod commands;
pub mod data;
pub mod error;
pub mod helpers;
pub mod logger;
pub mod model;
pub mod train;
pub mod utils;

// Main re-exports
pub use backend::backend_name;
pub use data::{Batch, BatchLoader, BatchSource, Corpus, CorpusConfig, Split, SplitDataset, Vocab};
pub use error::{Result, SentenceRnnError};
pub use logger::{CsvTelemetry, EpochMetrics, MemoryTelemetry, RunSummary, TelemetrySink};
pub use model::{
    masked_nll, BestValidationCheckpointer, CheckpointSink, Learner, ModelMode, RnnType,
    SentenceRnn, SentenceRnnConfig, SequenceModel, TrainingConfig,
};
pub use train::{DriverConfig, EpochDriver, RunState};
