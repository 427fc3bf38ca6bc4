mod cell;
mod checkpoint;
mod config;
pub mod loss;
mod sentence_rnn;
mod trainer;
mod traits;

pub use cell::{CellState, RecurrentCell, RecurrentLayer};
pub use checkpoint::{load_checkpoint, BestValidationCheckpointer, CheckpointSink};
pub use config::{RnnType, SentenceRnnConfig, TrainingConfig};
pub use loss::{loss_value, masked_nll};
pub use sentence_rnn::SentenceRnn;
pub use trainer::Learner;
pub use traits::{ModelMode, SequenceModel};
