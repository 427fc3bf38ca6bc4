//! SequenceModel trait and the training/evaluation mode switch
//!
//! The epoch driver and the learner only talk to models through this trait,
//! so tests can swap in tiny models.

use burn::{
    module::Module,
    tensor::{backend::Backend, Int, Tensor},
};

use crate::data::Split;

/// Global mode of the model for a whole split.
///
/// `Training` enables the stochastic paths (word dropout, embedding dropout);
/// `Evaluation` disables them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModelMode {
    #[default]
    Training,
    Evaluation,
}

impl ModelMode {
    pub fn for_split(split: Split) -> Self {
        if split.is_train() {
            ModelMode::Training
        } else {
            ModelMode::Evaluation
        }
    }

    pub fn is_training(&self) -> bool {
        matches!(self, ModelMode::Training)
    }
}

/// Differentiable map from padded token ids to per-step log-probabilities.
pub trait SequenceModel<B: Backend>: Module<B> + Clone + Send + Sized + 'static {
    /// Input: `[batch, max_len]` token ids and the true length of every row.
    /// Output: `[batch, max(lengths), vocab_size]` log-probabilities.
    fn log_probs(&self, input: Tensor<B, 2, Int>, lengths: &[usize], mode: ModelMode) -> Tensor<B, 3>;

    fn vocab_size(&self) -> usize;

    /// Token id whose target positions are never scored.
    fn pad_idx(&self) -> usize;
}
