use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    tensor::backend::AutodiffBackend,
};
use std::marker::PhantomData;

use super::loss::{loss_value, masked_nll};
use super::traits::{ModelMode, SequenceModel};
use crate::data::Batch;
use crate::error::{Result, SentenceRnnError};

/// Owns the model and its optimizer; runs single train and eval steps.
pub struct Learner<B, M, O>
where
    B: AutodiffBackend,
    M: SequenceModel<B> + AutodiffModule<B>,
    M::InnerModule: SequenceModel<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    model: M,
    optimizer: O,
    learning_rate: f64,
    mode: ModelMode,
    last_forward_mode: Option<ModelMode>,
    device: B::Device,
    _backend: PhantomData<B>,
}

impl<B, M, O> Learner<B, M, O>
where
    B: AutodiffBackend,
    M: SequenceModel<B> + AutodiffModule<B>,
    M::InnerModule: SequenceModel<B::InnerBackend>,
    O: Optimizer<M, B>,
{
    pub fn new(model: M, optimizer: O, learning_rate: f64, device: B::Device) -> Self {
        Self {
            model,
            optimizer,
            learning_rate,
            mode: ModelMode::Training,
            last_forward_mode: None,
            device,
            _backend: PhantomData,
        }
    }

    /// Switches stochastic layers on or off for every following forward pass.
    pub fn set_mode(&mut self, mode: ModelMode) {
        self.mode = mode;
    }

    pub fn mode(&self) -> ModelMode {
        self.mode
    }

    /// Mode of the most recent forward pass, if any ran.
    pub fn last_forward_mode(&self) -> Option<ModelMode> {
        self.last_forward_mode
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn device(&self) -> &B::Device {
        &self.device
    }

    /// Gradient-free copy of the current weights.
    pub fn inference_model(&self) -> M::InnerModule {
        self.model.valid()
    }

    /// Forward, masked loss, fresh gradients, one optimizer step.
    pub fn train_step(&mut self, batch: &Batch) -> Result<f64> {
        if !self.mode.is_training() {
            return Err(SentenceRnnError::ConfigError(
                "train_step requires training mode".into(),
            ));
        }
        batch.validate(self.model.vocab_size())?;

        let (input, target) = batch.to_tensors::<B>(&self.device);
        let logp = self.model.log_probs(input, &batch.length, self.mode);
        self.last_forward_mode = Some(self.mode);

        let loss = masked_nll(logp, target, &batch.length, self.model.pad_idx())?;
        let value = loss_value(loss.clone());

        let grads = GradientsParams::from_grads(loss.backward(), &self.model);
        self.model = self
            .optimizer
            .step(self.learning_rate, self.model.clone(), grads);

        Ok(value)
    }

    /// Loss of `batch` under `model` (see [`Self::inference_model`]); no parameter changes.
    pub fn eval_step(&mut self, model: &M::InnerModule, batch: &Batch) -> Result<f64> {
        batch.validate(model.vocab_size())?;

        let (input, target) = batch.to_tensors::<B::InnerBackend>(&self.device);
        let logp = model.log_probs(input, &batch.length, self.mode);
        self.last_forward_mode = Some(self.mode);

        let loss = masked_nll(logp, target, &batch.length, model.pad_idx())?;
        Ok(loss_value(loss))
    }
}
