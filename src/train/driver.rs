//! Epoch driver: epochs × splits, mode switching, updates and reporting

use burn::{module::AutodiffModule, optim::Optimizer, tensor::backend::AutodiffBackend};
use std::time::Instant;

use super::state::RunState;
use crate::data::{BatchSource, Split};
use crate::error::{Result, SentenceRnnError};
use crate::logger::{EpochMetrics, RunSummary, TelemetrySink};
use crate::model::{CheckpointSink, Learner, ModelMode, SequenceModel};

#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub epochs: usize,
    pub print_every: usize,
}

impl DriverConfig {
    pub fn new(epochs: usize, print_every: usize) -> Self {
        Self {
            epochs,
            print_every: print_every.max(1),
        }
    }
}

pub struct EpochDriver<'a, B, M>
where
    B: AutodiffBackend,
    M: SequenceModel<B> + AutodiffModule<B>,
{
    config: DriverConfig,
    telemetry: Option<&'a mut dyn TelemetrySink>,
    checkpoints: Option<&'a mut dyn CheckpointSink<B, M>>,
}

impl<'a, B, M> EpochDriver<'a, B, M>
where
    B: AutodiffBackend,
    M: SequenceModel<B> + AutodiffModule<B>,
    M::InnerModule: SequenceModel<B::InnerBackend>,
{
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            telemetry: None,
            checkpoints: None,
        }
    }

    pub fn with_telemetry(mut self, sink: &'a mut dyn TelemetrySink) -> Self {
        self.telemetry = Some(sink);
        self
    }

    /// Offered the model after every validation pass.
    pub fn with_checkpoints(mut self, sink: &'a mut dyn CheckpointSink<B, M>) -> Self {
        self.checkpoints = Some(sink);
        self
    }

    /// Runs every epoch over `splits`, in the given order.
    pub fn run<O: Optimizer<M, B>>(
        &mut self,
        learner: &mut Learner<B, M, O>,
        splits: &[(Split, &dyn BatchSource)],
    ) -> Result<RunSummary> {
        let mut state = RunState::new();
        let mut summary = RunSummary::default();

        for epoch in 0..self.config.epochs {
            state.begin_epoch(epoch);

            for &(split, source) in splits {
                let metrics = self.run_split(learner, split, source, &mut state)?;

                if split == Split::Valid {
                    if let Some(sink) = self.checkpoints.as_deref_mut() {
                        sink.offer(learner.model(), epoch, metrics.mean_loss)?;
                    }
                }
                summary.epochs.push(metrics);
            }
        }

        summary.total_steps = state.step;
        Ok(summary)
    }

    /// One pass over `source` at `state.epoch`.
    ///
    /// Train updates the parameters after every batch; other splits only score.
    pub fn run_split<O: Optimizer<M, B>>(
        &mut self,
        learner: &mut Learner<B, M, O>,
        split: Split,
        source: &dyn BatchSource,
        state: &mut RunState,
    ) -> Result<EpochMetrics> {
        let num_batches = source.num_batches();
        if num_batches == 0 {
            return Err(SentenceRnnError::DatasetEmpty {
                split: split.name().to_string(),
            });
        }

        let tag = split.tag();
        let batch_tag = format!("{}/NLL_Loss", tag);
        learner.set_mode(ModelMode::for_split(split));
        state.begin_split();

        let started = Instant::now();
        let inference = (!split.is_train()).then(|| learner.inference_model());

        for (iteration, batch) in source.batches(state.epoch, split.is_train()).enumerate() {
            let batch = batch?;

            let (loss, step) = match &inference {
                None => {
                    let loss = learner.train_step(&batch)?;
                    (loss, state.advance_step())
                }
                Some(model) => (
                    learner.eval_step(model, &batch)?,
                    state.epoch * num_batches + iteration,
                ),
            };

            if !loss.is_finite() {
                tracing::warn!("{} batch {} produced a non-finite loss ({})", tag, iteration, loss);
            }
            state.record(loss);

            if let Some(sink) = self.telemetry.as_deref_mut() {
                sink.scalar(&batch_tag, loss, step);
            }

            if (iteration + 1) % self.config.print_every == 0 || iteration + 1 == num_batches {
                tracing::info!(
                    "{} Batch {:04}/{}, Loss {:9.4}",
                    tag,
                    iteration,
                    num_batches - 1,
                    loss
                );
            }
        }

        let mean_loss = state.mean_loss().ok_or_else(|| SentenceRnnError::DatasetEmpty {
            split: split.name().to_string(),
        })?;
        let mut metrics = EpochMetrics::new(split, state.epoch, mean_loss, state.losses.len());

        tracing::info!(
            "{} Epoch {:02}/{}, Mean Loss: {:.4}, PPL: {:.4}",
            tag,
            state.epoch,
            self.config.epochs,
            metrics.mean_loss,
            metrics.perplexity
        );

        if let Some(sink) = self.telemetry.as_deref_mut() {
            sink.scalar(&format!("{}-Epoch/Loss", tag), metrics.mean_loss, state.epoch);
            sink.scalar(&format!("{}-Epoch/PPL", tag), metrics.perplexity, state.epoch);
        }

        if split.is_train() {
            let secs = started.elapsed().as_secs_f64();
            tracing::info!("Epoch running time: {:.2} seconds.", secs);
            metrics = metrics.with_elapsed(secs);
        }

        Ok(metrics)
    }
}
