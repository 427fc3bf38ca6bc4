// src/model/checkpoint.rs
//! Model checkpoints kept on validation improvement

use burn::{
    module::Module,
    record::CompactRecorder,
    tensor::backend::Backend,
};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::error::{Result, SentenceRnnError};

/// Receives the model after each validation pass. Returns where it was saved, if it was.
pub trait CheckpointSink<B: Backend, M: Module<B>> {
    fn offer(&mut self, model: &M, epoch: usize, valid_loss: f64) -> Result<Option<PathBuf>>;
}

/// Saves `RNN-E{epoch+1}` whenever the validation loss beats the best seen so far.
pub struct BestValidationCheckpointer<B: Backend> {
    dir: PathBuf,
    best: Option<f64>,
    _backend: PhantomData<B>,
}

impl<B: Backend> BestValidationCheckpointer<B> {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SentenceRnnError::FileWrite {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            best: None,
            _backend: PhantomData,
        })
    }

    pub fn best(&self) -> Option<f64> {
        self.best
    }

    pub fn checkpoint_path(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("RNN-E{}", epoch + 1))
    }

    fn improves(&self, loss: f64) -> bool {
        loss.is_finite() && self.best.map_or(true, |best| loss < best)
    }
}

impl<B: Backend, M: Module<B>> CheckpointSink<B, M> for BestValidationCheckpointer<B> {
    fn offer(&mut self, model: &M, epoch: usize, valid_loss: f64) -> Result<Option<PathBuf>> {
        if !self.improves(valid_loss) {
            return Ok(None);
        }

        let path = self.checkpoint_path(epoch);
        model
            .clone()
            .save_file(&path, &CompactRecorder::new())
            .map_err(|e| SentenceRnnError::CheckpointSave(format!("{}: {}", path.display(), e)))?;

        let meta = format!("epoch={}\nvalid_loss={:.6}\n", epoch + 1, valid_loss);
        let meta_path = path.with_extension("meta");
        std::fs::write(&meta_path, meta).map_err(|source| SentenceRnnError::FileWrite {
            path: meta_path,
            source,
        })?;

        self.best = Some(valid_loss);
        tracing::info!("Model saved at {}", path.display());
        Ok(Some(path))
    }
}

/// Loads weights saved by [`BestValidationCheckpointer`] into `model`.
pub fn load_checkpoint<B: Backend, M: Module<B>>(model: M, path: &Path, device: &B::Device) -> Result<M> {
    model
        .load_file(path, &CompactRecorder::new(), device)
        .map_err(|e| SentenceRnnError::CheckpointLoad(format!("{}: {}", path.display(), e)))
}
