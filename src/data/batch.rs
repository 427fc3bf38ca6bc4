// src/data/batch.rs

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use burn::tensor::{backend::Backend, Int, Tensor};

use super::corpus::{Example, SplitDataset};
use crate::error::{Result, SentenceRnnError};
use crate::helpers::create_batch_tensor;

/// Host-side batch: row-major `[size, max_len]` token ids plus true lengths.
#[derive(Clone, Debug, PartialEq)]
pub struct Batch {
    pub input: Vec<i32>,
    pub target: Vec<i32>,
    pub length: Vec<usize>,
    pub max_len: usize,
}

impl Batch {
    pub fn from_examples(examples: &[&Example]) -> Result<Self> {
        let first = examples
            .first()
            .ok_or_else(|| SentenceRnnError::DataIntegrity("empty batch".into()))?;
        let max_len = first.input.len();

        let mut input = Vec::with_capacity(examples.len() * max_len);
        let mut target = Vec::with_capacity(examples.len() * max_len);
        let mut length = Vec::with_capacity(examples.len());

        for example in examples {
            if example.input.len() != max_len || example.target.len() != max_len {
                return Err(SentenceRnnError::ShapeMismatch {
                    expected: format!("rows of {} tokens", max_len),
                    got: format!("{}/{}", example.input.len(), example.target.len()),
                });
            }
            input.extend(example.input.iter().map(|&t| t as i32));
            target.extend(example.target.iter().map(|&t| t as i32));
            length.push(example.length);
        }

        let batch = Self {
            input,
            target,
            length,
            max_len,
        };
        batch.check_lengths()?;
        Ok(batch)
    }

    pub fn size(&self) -> usize {
        self.length.len()
    }

    /// Longest true length in this batch.
    pub fn max_length(&self) -> usize {
        self.length.iter().copied().max().unwrap_or(0)
    }

    fn check_lengths(&self) -> Result<()> {
        if let Some(&bad) = self.length.iter().find(|&&l| l > self.max_len) {
            return Err(SentenceRnnError::DataIntegrity(format!(
                "length {} exceeds padded length {}",
                bad, self.max_len
            )));
        }
        Ok(())
    }

    /// Checks shapes, lengths and that every id fits the vocabulary.
    pub fn validate(&self, vocab_size: usize) -> Result<()> {
        let cells = self.size() * self.max_len;
        if self.input.len() != cells || self.target.len() != cells {
            return Err(SentenceRnnError::ShapeMismatch {
                expected: format!("{} x {}", self.size(), self.max_len),
                got: format!("{} input / {} target ids", self.input.len(), self.target.len()),
            });
        }
        self.check_lengths()?;
        if let Some(&bad) = self
            .input
            .iter()
            .chain(self.target.iter())
            .find(|&&t| t < 0 || t as usize >= vocab_size)
        {
            return Err(SentenceRnnError::DataIntegrity(format!(
                "token id {} outside vocabulary of {}",
                bad, vocab_size
            )));
        }
        Ok(())
    }

    pub fn to_tensors<B: Backend>(&self, device: &B::Device) -> (Tensor<B, 2, Int>, Tensor<B, 2, Int>) {
        let shape = [self.size(), self.max_len];
        (
            create_batch_tensor::<B>(&self.input, shape, device),
            create_batch_tensor::<B>(&self.target, shape, device),
        )
    }
}

/// Supplies the batches of one split.
pub trait BatchSource {
    fn num_batches(&self) -> usize;

    /// Batches for one pass. `shuffle` asks for a fresh random order.
    fn batches(&self, epoch: usize, shuffle: bool) -> Box<dyn Iterator<Item = Result<Batch>> + '_>;
}

/// Batches over a [`SplitDataset`], optionally prefetched on a worker thread.
pub struct BatchLoader {
    dataset: Arc<SplitDataset>,
    batch_size: usize,
    prefetch: usize,
    seed: Option<u64>,
}

impl BatchLoader {
    pub fn new(dataset: Arc<SplitDataset>, batch_size: usize) -> Self {
        Self {
            dataset,
            batch_size: batch_size.max(1),
            prefetch: 0,
            seed: None,
        }
    }

    /// Queue depth of the single prefetch worker: how many batches it may build ahead
    /// of the consumer. 0 collates inline on the calling thread.
    pub fn with_prefetch(mut self, prefetch: usize) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Fixes the shuffle seed. The epoch index is mixed in so orders still differ per epoch.
    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn dataset(&self) -> &SplitDataset {
        &self.dataset
    }

    pub fn order(&self, epoch: usize, shuffle: bool) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.dataset.len()).collect();
        if shuffle {
            let mut rng = match self.seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64)),
                None => ChaCha8Rng::from_entropy(),
            };
            indices.shuffle(&mut rng);
        }
        indices
    }
}

impl BatchSource for BatchLoader {
    fn num_batches(&self) -> usize {
        self.dataset.len().div_ceil(self.batch_size)
    }

    fn batches(&self, epoch: usize, shuffle: bool) -> Box<dyn Iterator<Item = Result<Batch>> + '_> {
        let order = self.order(epoch, shuffle);
        if self.prefetch == 0 {
            return Box::new(SequentialBatches {
                dataset: &self.dataset,
                order,
                batch_size: self.batch_size,
                cursor: 0,
            });
        }

        let remaining = self.num_batches();
        let (tx, rx) = sync_channel(self.prefetch);
        let dataset = Arc::clone(&self.dataset);
        let batch_size = self.batch_size;
        let handle = std::thread::spawn(move || {
            for chunk in order.chunks(batch_size) {
                if tx.send(collate(&dataset, chunk)).is_err() {
                    break;
                }
            }
        });

        Box::new(PrefetchedBatches {
            rx: Some(rx),
            remaining,
            handle: Some(handle),
        })
    }
}

fn collate(dataset: &SplitDataset, indices: &[usize]) -> Result<Batch> {
    let examples: Vec<&Example> = indices
        .par_iter()
        .map(|&idx| {
            dataset.get(idx).ok_or_else(|| {
                SentenceRnnError::BatchSource(format!("{} has no example {}", dataset.split(), idx))
            })
        })
        .collect::<Result<_>>()?;
    Batch::from_examples(&examples)
}

/// Inline batching in the requested order.
struct SequentialBatches<'a> {
    dataset: &'a SplitDataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for SequentialBatches<'_> {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = collate(self.dataset, &self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }
}

/// Batches built ahead on a single worker thread, at most `prefetch` in flight.
/// A worker that stops early is a source failure.
struct PrefetchedBatches {
    rx: Option<Receiver<Result<Batch>>>,
    remaining: usize,
    handle: Option<JoinHandle<()>>,
}

impl PrefetchedBatches {
    /// Disconnects the channel so a blocked worker wakes up, then waits for it.
    fn shutdown(&mut self) {
        self.rx = None;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("prefetch worker panicked");
            }
        }
    }
}

impl Iterator for PrefetchedBatches {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            self.shutdown();
            return None;
        }
        self.remaining -= 1;
        let received = self.rx.as_ref().and_then(|rx| rx.recv().ok());
        match received {
            Some(batch) => Some(batch),
            None => {
                self.remaining = 0;
                self.shutdown();
                Some(Err(SentenceRnnError::BatchSource(
                    "prefetch worker stopped before the end of the split".into(),
                )))
            }
        }
    }
}

impl Drop for PrefetchedBatches {
    fn drop(&mut self) {
        self.shutdown();
    }
}
