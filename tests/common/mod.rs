//! Common test utilities and helpers
//!
//! Shared helpers for integration tests.
#![allow(dead_code)]

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::backend::Autodiff;
use burn::optim::{AdamConfig, Optimizer};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::Path;
use std::sync::Arc;

use sentence_rnn::data::Example;
use sentence_rnn::{Learner, RnnType, SentenceRnn, SentenceRnnConfig, Split, SplitDataset, Vocab};

pub type TestBackend = NdArray;
pub type TestTrainBackend = Autodiff<NdArray>;
pub type TestModel = SentenceRnn<TestTrainBackend>;

pub fn test_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

/// Small deterministic model: no dropout anywhere.
pub fn tiny_model_config(vocab_size: usize) -> SentenceRnnConfig {
    SentenceRnnConfig::new(vocab_size)
        .with_rnn_type(RnnType::Gru)
        .with_embedding_size(8)
        .with_hidden_size(8)
        .with_latent_size(4)
        .with_max_sequence_length(6)
        .with_embedding_dropout(0.0)
        .with_word_dropout(0.0)
}

pub fn tiny_model(vocab_size: usize) -> TestModel {
    TestModel::new(&tiny_model_config(vocab_size), &test_device())
}

pub fn learner(model: TestModel) -> Learner<TestTrainBackend, TestModel, impl Optimizer<TestModel, TestTrainBackend>> {
    let optimizer = AdamConfig::new().init::<TestTrainBackend, TestModel>();
    Learner::new(model, optimizer, 1e-2, test_device())
}

/// `n` random sentences drawn from the non-special ids; every row keeps at least one pad.
pub fn random_dataset(split: Split, n: usize, max_len: usize, vocab_size: usize, seed: u64) -> Arc<SplitDataset> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let examples = (0..n)
        .map(|_| {
            let words = rng.gen_range(0..max_len - 1);
            let ids: Vec<usize> = (0..words).map(|_| rng.gen_range(4..vocab_size)).collect();

            let mut input = vec![Vocab::SOS];
            input.extend_from_slice(&ids);
            let mut target = ids;
            target.push(Vocab::EOS);
            let length = input.len();
            input.resize(max_len, Vocab::PAD);
            target.resize(max_len, Vocab::PAD);

            Example { input, target, length }
        })
        .collect();
    Arc::new(SplitDataset::new(split, max_len, examples).expect("valid examples"))
}

pub fn empty_dataset(split: Split) -> Arc<SplitDataset> {
    Arc::new(SplitDataset::new(split, 6, Vec::new()).expect("empty dataset"))
}

/// Writes `ptb.{split}.txt` files into `dir`.
pub fn write_corpus(dir: &Path, train: &[&str], valid: &[&str], test: Option<&[&str]>) {
    let write = |name: &str, lines: &[&str]| {
        std::fs::write(dir.join(name), lines.join("\n")).expect("write corpus file");
    };
    write("ptb.train.txt", train);
    write("ptb.valid.txt", valid);
    if let Some(lines) = test {
        write("ptb.test.txt", lines);
    }
}
