//! Epoch Driver Tests
//!
//! Step counting, mode switching, validation side effects and reporting.

mod common;

use common::{TestModel, TestTrainBackend};
use sentence_rnn::helpers::parameter_snapshot;
use sentence_rnn::{
    BatchLoader, BatchSource, CheckpointSink, DriverConfig, EpochDriver, MemoryTelemetry,
    ModelMode, Result, RunState, SentenceRnnError, Split,
};

const VOCAB: usize = 20;

fn splits<'a>(pairs: &[(Split, &'a BatchLoader)]) -> Vec<(Split, &'a dyn BatchSource)> {
    pairs.iter().map(|&(split, loader)| (split, loader as &dyn BatchSource)).collect()
}

fn driver<'a>(epochs: usize) -> EpochDriver<'a, TestTrainBackend, TestModel> {
    EpochDriver::new(DriverConfig::new(epochs, 50))
}

#[test]
fn test_step_counts_every_train_batch() {
    let train = BatchLoader::new(common::random_dataset(Split::Train, 40, 6, VOCAB, 1), 2).with_seed(Some(3));
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 10, 6, VOCAB, 2), 2);
    assert_eq!(train.num_batches(), 20);

    let mut learner = common::learner(common::tiny_model(VOCAB));
    let mut telemetry = MemoryTelemetry::new();
    let summary = driver(3)
        .with_telemetry(&mut telemetry)
        .run(&mut learner, &splits(&[(Split::Train, &train), (Split::Valid, &valid)]))
        .unwrap();

    assert_eq!(summary.total_steps, 60);
    assert_eq!(summary.epochs.len(), 6);

    let train_steps: Vec<usize> = telemetry.series("TRAIN/NLL_Loss").iter().map(|(_, s)| *s).collect();
    assert_eq!(train_steps, (0..60).collect::<Vec<_>>());

    let valid_steps: Vec<usize> = telemetry.series("VALID/NLL_Loss").iter().map(|(_, s)| *s).collect();
    let expected: Vec<usize> = (0..3).flat_map(|e| (0..5).map(move |i| e * 5 + i)).collect();
    assert_eq!(valid_steps, expected);

    let epoch_steps: Vec<usize> = telemetry.series("VALID-Epoch/PPL").iter().map(|(_, s)| *s).collect();
    assert_eq!(epoch_steps, vec![0, 1, 2]);
}

#[test]
fn test_validation_leaves_parameters_bit_identical() {
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 30, 6, VOCAB, 4), 3);
    assert_eq!(valid.num_batches(), 10);

    let mut learner = common::learner(common::tiny_model(VOCAB));
    let before = parameter_snapshot(learner.model());

    let mut state = RunState::new();
    driver(1).run_split(&mut learner, Split::Valid, &valid, &mut state).unwrap();

    let after = parameter_snapshot(learner.model());
    assert_eq!(before.len(), after.len());
    assert!(before.iter().zip(&after).all(|(a, b)| a.to_bits() == b.to_bits()));
    assert_eq!(state.step, 0);
}

#[test]
fn test_validation_is_deterministic() {
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 12, 6, VOCAB, 5), 4);
    let mut learner = common::learner(common::tiny_model(VOCAB));
    let mut driver = driver(1);
    let mut state = RunState::new();

    let first = driver.run_split(&mut learner, Split::Valid, &valid, &mut state).unwrap();
    let second = driver.run_split(&mut learner, Split::Valid, &valid, &mut state).unwrap();
    assert_eq!(first.mean_loss.to_bits(), second.mean_loss.to_bits());
}

#[test]
fn test_mode_follows_split() {
    let train = BatchLoader::new(common::random_dataset(Split::Train, 6, 6, VOCAB, 6), 3);
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 6, 6, VOCAB, 7), 3);
    let mut learner = common::learner(common::tiny_model(VOCAB));
    let mut driver = driver(1);
    let mut state = RunState::new();

    driver.run_split(&mut learner, Split::Train, &train, &mut state).unwrap();
    assert_eq!(learner.last_forward_mode(), Some(ModelMode::Training));

    // Test straight after train: its own forwards must have run in evaluation mode
    driver.run_split(&mut learner, Split::Test, &valid, &mut state).unwrap();
    assert_eq!(learner.mode(), ModelMode::Evaluation);
    assert_eq!(learner.last_forward_mode(), Some(ModelMode::Evaluation));

    driver.run_split(&mut learner, Split::Train, &train, &mut state).unwrap();
    assert_eq!(learner.last_forward_mode(), Some(ModelMode::Training));

    driver.run_split(&mut learner, Split::Valid, &valid, &mut state).unwrap();
    assert_eq!(learner.last_forward_mode(), Some(ModelMode::Evaluation));

    driver.run_split(&mut learner, Split::Train, &train, &mut state).unwrap();
    assert_eq!(learner.last_forward_mode(), Some(ModelMode::Training));
}

#[test]
fn test_perplexity_is_exp_of_mean_batch_loss() {
    let train = BatchLoader::new(common::random_dataset(Split::Train, 9, 6, VOCAB, 8), 4);
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 7, 6, VOCAB, 9), 4);
    let mut learner = common::learner(common::tiny_model(VOCAB));
    let mut telemetry = MemoryTelemetry::new();

    let summary = driver(2)
        .with_telemetry(&mut telemetry)
        .run(&mut learner, &splits(&[(Split::Train, &train), (Split::Valid, &valid)]))
        .unwrap();

    for metrics in &summary.epochs {
        assert_eq!(metrics.perplexity, metrics.mean_loss.exp());
    }

    // Mean of the two valid batch losses of epoch 1
    let valid_losses: Vec<f64> = telemetry.series("VALID/NLL_Loss").iter().map(|(v, _)| *v).collect();
    let mean = (valid_losses[2] + valid_losses[3]) / 2.0;
    let last = summary.last(Split::Valid).unwrap();
    assert!((last.mean_loss - mean).abs() < 1e-12);
    assert!(summary.last(Split::Train).unwrap().elapsed_secs.is_some());
    assert!(last.elapsed_secs.is_none());
}

#[test]
fn test_telemetry_does_not_change_numbers() {
    let train = BatchLoader::new(common::random_dataset(Split::Train, 12, 6, VOCAB, 10), 4).with_seed(Some(11));
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 8, 6, VOCAB, 12), 4);
    let splits = splits(&[(Split::Train, &train), (Split::Valid, &valid)]);
    let model = common::tiny_model(VOCAB);

    let mut with_sink = common::learner(model.clone());
    let mut telemetry = MemoryTelemetry::new();
    let a = driver(2).with_telemetry(&mut telemetry).run(&mut with_sink, &splits).unwrap();

    let mut without_sink = common::learner(model);
    let b = driver(2).run(&mut without_sink, &splits).unwrap();

    let bits = |s: &sentence_rnn::RunSummary| -> Vec<u64> { s.epochs.iter().map(|m| m.mean_loss.to_bits()).collect() };
    assert_eq!(bits(&a), bits(&b));
    assert_eq!(
        parameter_snapshot(with_sink.model()),
        parameter_snapshot(without_sink.model())
    );
}

#[test]
fn test_empty_split_is_fatal() {
    let train = BatchLoader::new(common::random_dataset(Split::Train, 4, 6, VOCAB, 13), 2);
    let test = BatchLoader::new(common::empty_dataset(Split::Test), 2);
    let mut learner = common::learner(common::tiny_model(VOCAB));

    let result = driver(1).run(&mut learner, &splits(&[(Split::Train, &train), (Split::Test, &test)]));
    match result {
        Err(SentenceRnnError::DatasetEmpty { split }) => assert_eq!(split, "test"),
        other => panic!("expected DatasetEmpty, got {:?}", other.map(|s| s.total_steps)),
    }
}

struct RecordingSink {
    offers: Vec<(usize, f64)>,
}

impl CheckpointSink<TestTrainBackend, TestModel> for RecordingSink {
    fn offer(&mut self, _model: &TestModel, epoch: usize, valid_loss: f64) -> Result<Option<std::path::PathBuf>> {
        self.offers.push((epoch, valid_loss));
        Ok(None)
    }
}

#[test]
fn test_checkpoint_offered_after_each_validation() {
    let train = BatchLoader::new(common::random_dataset(Split::Train, 4, 6, VOCAB, 14), 2);
    let valid = BatchLoader::new(common::random_dataset(Split::Valid, 4, 6, VOCAB, 15), 2);
    let test = BatchLoader::new(common::random_dataset(Split::Test, 4, 6, VOCAB, 16), 2);
    let mut learner = common::learner(common::tiny_model(VOCAB));
    let mut sink = RecordingSink { offers: Vec::new() };

    let summary = driver(3)
        .with_checkpoints(&mut sink)
        .run(
            &mut learner,
            &splits(&[(Split::Train, &train), (Split::Valid, &valid), (Split::Test, &test)]),
        )
        .unwrap();

    let epochs: Vec<usize> = sink.offers.iter().map(|(e, _)| *e).collect();
    assert_eq!(epochs, vec![0, 1, 2]);
    let valid_means: Vec<f64> = summary.for_split(Split::Valid).map(|m| m.mean_loss).collect();
    let offered: Vec<f64> = sink.offers.iter().map(|(_, l)| *l).collect();
    assert_eq!(valid_means, offered);
}
