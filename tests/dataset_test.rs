//! Dataset Tests
//!
//! Corpus building, caching and batching from text files on disk.

mod common;

use sentence_rnn::data::SentenceNormalizer;
use sentence_rnn::{BatchLoader, BatchSource, Corpus, CorpusConfig, SentenceRnnError, Split, Vocab};
use tempfile::tempdir;

const TRAIN: &[&str] = &[
    "the cat sat on the mat",
    "",
    "the dog sat on the log",
    "a bird flew",
];
const VALID: &[&str] = &["the cat flew", "an owl sat"];

fn config(dir: &std::path::Path, create_data: bool) -> CorpusConfig {
    CorpusConfig {
        data_dir: dir.to_path_buf(),
        create_data,
        max_sequence_length: 5,
        min_occ: 1,
    }
}

#[test]
fn test_first_open_builds_vocab_and_caches() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);

    let corpus = Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();

    assert!(dir.path().join("ptb.vocab.json").exists());
    assert!(dir.path().join("ptb.train.json").exists());
    assert!(dir.path().join("ptb.valid.json").exists());

    // Only words seen more than once survive: the, sat, on
    assert_eq!(corpus.vocab.len(), 4 + 3);
    assert_eq!(corpus.vocab.index("the"), 4);
    assert_eq!(corpus.vocab.index("cat"), Vocab::UNK);

    // Blank lines are skipped
    assert_eq!(corpus.dataset(Split::Train).unwrap().len(), 3);
    assert_eq!(corpus.dataset(Split::Valid).unwrap().len(), 2);
    assert!(corpus.dataset(Split::Test).is_none());
}

#[test]
fn test_second_open_reads_caches() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);
    let first = Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();

    // Text files are no longer needed once cached
    std::fs::remove_file(dir.path().join("ptb.valid.txt")).unwrap();
    let second = Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();

    let a = first.dataset(Split::Valid).unwrap();
    let b = second.dataset(Split::Valid).unwrap();
    assert_eq!(a.get(0), b.get(0));
    assert_eq!(first.vocab.len(), second.vocab.len());
}

#[test]
fn test_create_data_rebuilds_from_text() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);
    Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();

    common::write_corpus(dir.path(), &["owl owl owl", "owl"], VALID, None);
    let cached = Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();
    assert_eq!(cached.vocab.index("owl"), Vocab::UNK);

    let rebuilt = Corpus::open(&config(dir.path(), true), &Split::run_order(false)).unwrap();
    assert_eq!(rebuilt.vocab.len(), 5);
    assert_eq!(rebuilt.vocab.index("owl"), 4);
    assert_eq!(rebuilt.dataset(Split::Train).unwrap().len(), 2);
}

#[test]
fn test_missing_split_file_is_reported() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);

    let result = Corpus::open(&config(dir.path(), false), &Split::run_order(true));
    match result {
        Err(SentenceRnnError::FileNotFound(path)) => assert!(path.ends_with("ptb.test.txt")),
        other => panic!("expected FileNotFound, got {:?}", other.err()),
    }
}

#[test]
fn test_corrupt_cache_is_reported() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);
    Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();

    std::fs::write(dir.path().join("ptb.valid.json"), "{ not json").unwrap();
    let result = Corpus::open(&config(dir.path(), false), &Split::run_order(false));
    assert!(matches!(result, Err(SentenceRnnError::CacheCorrupt { .. })));
}

#[test]
fn test_examples_are_truncated_and_shifted() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);
    let corpus = Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();

    // "the cat sat on the mat" keeps its first four words under max length 5
    let first = corpus.dataset(Split::Train).unwrap().get(0).cloned().unwrap();
    let words: Vec<&str> = first.input.iter().filter_map(|&i| corpus.vocab.word(i)).collect();
    assert_eq!(words, vec!["<sos>", "the", "<unk>", "sat", "on"]);
    assert_eq!(first.length, 5);
    assert_eq!(first.target[4], Vocab::EOS);
}

#[test]
fn test_loader_covers_every_example_once() {
    let dir = tempdir().unwrap();
    common::write_corpus(dir.path(), TRAIN, VALID, None);
    let corpus = Corpus::open(&config(dir.path(), false), &Split::run_order(false)).unwrap();
    let train = corpus.dataset(Split::Train).unwrap();

    let loader = BatchLoader::new(train.clone(), 2).with_prefetch(1);
    let batches: Vec<_> = loader.batches(0, true).map(|b| b.unwrap()).collect();

    assert_eq!(batches.len(), loader.num_batches());
    let rows: usize = batches.iter().map(|b| b.size()).sum();
    assert_eq!(rows, train.len());
    let tokens: usize = batches.iter().flat_map(|b| b.length.iter()).sum();
    assert_eq!(tokens, train.num_tokens());
}

#[test]
fn test_normalizer_folds_case_and_punctuation() {
    let normalizer = SentenceNormalizer::new();
    assert_eq!(normalizer.tokenize("The  Cat\tsat "), vec!["the", "cat", "sat"]);
}
