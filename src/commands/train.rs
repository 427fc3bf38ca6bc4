//! Train Command
//!
//! Builds the corpus, the model and the loaders, then hands them to the epoch driver.

use burn::config::Config;
use burn::optim::AdamConfig;
use clap::Args;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use super::parse_rnn_type;
use crate::backend::{backend_name, get_device, TrainBackend};
use crate::data::{BatchLoader, BatchSource, Corpus, CorpusConfig, Split, Vocab};
use crate::error::{Result, SentenceRnnError};
use crate::logger::{CsvTelemetry, RunSummary, TelemetrySink};
use crate::model::{
    BestValidationCheckpointer, Learner, RnnType, SentenceRnn, SentenceRnnConfig, TrainingConfig,
};
use crate::train::{DriverConfig, EpochDriver};
use crate::utils::{experiment_name, format_duration, format_number, format_params};

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Rebuild vocabulary and split caches from the text files
    #[arg(long)]
    pub create_data: bool,

    #[arg(long, default_value_t = 60)]
    pub max_sequence_length: usize,

    /// Words seen this many times or fewer map to <unk>
    #[arg(long, default_value_t = 1)]
    pub min_occ: usize,

    /// Also evaluate the test split every epoch
    #[arg(long)]
    pub test: bool,

    #[arg(short = 'e', long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(short = 'b', long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(short = 'l', long, default_value_t = 0.001)]
    pub learning_rate: f64,

    #[arg(long, default_value_t = 300)]
    pub embedding_size: usize,

    /// rnn, lstm or gru
    #[arg(long, default_value = "gru", value_parser = parse_rnn_type)]
    pub rnn_type: RnnType,

    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    #[arg(long, default_value_t = 1)]
    pub num_layers: usize,

    #[arg(long)]
    pub bidirectional: bool,

    #[arg(long, default_value_t = 16)]
    pub latent_size: usize,

    #[arg(long, default_value_t = 0.0)]
    pub word_dropout: f64,

    #[arg(long, default_value_t = 0.5)]
    pub embedding_dropout: f64,

    #[arg(short = 'v', long, default_value_t = 50)]
    pub print_every: usize,

    /// Write scalars and run text under --logdir
    #[arg(long)]
    pub tensorboard_logging: bool,

    #[arg(long, default_value = "logs_rnn")]
    pub logdir: PathBuf,

    #[arg(long, default_value = "bin_rnn")]
    pub save_model_path: PathBuf,

    /// Keep a checkpoint whenever the validation loss improves
    #[arg(long)]
    pub save_checkpoints: bool,

    /// Fixed shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Queue depth of the single background batch worker (0 = inline)
    #[arg(long, alias = "num-workers", default_value_t = 0)]
    pub prefetch: usize,
}

impl TrainArgs {
    pub fn training_config(&self) -> TrainingConfig {
        TrainingConfig::new()
            .with_epochs(self.epochs)
            .with_batch_size(self.batch_size)
            .with_learning_rate(self.learning_rate)
            .with_print_every(self.print_every)
            .with_test(self.test)
            .with_prefetch(self.prefetch)
            .with_seed(self.seed)
            .with_save_checkpoints(self.save_checkpoints)
    }

    pub fn model_config(&self, vocab_size: usize) -> SentenceRnnConfig {
        SentenceRnnConfig::new(vocab_size)
            .with_pad_idx(Vocab::PAD)
            .with_unk_idx(Vocab::UNK)
            .with_sos_idx(Vocab::SOS)
            .with_eos_idx(Vocab::EOS)
            .with_max_sequence_length(self.max_sequence_length)
            .with_embedding_size(self.embedding_size)
            .with_rnn_type(self.rnn_type)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_bidirectional(self.bidirectional)
            .with_latent_size(self.latent_size)
            .with_word_dropout(self.word_dropout)
            .with_embedding_dropout(self.embedding_dropout)
    }

    pub fn corpus_config(&self) -> CorpusConfig {
        CorpusConfig {
            data_dir: self.data_dir.clone(),
            create_data: self.create_data,
            max_sequence_length: self.max_sequence_length,
            min_occ: self.min_occ,
        }
    }

    /// Checks everything that does not need the corpus.
    pub fn validate(&self) -> Result<()> {
        self.training_config().validate()?;
        // The vocabulary always holds at least the four specials
        self.model_config(Vocab::EOS + 1).validate()
    }
}

/// Runs training end to end and returns the per-epoch metrics.
pub fn execute(args: &TrainArgs) -> Result<RunSummary> {
    args.validate()?;
    let training = args.training_config();
    let splits = Split::run_order(args.test);

    println!("═══════════════════════════════════════════════════════════");
    println!("  🚀 Sentence RNN training");
    println!("═══════════════════════════════════════════════════════════");
    println!("  Backend: {}", backend_name());
    println!("  Data: {:?}", args.data_dir);
    println!(
        "  Splits: {}",
        splits.iter().map(|s| s.name()).collect::<Vec<_>>().join(", ")
    );
    println!();

    let corpus = Corpus::open(&args.corpus_config(), &splits)?;
    for dataset in corpus.datasets() {
        println!(
            "  {}: {} sentences, {} tokens",
            dataset.split().tag(),
            format_number(dataset.len()),
            format_number(dataset.num_tokens())
        );
    }

    let model_config = args.model_config(corpus.vocab.len());
    model_config.validate()?;

    let device = get_device();
    let model = SentenceRnn::<TrainBackend>::new(&model_config, &device);
    let description = model.describe(model_config.rnn_type);
    println!("  Parameters: {}", format_params(model_config.num_parameters()));
    tracing::info!("{}", description);

    std::fs::create_dir_all(&args.save_model_path).map_err(|source| SentenceRnnError::FileWrite {
        path: args.save_model_path.clone(),
        source,
    })?;
    save_config(&model_config, &args.save_model_path.join("model_config.json"))?;
    save_config(&training, &args.save_model_path.join("training_config.json"))?;

    let mut telemetry = if args.tensorboard_logging {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        let dir = args
            .logdir
            .join(experiment_name(&model_config, &training, &ts.to_string()));
        let mut sink = CsvTelemetry::new(&dir)?;
        sink.text("model", &description);
        sink.text("args", &format!("{:?}", args));
        tracing::info!("Telemetry written to {:?}", sink.dir());
        Some(sink)
    } else {
        None
    };

    let mut checkpoints = if training.save_checkpoints {
        Some(BestValidationCheckpointer::<TrainBackend>::new(&args.save_model_path)?)
    } else {
        None
    };

    let loaders = splits
        .iter()
        .map(|&split| {
            let dataset = corpus.dataset(split).ok_or_else(|| SentenceRnnError::DatasetEmpty {
                split: split.name().to_string(),
            })?;
            let loader = BatchLoader::new(dataset, training.batch_size)
                .with_prefetch(training.prefetch)
                .with_seed(training.seed);
            Ok((split, loader))
        })
        .collect::<Result<Vec<_>>>()?;
    let sources: Vec<(Split, &dyn BatchSource)> = loaders
        .iter()
        .map(|(split, loader)| (*split, loader as &dyn BatchSource))
        .collect();

    let optimizer = AdamConfig::new().init::<TrainBackend, SentenceRnn<TrainBackend>>();
    let mut learner: Learner<TrainBackend, _, _> =
        Learner::new(model, optimizer, training.learning_rate, device);
    let mut driver: EpochDriver<'_, TrainBackend, SentenceRnn<TrainBackend>> =
        EpochDriver::new(DriverConfig::new(training.epochs, training.print_every));
    if let Some(sink) = telemetry.as_mut() {
        driver = driver.with_telemetry(sink);
    }
    if let Some(sink) = checkpoints.as_mut() {
        driver = driver.with_checkpoints(sink);
    }

    let started = std::time::Instant::now();
    let summary = driver.run(&mut learner, &sources)?;

    println!();
    println!("═══════════════════════════════════════════════════════════");
    println!("  ✅ Training finished in {}", format_duration(started.elapsed().as_secs()));
    println!("  {}", summary.summary());
    println!("═══════════════════════════════════════════════════════════");

    Ok(summary)
}

fn save_config<C: Config>(config: &C, path: &std::path::Path) -> Result<()> {
    config.save(path).map_err(|source| SentenceRnnError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}
