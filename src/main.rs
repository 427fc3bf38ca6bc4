use clap::{Parser, Subcommand};

use sentence_rnn::commands::build_dataset::{self, BuildDataArgs};
use sentence_rnn::commands::info::{self, InfoArgs};
use sentence_rnn::commands::train::{self, TrainArgs};

// ============ CLI ============
#[derive(Parser)]
#[command(name = "sentence-rnn")]
#[command(version)]
#[command(about = "Recurrent sentence autoencoder trained with masked NLL")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Trains the model, evaluating valid (and test) every epoch
    Train(TrainArgs),

    /// Builds the vocabulary and split caches
    BuildData(BuildDataArgs),

    /// Shows a model configuration and its parameter count
    Info(InfoArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Train(args) => train::execute(&args).map(|_| ()),
        Commands::BuildData(args) => build_dataset::execute(&args).map(|_| ()),
        Commands::Info(args) => info::execute(&args),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        eprintln!("  ❌ {}", e);
        std::process::exit(1);
    }
}
