//! Build Dataset Command
//!
//! Builds the vocabulary and the split caches without training.

use clap::Args;
use std::path::PathBuf;

use crate::data::{Corpus, CorpusConfig, Split};
use crate::error::Result;
use crate::utils::format_number;

#[derive(Args, Debug, Clone)]
pub struct BuildDataArgs {
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Rebuild even when caches already exist
    #[arg(long)]
    pub create_data: bool,

    #[arg(long, default_value_t = 60)]
    pub max_sequence_length: usize,

    #[arg(long, default_value_t = 1)]
    pub min_occ: usize,

    /// Also build the test split
    #[arg(long)]
    pub test: bool,
}

pub fn execute(args: &BuildDataArgs) -> Result<Corpus> {
    let config = CorpusConfig {
        data_dir: args.data_dir.clone(),
        create_data: args.create_data,
        max_sequence_length: args.max_sequence_length,
        min_occ: args.min_occ,
    };

    println!("═══════════════════════════════════════════════════════════");
    println!("  📦 Building corpus caches");
    println!("═══════════════════════════════════════════════════════════");
    println!("  Data: {:?}", args.data_dir);
    println!("  max_sequence_length: {}", args.max_sequence_length);
    println!("  min_occ: {}", args.min_occ);
    println!();

    let corpus = Corpus::open(&config, &Split::run_order(args.test))?;

    println!("  Vocabulary: {} words", format_number(corpus.vocab.len()));
    for dataset in corpus.datasets() {
        let truncated = (0..dataset.len())
            .filter_map(|i| dataset.get(i))
            .filter(|e| e.length == dataset.max_sequence_length())
            .count();
        println!(
            "  {:<5} {:>8} sentences | {:>10} tokens | {} at max length",
            dataset.split().tag(),
            format_number(dataset.len()),
            format_number(dataset.num_tokens()),
            truncated
        );
    }
    println!("═══════════════════════════════════════════════════════════");

    Ok(corpus)
}
