//! Info Command
//!
//! Shows a model configuration and its parameter count.

use clap::Args;

use super::parse_rnn_type;
use crate::backend::backend_name;
use crate::error::Result;
use crate::model::{RnnType, SentenceRnnConfig};
use crate::utils::format_params;

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    #[arg(long, default_value_t = 10_000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 300)]
    pub embedding_size: usize,

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
}

impl InfoArgs {
    pub fn model_config(&self) -> SentenceRnnConfig {
        SentenceRnnConfig::new(self.vocab_size)
            .with_embedding_size(self.embedding_size)
            .with_rnn_type(self.rnn_type)
            .with_hidden_size(self.hidden_size)
            .with_num_layers(self.num_layers)
            .with_bidirectional(self.bidirectional)
            .with_latent_size(self.latent_size)
    }
}

pub fn execute(args: &InfoArgs) -> Result<()> {
    let config = args.model_config();
    config.validate()?;

    println!("═══════════════════════════════════════════════════════════");
    println!("  📊 Sentence RNN ({})", config.rnn_type);
    println!("═══════════════════════════════════════════════════════════");
    println!("  Backend: {}", backend_name());
    println!("  Parameters: {}", format_params(config.num_parameters()));
    println!("  vocab_size: {}", config.vocab_size);
    println!("  embedding_size: {}", config.embedding_size);
    println!("  hidden_size: {}", config.hidden_size);
    println!("  num_layers: {}", config.num_layers);
    println!("  bidirectional: {}", config.bidirectional);
    println!("  latent_size: {}", config.latent_size);
    println!("═══════════════════════════════════════════════════════════");
    Ok(())
}
