// src/model/config.rs
//! Model and training hyperparameters

use burn::config::Config;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SentenceRnnError;

/// Recurrent cell family, fixed when the model is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RnnType {
    Rnn,
    Lstm,
    Gru,
}

impl RnnType {
    pub fn name(&self) -> &'static str {
        match self {
            RnnType::Rnn => "rnn",
            RnnType::Lstm => "lstm",
            RnnType::Gru => "gru",
        }
    }

    /// Stacked gate blocks per projection.
    pub fn gates(&self) -> usize {
        match self {
            RnnType::Rnn => 1,
            RnnType::Lstm => 4,
            RnnType::Gru => 3,
        }
    }
}

impl FromStr for RnnType {
    type Err = SentenceRnnError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rnn" => Ok(RnnType::Rnn),
            "lstm" => Ok(RnnType::Lstm),
            "gru" => Ok(RnnType::Gru),
            other => Err(SentenceRnnError::ConfigError(format!(
                "rnn_type must be one of rnn, lstm, gru (got `{}`)",
                other
            ))),
        }
    }
}

impl fmt::Display for RnnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn check_probability(name: &str, value: f64) -> crate::error::Result<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SentenceRnnError::ConfigError(format!(
            "{} must lie in [0, 1] (got {})",
            name, value
        )))
    }
}

fn check_positive(name: &str, value: usize) -> crate::error::Result<()> {
    if value == 0 {
        return Err(SentenceRnnError::ConfigError(format!("{} must be at least 1", name)));
    }
    Ok(())
}

#[derive(Config, Debug)]
pub struct SentenceRnnConfig {
    pub vocab_size: usize,

    #[config(default = "0")]
    pub pad_idx: usize,

    #[config(default = "1")]
    pub unk_idx: usize,

    #[config(default = "2")]
    pub sos_idx: usize,

    #[config(default = "3")]
    pub eos_idx: usize,

    #[config(default = "60")]
    pub max_sequence_length: usize,

    #[config(default = "300")]
    pub embedding_size: usize,

    #[config(default = "RnnType::Gru")]
    pub rnn_type: RnnType,

    #[config(default = "256")]
    pub hidden_size: usize,

    #[config(default = "1")]
    pub num_layers: usize,

    #[config(default = "false")]
    pub bidirectional: bool,

    #[config(default = "16")]
    pub latent_size: usize,

    #[config(default = "0.0")]
    pub word_dropout: f64,

    #[config(default = "0.5")]
    pub embedding_dropout: f64,
}

impl SentenceRnnConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        check_probability("word_dropout", self.word_dropout)?;
        check_probability("embedding_dropout", self.embedding_dropout)?;
        check_positive("embedding_size", self.embedding_size)?;
        check_positive("hidden_size", self.hidden_size)?;
        check_positive("num_layers", self.num_layers)?;
        check_positive("latent_size", self.latent_size)?;
        if self.max_sequence_length < 2 {
            return Err(SentenceRnnError::ConfigError(
                "max_sequence_length must leave room for <sos>/<eos> (at least 2)".into(),
            ));
        }
        let specials = [self.pad_idx, self.unk_idx, self.sos_idx, self.eos_idx];
        if let Some(bad) = specials.iter().find(|&&idx| idx >= self.vocab_size) {
            return Err(SentenceRnnError::ConfigError(format!(
                "special token id {} outside vocabulary of {}",
                bad, self.vocab_size
            )));
        }
        Ok(())
    }

    pub fn directions(&self) -> usize {
        if self.bidirectional {
            2
        } else {
            1
        }
    }

    pub fn num_parameters(&self) -> usize {
        let h = self.hidden_size;
        let gates = self.rnn_type.gates();
        // Input and hidden projections, each with bias
        let cell = |d_input: usize| gates * h * (d_input + 1) + gates * h * (h + 1);

        let embed = self.vocab_size * self.embedding_size;

        let encoder: usize = (0..self.num_layers)
            .map(|layer| {
                let d_input = if layer == 0 {
                    self.embedding_size
                } else {
                    h * self.directions()
                };
                cell(d_input) * self.directions()
            })
            .sum();

        let decoder: usize = (0..self.num_layers)
            .map(|layer| cell(if layer == 0 { self.embedding_size } else { h }))
            .sum();

        let summary = self.num_layers * self.directions() * h;
        let hidden2latent = summary * self.latent_size + self.latent_size;
        let latent2hidden = self.latent_size * self.num_layers * h + self.num_layers * h;
        let outputs2vocab = h * self.vocab_size + self.vocab_size;

        embed + encoder + decoder + hidden2latent + latent2hidden + outputs2vocab
    }
}

#[derive(Config, Debug)]
pub struct TrainingConfig {
    #[config(default = "10")]
    pub epochs: usize,

    #[config(default = "32")]
    pub batch_size: usize,

    #[config(default = "0.001")]
    pub learning_rate: f64,

    #[config(default = "50")]
    pub print_every: usize,

    #[config(default = "false")]
    pub test: bool,

    /// Batches one background worker may build ahead; 0 collates inline.
    #[config(default = "0")]
    pub prefetch: usize,

    /// Fixed shuffle seed. Unset means a fresh order every run.
    pub seed: Option<u64>,

    #[config(default = "false")]
    pub save_checkpoints: bool,
}

impl TrainingConfig {
    pub fn validate(&self) -> crate::error::Result<()> {
        check_positive("batch_size", self.batch_size)?;
        check_positive("print_every", self.print_every)?;
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(SentenceRnnError::ConfigError(format!(
                "learning_rate must be positive (got {})",
                self.learning_rate
            )));
        }
        Ok(())
    }
}
