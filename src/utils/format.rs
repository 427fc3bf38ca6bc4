// src/utils/format.rs
//! Display helpers and run naming

use crate::model::{SentenceRnnConfig, TrainingConfig};

/// Formats a parameter count (85.0M, 1.50B, ...).
pub fn format_params(n: usize) -> String {
    if n >= 1_000_000_000 {
        format!("{:.2}B", n as f64 / 1e9)
    } else if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}

pub fn format_number(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.1}M", n as f64 / 1e6)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1e3)
    } else {
        n.to_string()
    }
}

pub fn format_duration(secs: u64) -> String {
    let h = secs / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;

    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{}s", s)
    }
}

/// Directory name for one run's telemetry: cell type, hyperparameters, timestamp.
pub fn experiment_name(model: &SentenceRnnConfig, training: &TrainingConfig, ts: &str) -> String {
    format!(
        "RNN_{}_TS={}_BS={}_LR={}_EB={}_HS={}_NL={}_BI={}_LS={}_WD={}_ED={}",
        model.rnn_type.name().to_uppercase(),
        ts,
        training.batch_size,
        training.learning_rate,
        model.embedding_size,
        model.hidden_size,
        model.num_layers,
        model.bidirectional,
        model.latent_size,
        model.word_dropout,
        model.embedding_dropout,
    )
}
