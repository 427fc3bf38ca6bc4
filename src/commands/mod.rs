//! Commands Module
//!
//! All CLI subcommand implementations.

pub mod build_dataset;
pub mod info;
pub mod train;

use crate::model::RnnType;

/// Case-insensitive `--rnn-type` parser.
fn parse_rnn_type(s: &str) -> Result<RnnType, String> {
    s.parse::<RnnType>().map_err(|e| e.to_string())
}
