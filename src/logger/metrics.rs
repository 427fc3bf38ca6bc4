// src/logger/metrics.rs
//! Telemetry sinks and per-epoch metrics

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::data::Split;
use crate::error::{Result, SentenceRnnError};

/// Destination for scalar and text telemetry.
pub trait TelemetrySink {
    fn scalar(&mut self, tag: &str, value: f64, step: usize);
    fn text(&mut self, tag: &str, value: &str);
}

/// Writes `scalars.csv` (`tag,value,step`) and `text.log` into one run directory.
pub struct CsvTelemetry {
    dir: PathBuf,
    scalars: BufWriter<File>,
    text: BufWriter<File>,
}

impl CsvTelemetry {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir).map_err(|source| SentenceRnnError::FileWrite {
            path: dir.to_path_buf(),
            source,
        })?;

        let create = |name: &str| {
            let path = dir.join(name);
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|source| SentenceRnnError::FileWrite { path, source })
        };

        let mut scalars = create("scalars.csv")?;
        writeln!(scalars, "tag,value,step")?;

        Ok(Self {
            dir: dir.to_path_buf(),
            scalars,
            text: create("text.log")?,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl TelemetrySink for CsvTelemetry {
    fn scalar(&mut self, tag: &str, value: f64, step: usize) {
        let _ = writeln!(self.scalars, "{},{},{}", tag, value, step);
        let _ = self.scalars.flush();
    }

    fn text(&mut self, tag: &str, value: &str) {
        let _ = writeln!(self.text, "[{}] {}", tag, value);
        let _ = self.text.flush();
    }
}

/// Keeps everything in memory. Used by tests and by callers that inspect a run afterwards.
#[derive(Debug, Default, Clone)]
pub struct MemoryTelemetry {
    pub scalars: Vec<(String, f64, usize)>,
    pub texts: Vec<(String, String)>,
}

impl MemoryTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(value, step)` pairs recorded under `tag`, in order.
    pub fn series(&self, tag: &str) -> Vec<(f64, usize)> {
        self.scalars
            .iter()
            .filter(|(t, _, _)| t == tag)
            .map(|(_, value, step)| (*value, *step))
            .collect()
    }
}

impl TelemetrySink for MemoryTelemetry {
    fn scalar(&mut self, tag: &str, value: f64, step: usize) {
        self.scalars.push((tag.to_string(), value, step));
    }

    fn text(&mut self, tag: &str, value: &str) {
        self.texts.push((tag.to_string(), value.to_string()));
    }
}

/// Aggregate of one (split, epoch) pass.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub split: Split,
    pub epoch: usize,
    pub mean_loss: f64,
    pub perplexity: f64,
    pub batches: usize,
    /// Wall-clock time of the pass, kept for the train split.
    pub elapsed_secs: Option<f64>,
}

impl EpochMetrics {
    pub fn new(split: Split, epoch: usize, mean_loss: f64, batches: usize) -> Self {
        Self {
            split,
            epoch,
            mean_loss,
            perplexity: mean_loss.exp(),
            batches,
            elapsed_secs: None,
        }
    }

    pub fn with_elapsed(mut self, secs: f64) -> Self {
        self.elapsed_secs = Some(secs);
        self
    }
}

/// Everything a finished run reports.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub epochs: Vec<EpochMetrics>,
    pub total_steps: usize,
}

impl RunSummary {
    pub fn for_split(&self, split: Split) -> impl Iterator<Item = &EpochMetrics> {
        self.epochs.iter().filter(move |m| m.split == split)
    }

    pub fn last(&self, split: Split) -> Option<&EpochMetrics> {
        self.for_split(split).last()
    }

    /// Lowest finite validation loss and its epoch.
    pub fn best_valid(&self) -> Option<&EpochMetrics> {
        self.for_split(Split::Valid)
            .filter(|m| m.mean_loss.is_finite())
            .min_by(|a, b| a.mean_loss.total_cmp(&b.mean_loss))
    }

    pub fn summary(&self) -> String {
        let train = self.last(Split::Train).map(|m| m.mean_loss).unwrap_or(f64::NAN);
        let best = self.best_valid();
        format!(
            "Steps: {} | Final Train Loss: {:.4} | Best Valid Loss: {:.4} (epoch {}) | Best Valid PPL: {:.2}",
            self.total_steps,
            train,
            best.map_or(f64::NAN, |m| m.mean_loss),
            best.map_or(0, |m| m.epoch),
            best.map_or(f64::NAN, |m| m.perplexity),
        )
    }
}
