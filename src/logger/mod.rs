mod metrics;

pub use metrics::{CsvTelemetry, EpochMetrics, MemoryTelemetry, RunSummary, TelemetrySink};
