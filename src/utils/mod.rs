mod format;

pub use format::{experiment_name, format_duration, format_number, format_params};
