// src/data/split.rs

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named corpus partition. Each split owns its own batch source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    /// Splits in processing order; `test` only when requested.
    pub fn run_order(include_test: bool) -> Vec<Split> {
        let mut splits = vec![Split::Train, Split::Valid];
        if include_test {
            splits.push(Split::Test);
        }
        splits
    }

    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }

    /// Upper-case tag used in log lines and telemetry.
    pub fn tag(&self) -> String {
        self.name().to_uppercase()
    }

    pub fn is_train(&self) -> bool {
        matches!(self, Split::Train)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
