mod driver;
mod state;

pub use driver::{DriverConfig, EpochDriver};
pub use state::RunState;
