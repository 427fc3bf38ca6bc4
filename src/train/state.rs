/// Counters threaded through a run.
///
/// `step` counts optimizer steps over the whole run; `losses` holds the batch
/// losses of the current (epoch, split) pass only.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub epoch: usize,
    pub step: usize,
    pub losses: Vec<f64>,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.losses.clear();
    }

    pub fn begin_split(&mut self) {
        self.losses.clear();
    }

    pub fn record(&mut self, loss: f64) {
        self.losses.push(loss);
    }

    /// Returns the step the finished update ran at.
    pub fn advance_step(&mut self) -> usize {
        let step = self.step;
        self.step += 1;
        step
    }

    /// `None` when nothing was recorded in this pass.
    pub fn mean_loss(&self) -> Option<f64> {
        if self.losses.is_empty() {
            None
        } else {
            Some(self.losses.iter().sum::<f64>() / self.losses.len() as f64)
        }
    }
}
