//! Recurrent cells and length-masked recurrent layers

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{activation, backend::Backend, Tensor},
};

use super::config::RnnType;

/// Recurrent state of one direction of one layer.
#[derive(Clone, Debug)]
pub struct CellState<B: Backend> {
    pub hidden: Tensor<B, 2>,
    /// Memory cell, LSTM only.
    pub cell: Option<Tensor<B, 2>>,
}

impl<B: Backend> CellState<B> {
    pub fn zeros(batch_size: usize, d_hidden: usize, with_cell: bool, device: &B::Device) -> Self {
        Self {
            hidden: Tensor::zeros([batch_size, d_hidden], device),
            cell: with_cell.then(|| Tensor::zeros([batch_size, d_hidden], device)),
        }
    }

    /// Takes `next` where `mask` is 1 and keeps `self` where it is 0.
    fn blend(self, next: Self, mask: Tensor<B, 2>) -> Self {
        let keep = |old: Tensor<B, 2>, new: Tensor<B, 2>| old.clone() + (new - old) * mask.clone();
        let cell = match (self.cell, next.cell) {
            (Some(old), Some(new)) => Some(keep(old, new)),
            _ => None,
        };
        Self {
            hidden: keep(self.hidden, next.hidden),
            cell,
        }
    }
}

/// `x·W + b` and `h·U + c` for all gates at once.
#[derive(Module, Debug)]
pub struct GateProjection<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
}

impl<B: Backend> GateProjection<B> {
    fn new(d_input: usize, d_hidden: usize, gates: usize, device: &B::Device) -> Self {
        Self {
            input: LinearConfig::new(d_input, gates * d_hidden).init(device),
            hidden: LinearConfig::new(d_hidden, gates * d_hidden).init(device),
        }
    }

    fn forward(&self, x: Tensor<B, 2>, h: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        (self.input.forward(x), self.hidden.forward(h))
    }
}

/// Splits `[batch, N * hidden]` gate pre-activations into `N` column blocks, in order.
fn gate_blocks<B: Backend, const N: usize>(gates: Tensor<B, 2>) -> [Tensor<B, 2>; N] {
    let [rows, cols] = gates.dims();
    let width = cols / N;
    std::array::from_fn(|k| gates.clone().slice([0..rows, k * width..(k + 1) * width]))
}

/// Elman cell: `h' = tanh(xW + hU)`.
#[derive(Module, Debug)]
pub struct RnnCell<B: Backend> {
    proj: GateProjection<B>,
}

impl<B: Backend> RnnCell<B> {
    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        let (xg, hg) = self.proj.forward(x, state.hidden.clone());
        CellState {
            hidden: activation::tanh(xg + hg),
            cell: None,
        }
    }
}

#[derive(Module, Debug)]
pub struct LstmCell<B: Backend> {
    proj: GateProjection<B>,
}

impl<B: Backend> LstmCell<B> {
    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        let (xg, hg) = self.proj.forward(x, state.hidden.clone());
        let [i, f, g, o] = gate_blocks(xg + hg);

        let c_prev = state
            .cell
            .clone()
            .unwrap_or_else(|| state.hidden.zeros_like());
        let c = activation::sigmoid(f) * c_prev + activation::sigmoid(i) * activation::tanh(g);
        let h = activation::sigmoid(o) * activation::tanh(c.clone());

        CellState {
            hidden: h,
            cell: Some(c),
        }
    }
}

#[derive(Module, Debug)]
pub struct GruCell<B: Backend> {
    proj: GateProjection<B>,
}

impl<B: Backend> GruCell<B> {
    fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        let h = state.hidden.clone();
        let (xg, hg) = self.proj.forward(x, h.clone());
        let [xr, xz, xn] = gate_blocks(xg);
        let [hr, hz, hn] = gate_blocks(hg);

        let r = activation::sigmoid(xr + hr);
        let z = activation::sigmoid(xz + hz);
        let n = activation::tanh(xn + r * hn);
        // (1 - z) * n + z * h
        let hidden = n.clone() + z * (h - n);

        CellState { hidden, cell: None }
    }
}

/// One cell family, picked once when the model is built.
#[derive(Module, Debug)]
pub enum RecurrentCell<B: Backend> {
    Rnn(RnnCell<B>),
    Lstm(LstmCell<B>),
    Gru(GruCell<B>),
}

impl<B: Backend> RecurrentCell<B> {
    pub fn new(rnn_type: RnnType, d_input: usize, d_hidden: usize, device: &B::Device) -> Self {
        let proj = GateProjection::new(d_input, d_hidden, rnn_type.gates(), device);
        match rnn_type {
            RnnType::Rnn => RecurrentCell::Rnn(RnnCell { proj }),
            RnnType::Lstm => RecurrentCell::Lstm(LstmCell { proj }),
            RnnType::Gru => RecurrentCell::Gru(GruCell { proj }),
        }
    }

    pub fn has_memory_cell(&self) -> bool {
        matches!(self, RecurrentCell::Lstm(_))
    }

    pub fn step(&self, x: Tensor<B, 2>, state: &CellState<B>) -> CellState<B> {
        match self {
            RecurrentCell::Rnn(cell) => cell.step(x, state),
            RecurrentCell::Lstm(cell) => cell.step(x, state),
            RecurrentCell::Gru(cell) => cell.step(x, state),
        }
    }
}

/// One stacked layer, optionally bidirectional.
///
/// Steps past a row's length leave its state untouched and emit zeros, so the
/// final state of every row is the state at its true last token.
#[derive(Module, Debug)]
pub struct RecurrentLayer<B: Backend> {
    forward_cell: RecurrentCell<B>,
    backward_cell: Option<RecurrentCell<B>>,
    d_hidden: usize,
}

impl<B: Backend> RecurrentLayer<B> {
    pub fn new(
        rnn_type: RnnType,
        d_input: usize,
        d_hidden: usize,
        bidirectional: bool,
        device: &B::Device,
    ) -> Self {
        Self {
            forward_cell: RecurrentCell::new(rnn_type, d_input, d_hidden, device),
            backward_cell: bidirectional
                .then(|| RecurrentCell::new(rnn_type, d_input, d_hidden, device)),
            d_hidden,
        }
    }

    pub fn d_output(&self) -> usize {
        if self.backward_cell.is_some() {
            2 * self.d_hidden
        } else {
            self.d_hidden
        }
    }

    /// Initial state whose hidden part is `hidden` (memory cell starts at zero).
    pub fn initial_state(&self, hidden: Tensor<B, 2>) -> CellState<B> {
        let cell = self.forward_cell.has_memory_cell().then(|| hidden.zeros_like());
        CellState { hidden, cell }
    }

    /// `x`: `[batch, steps, d_input]`, `mask`: `[batch, steps]` of 0/1.
    ///
    /// Returns the `[batch, steps, d_output]` outputs and the final state of
    /// each direction (forward first). `init` seeds the forward direction only.
    pub fn forward(
        &self,
        x: Tensor<B, 3>,
        mask: Tensor<B, 2>,
        init: Option<CellState<B>>,
    ) -> (Tensor<B, 3>, Vec<CellState<B>>) {
        let [batch_size, steps, _] = x.dims();
        let device = x.device();
        let zeros = |cell: &RecurrentCell<B>| {
            CellState::zeros(batch_size, self.d_hidden, cell.has_memory_cell(), &device)
        };

        let forward_init = init.unwrap_or_else(|| zeros(&self.forward_cell));
        let (forward_out, forward_final) =
            self.run_direction(&self.forward_cell, &x, &mask, forward_init, (0..steps).collect());

        match &self.backward_cell {
            None => (forward_out, vec![forward_final]),
            Some(cell) => {
                let (backward_out, backward_final) =
                    self.run_direction(cell, &x, &mask, zeros(cell), (0..steps).rev().collect());
                (
                    Tensor::cat(vec![forward_out, backward_out], 2),
                    vec![forward_final, backward_final],
                )
            }
        }
    }

    fn run_direction(
        &self,
        cell: &RecurrentCell<B>,
        x: &Tensor<B, 3>,
        mask: &Tensor<B, 2>,
        mut state: CellState<B>,
        order: Vec<usize>,
    ) -> (Tensor<B, 3>, CellState<B>) {
        let [batch_size, steps, d_input] = x.dims();
        let mut outputs: Vec<Option<Tensor<B, 2>>> = vec![None; steps];

        for t in order {
            let x_t = x
                .clone()
                .slice([0..batch_size, t..t + 1, 0..d_input])
                .reshape([batch_size, d_input]);
            let m_t = mask
                .clone()
                .slice([0..batch_size, t..t + 1])
                .expand([batch_size, self.d_hidden]);

            let next = cell.step(x_t, &state);
            state = state.blend(next, m_t.clone());
            outputs[t] = Some(state.hidden.clone() * m_t);
        }

        let outputs: Vec<Tensor<B, 2>> = outputs.into_iter().flatten().collect();
        (Tensor::stack(outputs, 1), state)
    }
}
