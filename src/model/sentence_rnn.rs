//! Sentence autoencoder: recurrent encoder, small latent bottleneck,
//! recurrent decoder conditioned on the latent code.

use burn::{
    module::Module,
    nn::{Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear, LinearConfig},
    tensor::{activation, backend::Backend, Distribution, Int, Tensor},
};

use super::cell::RecurrentLayer;
use super::config::{RnnType, SentenceRnnConfig};
use super::traits::{ModelMode, SequenceModel};
use crate::helpers::length_mask;

#[derive(Module, Debug)]
pub struct SentenceRnn<B: Backend> {
    embedding: Embedding<B>,
    embedding_dropout: Dropout,
    encoder: Vec<RecurrentLayer<B>>,
    hidden2latent: Linear<B>,
    latent2hidden: Linear<B>,
    decoder: Vec<RecurrentLayer<B>>,
    outputs2vocab: Linear<B>,
    vocab_size: usize,
    pad_idx: usize,
    unk_idx: usize,
    sos_idx: usize,
    hidden_size: usize,
    num_layers: usize,
    word_dropout: f64,
}

impl<B: Backend> SentenceRnn<B> {
    pub fn new(config: &SentenceRnnConfig, device: &B::Device) -> Self {
        let h = config.hidden_size;
        let directions = config.directions();

        let encoder = (0..config.num_layers)
            .map(|layer| {
                let d_input = if layer == 0 { config.embedding_size } else { h * directions };
                RecurrentLayer::new(config.rnn_type, d_input, h, config.bidirectional, device)
            })
            .collect();

        let decoder = (0..config.num_layers)
            .map(|layer| {
                let d_input = if layer == 0 { config.embedding_size } else { h };
                RecurrentLayer::new(config.rnn_type, d_input, h, false, device)
            })
            .collect();

        Self {
            embedding: EmbeddingConfig::new(config.vocab_size, config.embedding_size).init(device),
            embedding_dropout: DropoutConfig::new(config.embedding_dropout).init(),
            encoder,
            hidden2latent: LinearConfig::new(config.num_layers * directions * h, config.latent_size)
                .init(device),
            latent2hidden: LinearConfig::new(config.latent_size, config.num_layers * h).init(device),
            decoder,
            outputs2vocab: LinearConfig::new(h, config.vocab_size).init(device),
            vocab_size: config.vocab_size,
            pad_idx: config.pad_idx,
            unk_idx: config.unk_idx,
            sos_idx: config.sos_idx,
            hidden_size: h,
            num_layers: config.num_layers,
            word_dropout: config.word_dropout,
        }
    }

    /// Latent code of every sentence: `[batch, latent_size]`.
    pub fn encode(&self, input: Tensor<B, 2, Int>, mask: Tensor<B, 2>, mode: ModelMode) -> Tensor<B, 2> {
        let mut x = self.embed(input, mode);
        let mut summary = Vec::with_capacity(self.encoder.len() * 2);

        for layer in &self.encoder {
            let (out, finals) = layer.forward(x, mask.clone(), None);
            summary.extend(finals.into_iter().map(|state| state.hidden));
            x = out;
        }

        self.hidden2latent.forward(Tensor::cat(summary, 1))
    }

    /// `[batch, steps, vocab]` log-probabilities of the next token.
    pub fn decode(
        &self,
        input: Tensor<B, 2, Int>,
        mask: Tensor<B, 2>,
        latent: Tensor<B, 2>,
        mode: ModelMode,
    ) -> Tensor<B, 3> {
        let input = if mode.is_training() && self.word_dropout > 0.0 {
            self.drop_words(input)
        } else {
            input
        };

        let initial = self.latent2hidden.forward(latent).chunk(self.num_layers, 1);
        let mut x = self.embed(input, mode);
        for (layer, hidden) in self.decoder.iter().zip(initial) {
            let (out, _) = layer.forward(x, mask.clone(), Some(layer.initial_state(hidden)));
            x = out;
        }

        activation::log_softmax(self.outputs2vocab.forward(x), 2)
    }

    fn embed(&self, input: Tensor<B, 2, Int>, mode: ModelMode) -> Tensor<B, 3> {
        let embedded = self.embedding.forward(input);
        if mode.is_training() {
            self.embedding_dropout.forward(embedded)
        } else {
            embedded
        }
    }

    /// Replaces decoder inputs other than `<sos>` and `<pad>` by `<unk>`
    /// with probability `word_dropout`.
    fn drop_words(&self, input: Tensor<B, 2, Int>) -> Tensor<B, 2, Int> {
        let prob = Tensor::<B, 2>::random(
            input.dims(),
            Distribution::Uniform(0.0, 1.0),
            &input.device(),
        );
        let droppable = prob.lower_elem(self.word_dropout).float()
            * input.clone().not_equal_elem(self.sos_idx as i64).float()
            * input.clone().not_equal_elem(self.pad_idx as i64).float();

        input.mask_fill(droppable.greater_elem(0.5), self.unk_idx as i64)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    /// Short human-readable layout, written to the run log.
    pub fn describe(&self, rnn_type: RnnType) -> String {
        let bidirectional = self.encoder.first().map_or(1, |l| l.d_output() / self.hidden_size) == 2;
        format!(
            "SentenceRnn(vocab={}, cell={}, hidden={}, layers={}, bidirectional={}, latent={}, word_dropout={}, params={})",
            self.vocab_size,
            rnn_type,
            self.hidden_size,
            self.num_layers,
            bidirectional,
            self.latent_size(),
            self.word_dropout,
            self.num_params(),
        )
    }

    pub fn latent_size(&self) -> usize {
        self.latent2hidden.weight.val().dims()[0]
    }
}

impl<B: Backend> SequenceModel<B> for SentenceRnn<B> {
    fn log_probs(&self, input: Tensor<B, 2, Int>, lengths: &[usize], mode: ModelMode) -> Tensor<B, 3> {
        let [batch_size, max_len] = input.dims();
        let steps = lengths.iter().copied().max().unwrap_or(0).clamp(1, max_len.max(1));
        let input = input.slice([0..batch_size, 0..steps]);
        let mask = length_mask::<B>(lengths, steps, &input.device());

        let latent = self.encode(input.clone(), mask.clone(), mode);
        self.decode(input, mask, latent, mode)
    }

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn pad_idx(&self) -> usize {
        self.pad_idx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::create_batch_tensor;
    use burn::backend::ndarray::{NdArray, NdArrayDevice};

    type B = NdArray;

    fn tiny(rnn_type: RnnType) -> SentenceRnnConfig {
        SentenceRnnConfig::new(12)
            .with_rnn_type(rnn_type)
            .with_embedding_size(6)
            .with_hidden_size(5)
            .with_latent_size(3)
    }

    #[test]
    fn test_output_is_truncated_to_longest_row() {
        let device = NdArrayDevice::Cpu;
        let model = SentenceRnn::<B>::new(&tiny(RnnType::Gru), &device);
        let input = create_batch_tensor::<B>(&[2, 4, 5, 0, 0, 2, 6, 0, 0, 0], [2, 5], &device);

        let logp = model.log_probs(input, &[3, 2], ModelMode::Evaluation);
        assert_eq!(logp.dims(), [2, 3, 12]);
    }

    #[test]
    fn test_rows_are_distributions() {
        let device = NdArrayDevice::Cpu;
        let model = SentenceRnn::<B>::new(&tiny(RnnType::Lstm), &device);
        let input = create_batch_tensor::<B>(&[2, 7, 8, 9], [1, 4], &device);

        let logp = model.log_probs(input, &[4], ModelMode::Evaluation);
        let sums: Vec<f32> = logp.exp().sum_dim(2).into_data().iter::<f32>().collect();
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-4));
    }

    #[test]
    fn test_word_dropout_keeps_sos_and_pad() {
        let device = NdArrayDevice::Cpu;
        let config = tiny(RnnType::Rnn).with_word_dropout(1.0);
        let model = SentenceRnn::<B>::new(&config, &device);
        let input = create_batch_tensor::<B>(&[2, 5, 6, 0], [1, 4], &device);

        let dropped: Vec<i64> = model
            .drop_words(input)
            .into_data()
            .convert::<i64>()
            .iter::<i64>()
            .collect();
        assert_eq!(dropped, vec![2, 1, 1, 0]);
    }
}
