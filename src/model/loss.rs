//! Masked negative log-likelihood over padded sequences

use burn::tensor::{backend::Backend, ElementConversion, Int, Tensor};

use crate::error::{Result, SentenceRnnError};

/// Mean NLL over every target position that is not `pad_idx`.
///
/// `logp` is `[batch, steps, vocab]` with `steps` either `max(lengths)` or
/// the padded length of `target`; `target` is `[batch, padded_len]`.
/// Target columns past `max(lengths)` are dropped before scoring.
///
/// A batch with no scorable position yields exactly 0.0. The result stays on
/// the autodiff graph in that case, so backward gives zero gradients.
pub fn masked_nll<B: Backend>(
    logp: Tensor<B, 3>,
    target: Tensor<B, 2, Int>,
    lengths: &[usize],
    pad_idx: usize,
) -> Result<Tensor<B, 1>> {
    let [batch_size, steps, vocab_size] = logp.dims();
    let [target_rows, padded_len] = target.dims();

    if batch_size != target_rows || batch_size != lengths.len() {
        return Err(SentenceRnnError::ShapeMismatch {
            expected: format!("batch of {} rows", batch_size),
            got: format!("target rows {}, lengths {}", target_rows, lengths.len()),
        });
    }

    let max_len = lengths.iter().copied().max().unwrap_or(0);
    if max_len == 0 || max_len > padded_len {
        return Err(SentenceRnnError::DataIntegrity(format!(
            "max length {} must lie in 1..={}",
            max_len, padded_len
        )));
    }

    let logp = if steps == max_len {
        logp
    } else if steps == padded_len {
        logp.slice([0..batch_size, 0..max_len, 0..vocab_size])
    } else {
        return Err(SentenceRnnError::ShapeMismatch {
            expected: format!("{} or {} steps", max_len, padded_len),
            got: format!("{} steps", steps),
        });
    };

    let rows = batch_size * max_len;
    let target = target.slice([0..batch_size, 0..max_len]).reshape([rows]);
    let logp = logp.reshape([rows, vocab_size]);

    let picked = logp.gather(1, target.clone().reshape([rows, 1])).reshape([rows]);
    let scored = target.not_equal_elem(pad_idx as i64).float();

    let total = (picked * scored.clone()).sum().neg();
    let count = scored.sum().clamp_min(1.0);
    Ok(total / count)
}

/// Plain value of a scalar loss.
pub fn loss_value<B: Backend>(loss: Tensor<B, 1>) -> f64 {
    loss.into_scalar().elem::<f64>()
}
