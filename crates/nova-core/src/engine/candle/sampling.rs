//! Logit shaping applied before each sampling step.

use candle_core::{Result, Tensor};
use candle_transformers::generation::Sampling;

use crate::engine::SamplingParams;

/// Map [`SamplingParams`] onto candle's sampler configuration.
pub(crate) fn sampling_strategy(params: &SamplingParams) -> Sampling {
    if params.temperature <= 0.0 {
        return Sampling::ArgMax;
    }
    match (params.top_k, params.top_p) {
        (0, p) if p >= 1.0 => Sampling::All {
            temperature: params.temperature,
        },
        (0, p) => Sampling::TopP {
            p,
            temperature: params.temperature,
        },
        (k, p) if p >= 1.0 => Sampling::TopK {
            k,
            temperature: params.temperature,
        },
        (k, p) => Sampling::TopKThenTopP {
            k,
            p,
            temperature: params.temperature,
        },
    }
}

/// Tokens that would complete an n-gram of size `n` already present in
/// `tokens`.
pub(crate) fn banned_ngram_tokens(tokens: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || tokens.len() + 1 < n {
        return Vec::new();
    }
    let prefix = &tokens[tokens.len() + 1 - n..];
    tokens
        .windows(n)
        .filter(|w| &w[..n - 1] == prefix)
        .map(|w| w[n - 1])
        .collect()
}

/// Set the logits of `banned` tokens to `-inf`.
pub(crate) fn mask_tokens(logits: &Tensor, banned: &[u32]) -> Result<Tensor> {
    if banned.is_empty() {
        return Ok(logits.clone());
    }
    let mut values = logits.to_vec1::<f32>()?;
    for &token in banned {
        if let Some(v) = values.get_mut(token as usize) {
            *v = f32::NEG_INFINITY;
        }
    }
    let len = values.len();
    Tensor::from_vec(values, len, logits.device())
}
