//! Text generation backends.
//!
//! The resolver only sees the [`Generator`] trait; the concrete model is
//! chosen at start-up and injected. With the `candle` feature (default) a
//! GPT-2 implementation evaluated by candle is available in [`candle`].

#[cfg(feature = "candle")]
pub mod candle;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors a generation backend can report.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Failed to load model from {location}: {message}")]
    LoadModel { location: String, message: String },

    #[error("Failed to tokenize prompt: {message}")]
    Tokenize { message: String },

    #[error("Failed to decode generated tokens: {message}")]
    Decode { message: String },

    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Sampling knobs passed to every [`Generator::generate`] call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Upper bound on generated tokens.
    pub max_new_tokens: usize,
    /// Prompts longer than this many tokens are truncated from the end.
    pub max_prompt_tokens: usize,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    /// Forbid any n-gram of this size from occurring twice. `0` disables.
    pub no_repeat_ngram_size: usize,
    /// Penalty applied to logits of already-seen tokens. `1.0` disables.
    pub repetition_penalty: f32,
    /// Fixed RNG seed; a fresh random seed is drawn per call when `None`.
    pub seed: Option<u64>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 150,
            max_prompt_tokens: 512,
            temperature: 0.7,
            top_k: 50,
            top_p: 0.9,
            no_repeat_ngram_size: 3,
            repetition_penalty: 1.0,
            seed: None,
        }
    }
}

impl SamplingParams {
    /// The configured seed, or a random one.
    pub fn seed_or_random(&self) -> u64 {
        self.seed
            .unwrap_or_else(|| uuid::Uuid::new_v4().as_u64_pair().0)
    }
}

/// A causal language model that continues a prompt.
///
/// Implementations must be shareable across request handlers; `generate`
/// takes `&self` and is expected to be called from a blocking thread.
pub trait Generator: Send + Sync + 'static {
    /// Continue `prompt`. The returned text may start with the prompt itself.
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, GenerationError>;

    /// Short human-readable identifier for logs and health output.
    fn name(&self) -> &str;
}
