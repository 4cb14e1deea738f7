mod generator;
mod gpt2;
mod sampling;

pub use generator::{CandleGpt2Generator, ModelSource};
pub use gpt2::{Cache as Gpt2Cache, Config as Gpt2Config, Gpt2};

use super::GenerationError;

impl From<candle_core::Error> for GenerationError {
    fn from(err: candle_core::Error) -> Self {
        GenerationError::Inference(err.to_string())
    }
}

#[cfg(test)]
mod test;
