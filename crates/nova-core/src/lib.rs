//! Answer policy for the nova HR assistant.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nova_core::engine::candle::{CandleGpt2Generator, ModelSource};
//! use nova_core::Resolver;
//!
//! let generator = CandleGpt2Generator::load(&ModelSource::Hub {
//!     repo: "openai-community/gpt2".into(),
//! })
//! .unwrap();
//! let resolver = Resolver::new(Arc::new(generator));
//! let answer = resolver.resolve("How do I request time off?").unwrap();
//! println!("{}", answer.answer);
//! ```

pub mod canned;
pub mod engine;
pub mod prompt;
pub mod resolver;

pub use canned::{CannedAnswer, CannedAnswerTable};
pub use engine::{GenerationError, Generator, SamplingParams};
pub use resolver::{AnswerSource, Resolution, ResolveError, Resolver};
