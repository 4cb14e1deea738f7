//! Question → answer resolution.
//!
//! [`Resolver::resolve`] first consults the [`CannedAnswerTable`]; only when
//! no keyword matches is the injected [`Generator`] asked to continue the
//! HR prompt, after which the output is cleaned up by [`sanitize`].

pub mod sanitize;

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::canned::CannedAnswerTable;
use crate::engine::{GenerationError, Generator, SamplingParams};
use crate::prompt::build_prompt;

/// Prefix of the message returned by [`Resolver::answer_or_apology`] when
/// the generator fails.
pub const APOLOGY_PREFIX: &str =
    "I apologize, but I encountered an error while processing your request. Error: ";

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The question was the empty string.
    #[error("No question provided")]
    EmptyQuestion,

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Where an answer came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSource {
    Canned { keyword: String },
    Generated,
    /// The generator failed and the apology text was substituted.
    Apology,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub answer: String,
    pub source: AnswerSource,
}

/// Stateless answer policy over a fixed table and a shared model.
pub struct Resolver {
    table: CannedAnswerTable,
    generator: Arc<dyn Generator>,
    params: SamplingParams,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("topics", &self.table.len())
            .field("generator", &self.generator.name())
            .field("params", &self.params)
            .finish()
    }
}

impl Resolver {
    /// Resolver with the stock HR table and default sampling parameters.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            table: CannedAnswerTable::default(),
            generator,
            params: SamplingParams::default(),
        }
    }

    pub fn with_table(mut self, table: CannedAnswerTable) -> Self {
        self.table = table;
        self
    }

    pub fn with_params(mut self, params: SamplingParams) -> Self {
        self.params = params;
        self
    }

    pub fn generator_name(&self) -> &str {
        self.generator.name()
    }

    pub fn params(&self) -> &SamplingParams {
        &self.params
    }

    /// Answer `question`, propagating generator failures to the caller.
    ///
    /// # Errors
    ///
    /// [`ResolveError::EmptyQuestion`] for `""`, and
    /// [`ResolveError::Generation`] when the model call fails.
    pub fn resolve(&self, question: &str) -> Result<Resolution, ResolveError> {
        if question.is_empty() {
            return Err(ResolveError::EmptyQuestion);
        }

        if let Some(hit) = self.table.lookup(question) {
            debug!(keyword = %hit.keyword, "canned answer matched");
            return Ok(Resolution {
                answer: hit.answer.clone(),
                source: AnswerSource::Canned {
                    keyword: hit.keyword.clone(),
                },
            });
        }

        let prompt = build_prompt(question);
        let raw = self.generator.generate(&prompt, &self.params)?;
        let extracted = sanitize::extract_answer(&raw, &prompt);
        info!(
            generator = self.generator.name(),
            raw_len = raw.len(),
            extracted_len = extracted.len(),
            "generated answer"
        );

        Ok(Resolution {
            answer: sanitize::finalize(extracted),
            source: AnswerSource::Generated,
        })
    }

    /// Like [`resolve`](Self::resolve) but generator failures become an
    /// apology answer embedding the error text.
    ///
    /// # Errors
    ///
    /// Only [`ResolveError::EmptyQuestion`].
    pub fn answer_or_apology(&self, question: &str) -> Result<Resolution, ResolveError> {
        match self.resolve(question) {
            Err(ResolveError::Generation(e)) => {
                warn!(error = %e, "generation failed; answering with apology");
                Ok(Resolution {
                    answer: format!("{APOLOGY_PREFIX}{e}"),
                    source: AnswerSource::Apology,
                })
            }
            other => other,
        }
    }
}
