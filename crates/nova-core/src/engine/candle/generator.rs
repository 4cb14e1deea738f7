use std::fmt;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::utils::apply_repeat_penalty;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use super::gpt2::{Config, Gpt2};
use super::sampling::{banned_ngram_tokens, mask_tokens, sampling_strategy};
use crate::engine::{GenerationError, Generator, SamplingParams};

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const SAFETENSORS_FILE: &str = "model.safetensors";
const PTH_FILE: &str = "pytorch_model.bin";
const END_OF_TEXT: &str = "<|endoftext|>";

/// Where GPT-2 weights are loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelSource {
    /// A local directory holding `config.json`, `tokenizer.json` and
    /// `model.safetensors` (or `pytorch_model.bin`).
    Dir(PathBuf),
    /// A Hugging Face Hub repository, downloaded into the local cache.
    Hub { repo: String },
}

impl fmt::Display for ModelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelSource::Dir(path) => write!(f, "{}", path.display()),
            ModelSource::Hub { repo } => write!(f, "hf://{repo}"),
        }
    }
}

enum Weights {
    Safetensors(PathBuf),
    Pth(PathBuf),
}

struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: Weights,
}

impl ModelSource {
    fn resolve(&self) -> Result<ModelFiles, GenerationError> {
        match self {
            ModelSource::Dir(dir) => {
                let weights = if dir.join(SAFETENSORS_FILE).is_file() {
                    Weights::Safetensors(dir.join(SAFETENSORS_FILE))
                } else if dir.join(PTH_FILE).is_file() {
                    Weights::Pth(dir.join(PTH_FILE))
                } else {
                    return Err(self.load_error(format!(
                        "neither {SAFETENSORS_FILE} nor {PTH_FILE} found"
                    )));
                };
                Ok(ModelFiles {
                    config: self.require_file(dir, CONFIG_FILE)?,
                    tokenizer: self.require_file(dir, TOKENIZER_FILE)?,
                    weights,
                })
            }
            ModelSource::Hub { repo } => {
                let api = hf_hub::api::sync::Api::new().map_err(|e| self.load_error(e))?;
                let repo = api.model(repo.clone());
                let fetch = |file: &str| repo.get(file).map_err(|e| self.load_error(e));
                let weights = match fetch(SAFETENSORS_FILE) {
                    Ok(path) => Weights::Safetensors(path),
                    Err(_) => Weights::Pth(fetch(PTH_FILE)?),
                };
                Ok(ModelFiles {
                    config: fetch(CONFIG_FILE)?,
                    tokenizer: fetch(TOKENIZER_FILE)?,
                    weights,
                })
            }
        }
    }

    fn require_file(&self, dir: &Path, name: &str) -> Result<PathBuf, GenerationError> {
        let path = dir.join(name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(self.load_error(format!("missing {name}")))
        }
    }

    fn load_error(&self, message: impl ToString) -> GenerationError {
        GenerationError::LoadModel {
            location: self.to_string(),
            message: message.to_string(),
        }
    }
}

/// GPT-2 evaluated with candle, loaded once and shared read-only.
pub struct CandleGpt2Generator {
    model: Gpt2,
    tokenizer: Tokenizer,
    eos_token_id: Option<u32>,
    name: String,
}

impl CandleGpt2Generator {
    /// Load tokenizer, config and weights from `source`.
    ///
    /// Uses the first CUDA device when candle was built with CUDA support,
    /// the CPU otherwise.
    pub fn load(source: &ModelSource) -> Result<Self, GenerationError> {
        let files = source.resolve()?;

        let config_json = std::fs::read_to_string(&files.config).map_err(|e| source.load_error(e))?;
        let config: Config = serde_json::from_str(&config_json).map_err(|e| source.load_error(e))?;
        if config.n_head == 0 || config.n_embd % config.n_head != 0 {
            return Err(source.load_error(format!(
                "n_embd ({}) is not divisible by n_head ({})",
                config.n_embd, config.n_head
            )));
        }

        let tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(|e| source.load_error(e))?;
        let eos_token_id = tokenizer.token_to_id(END_OF_TEXT);

        let device = Device::cuda_if_available(0).map_err(|e| source.load_error(e))?;
        let vb = match &files.weights {
            // SAFETY: the weights file is memory-mapped read-only and not
            // modified while the process runs.
            Weights::Safetensors(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, &device)
            },
            Weights::Pth(path) => VarBuilder::from_pth(path, DType::F32, &device),
        }
        .map_err(|e| source.load_error(e))?;
        let model = Gpt2::load(vb, &config).map_err(|e| source.load_error(e))?;

        info!(
            source = %source,
            layers = config.n_layer,
            n_embd = config.n_embd,
            device = ?device,
            "gpt2 model loaded"
        );

        Ok(Self {
            model,
            tokenizer,
            eos_token_id,
            name: format!("gpt2:{source}"),
        })
    }

    fn encode(&self, prompt: &str, max_prompt_tokens: usize) -> Result<Vec<u32>, GenerationError> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| GenerationError::Tokenize { message: e.to_string() })?;
        let ids = truncate_prompt(
            encoding.get_ids().to_vec(),
            max_prompt_tokens,
            self.model.config().n_positions,
        );
        if ids.is_empty() {
            return Err(GenerationError::Tokenize {
                message: "prompt encodes to zero tokens".into(),
            });
        }
        Ok(ids)
    }
}

/// Keep the head of the prompt: at most `max_prompt_tokens`, and always one
/// position short of the context so there is room to generate.
pub(super) fn truncate_prompt(mut ids: Vec<u32>, max_prompt_tokens: usize, n_positions: usize) -> Vec<u32> {
    let limit = max_prompt_tokens.min(n_positions.saturating_sub(1));
    if ids.len() > limit {
        debug!(prompt_tokens = ids.len(), limit, "truncating prompt");
        ids.truncate(limit);
    }
    ids
}

impl Generator for CandleGpt2Generator {
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, GenerationError> {
        let mut tokens = self.encode(prompt, params.max_prompt_tokens)?;
        let prompt_len = tokens.len();
        let context = self.model.config().n_positions;
        let mut processor =
            LogitsProcessor::from_sampling(params.seed_or_random(), sampling_strategy(params));
        let mut cache = self.model.new_cache();

        for _ in 0..params.max_new_tokens {
            if tokens.len() >= context {
                break;
            }
            // The whole prompt on the first step, the last sampled token after.
            let pending = &tokens[cache.seq_len()..];
            let mut logits = self.model.forward(pending, &mut cache)?.to_dtype(DType::F32)?;
            if params.repetition_penalty != 1.0 {
                logits = apply_repeat_penalty(&logits, params.repetition_penalty, &tokens)?;
            }
            let banned = banned_ngram_tokens(&tokens, params.no_repeat_ngram_size);
            let logits = mask_tokens(&logits, &banned)?;

            let next = processor.sample(&logits)?;
            if Some(next) == self.eos_token_id {
                break;
            }
            tokens.push(next);
        }

        debug!(
            prompt_tokens = prompt_len,
            new_tokens = tokens.len() - prompt_len,
            "gpt2 generation finished"
        );

        self.tokenizer
            .decode(&tokens, true)
            .map_err(|e| GenerationError::Decode { message: e.to_string() })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
