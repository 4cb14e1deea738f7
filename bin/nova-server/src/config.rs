//! Server configuration, loaded from environment variables at startup.

use std::path::PathBuf;

use nova_core::SamplingParams;
use nova_core::engine::candle::ModelSource;

/// Hub repository used when `NOVA_MODEL_DIR` is not set.
pub const DEFAULT_MODEL_REPO: &str = "openai-community/gpt2";

/// Runtime configuration for nova-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5000"`).
    pub bind_address: String,

    /// Local GPT-2 model directory. Takes precedence over `model_repo`.
    pub model_dir: Option<PathBuf>,

    /// Hugging Face Hub repository to download the model from.
    pub model_repo: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Comma-separated list of allowed CORS origins. `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Mount Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Answer with an apology (HTTP 200) instead of HTTP 500 when
    /// generation fails.
    pub apologize_on_error: bool,

    /// Sampling parameters for every generation call.
    pub sampling: SamplingParams,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build [`Config`] from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let flag = |key: &str, default: bool| {
            lookup(key)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };
        let defaults = SamplingParams::default();

        Self {
            bind_address: env_or("NOVA_BIND", "0.0.0.0:5000"),
            model_dir: lookup("NOVA_MODEL_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            model_repo: env_or("NOVA_MODEL_REPO", DEFAULT_MODEL_REPO),
            log_level: env_or("NOVA_LOG", "info"),
            log_json: flag("NOVA_LOG_JSON", false),
            cors_allowed_origins: lookup("NOVA_CORS_ORIGINS").filter(|v| !v.trim().is_empty()),
            enable_swagger: flag("NOVA_ENABLE_SWAGGER", true),
            apologize_on_error: flag("NOVA_APOLOGIZE_ON_ERROR", false),
            sampling: SamplingParams {
                max_new_tokens: parse_or(&lookup, "NOVA_MAX_NEW_TOKENS", defaults.max_new_tokens),
                temperature: parse_or(&lookup, "NOVA_TEMPERATURE", defaults.temperature),
                seed: lookup("NOVA_SEED").and_then(|v| v.parse().ok()),
                ..defaults
            },
        }
    }

    /// Where the generator should load its weights from.
    pub fn model_source(&self) -> ModelSource {
        match &self.model_dir {
            Some(dir) => ModelSource::Dir(dir.clone()),
            None => ModelSource::Hub {
                repo: self.model_repo.clone(),
            },
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.bind_address, "0.0.0.0:5000");
        assert_eq!(cfg.model_dir, None);
        assert_eq!(cfg.model_repo, DEFAULT_MODEL_REPO);
        assert!(cfg.enable_swagger);
        assert!(!cfg.apologize_on_error);
        assert!(!cfg.log_json);
        assert_eq!(cfg.sampling, SamplingParams::default());
        assert_eq!(
            cfg.model_source(),
            ModelSource::Hub {
                repo: DEFAULT_MODEL_REPO.into()
            }
        );
    }

    #[test]
    fn model_dir_takes_precedence() {
        let cfg = config_from(&[
            ("NOVA_MODEL_DIR", "/models/hr_gpt2"),
            ("NOVA_MODEL_REPO", "someone/else"),
        ]);
        assert_eq!(
            cfg.model_source(),
            ModelSource::Dir(PathBuf::from("/models/hr_gpt2"))
        );
    }

    #[test]
    fn flags_and_sampling_overrides_are_parsed() {
        let cfg = config_from(&[
            ("NOVA_LOG_JSON", "TRUE"),
            ("NOVA_ENABLE_SWAGGER", "false"),
            ("NOVA_APOLOGIZE_ON_ERROR", "1"),
            ("NOVA_MAX_NEW_TOKENS", "64"),
            ("NOVA_TEMPERATURE", "0.2"),
            ("NOVA_SEED", "7"),
        ]);
        assert!(cfg.log_json);
        assert!(!cfg.enable_swagger);
        assert!(cfg.apologize_on_error);
        assert_eq!(cfg.sampling.max_new_tokens, 64);
        assert_eq!(cfg.sampling.temperature, 0.2);
        assert_eq!(cfg.sampling.seed, Some(7));
        assert_eq!(cfg.sampling.top_k, 50);
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let cfg = config_from(&[("NOVA_MAX_NEW_TOKENS", "lots"), ("NOVA_SEED", "x")]);
        assert_eq!(cfg.sampling.max_new_tokens, 150);
        assert_eq!(cfg.sampling.seed, None);
    }

    #[test]
    fn blank_cors_origins_mean_any() {
        assert_eq!(config_from(&[("NOVA_CORS_ORIGINS", "  ")]).cors_allowed_origins, None);
    }
}
