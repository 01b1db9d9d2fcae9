use std::env;
use std::time::Duration;

use crate::util::get_env_var_as_vec;

/// How a model endpoint expects to be called.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiStyle {
    /// POST `{messages, max_tokens, temperature}` to `/v1/chat/completions`.
    Chat,
    /// POST `{model, prompt, max_tokens, temperature}` to `/v1/completions`.
    Completion,
}

/// One remote text-generation endpoint plus its call parameters.
#[derive(Clone, Debug)]
pub struct ModelConfig {
    pub endpoint: String,
    pub token: String,
    pub model: String,
    pub style: ApiStyle,
    pub max_tokens: u32,
    pub temperature: f32,
    pub max_retries: usize,
    /// Per-call model timeout, separate from the general I/O timeout.
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub interpreter_model: ModelConfig,
    pub analyzer_model: ModelConfig,
    /// Timeout for evidence and weather fetches.
    pub fetch_timeout: Duration,
    pub cache_ttl: Duration,
    pub max_search_queries: usize,
    pub results_per_query: usize,
    pub max_areas: usize,
    pub min_confidence: f64,
    pub default_city: String,
    /// Carrier names woven into fallback search queries. Configuration, not
    /// pipeline logic.
    pub carriers: Vec<String>,
    pub openweather_api_key: Option<String>,
    pub openweather_base_url: String,
    pub listen_addr: String,
}

fn env_or(var: &str, default: &str) -> String {
    env::var(var).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(var: &str, default: T) -> T {
    env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let model_timeout = Duration::from_secs(env_parse("MODEL_TIMEOUT_SECS", 120));
        let max_retries = env_parse("MODEL_MAX_RETRIES", 3);

        let interpreter_model = ModelConfig {
            endpoint: env_or("INTERPRETER_ENDPOINT", "http://localhost:8000"),
            token: env_or("INTERPRETER_TOKEN", ""),
            model: env_or("INTERPRETER_MODEL", "interpreter"),
            style: ApiStyle::Chat,
            max_tokens: env_parse("INTERPRETER_MAX_TOKENS", 1000),
            temperature: env_parse("INTERPRETER_TEMPERATURE", 0.3),
            max_retries,
            timeout: model_timeout,
        };

        let analyzer_model = ModelConfig {
            endpoint: env_or("ANALYZER_ENDPOINT", "http://localhost:8001"),
            token: env_or("ANALYZER_TOKEN", ""),
            model: env_or("ANALYZER_MODEL", "analyzer"),
            style: ApiStyle::Completion,
            max_tokens: env_parse("ANALYZER_MAX_TOKENS", 3000),
            temperature: env_parse("ANALYZER_TEMPERATURE", 0.4),
            max_retries,
            timeout: model_timeout,
        };

        let mut carriers = get_env_var_as_vec("CARRIER_NAMES", ',');
        carriers.retain(|c| !c.is_empty());
        if carriers.is_empty() {
            carriers = vec!["telus".into(), "rogers".into(), "bell".into()];
        }

        Config {
            interpreter_model,
            analyzer_model,
            fetch_timeout: Duration::from_secs(env_parse("FETCH_TIMEOUT_SECS", 30)),
            cache_ttl: Duration::from_secs(env_parse("CACHE_TTL_SECS", 300)),
            max_search_queries: env_parse("MAX_SEARCH_QUERIES", 5),
            results_per_query: env_parse("RESULTS_PER_QUERY", 10),
            max_areas: env_parse("MAX_AREAS_RETURNED", 10),
            min_confidence: env_parse("MIN_CONFIDENCE_THRESHOLD", 0.65),
            default_city: env_or("DEFAULT_CITY", "Toronto"),
            carriers,
            openweather_api_key: env::var("OPENWEATHER_API_KEY").ok().filter(|k| !k.is_empty()),
            openweather_base_url: env_or(
                "OPENWEATHER_BASE_URL",
                "https://api.openweathermap.org/data/2.5",
            ),
            listen_addr: env_or("LISTEN_ADDR", "0.0.0.0:5001"),
        }
    }
}
