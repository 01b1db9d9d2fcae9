pub mod analyzer;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod gatherer;
pub mod gazetteer;
pub mod geo;
pub mod interpreter;
pub mod llm;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod sources;
pub mod types;
pub mod util;

#[cfg(test)]
pub(crate) mod testing;

pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_ANALYSIS: &str = "analysis";
