use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use netradar::analyzer::ImpactAnalyzer;
use netradar::api;
use netradar::cache::TtlCache;
use netradar::config::Config;
use netradar::gatherer::IntelligenceGatherer;
use netradar::gazetteer::Gazetteer;
use netradar::interpreter::QueryInterpreter;
use netradar::llm::ModelClient;
use netradar::logging::configure_logging;
use netradar::orchestrator::PipelineOrchestrator;
use netradar::sources::{OpenWeatherSource, WebSearchSource};

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let config = Config::from_env();
    let gazetteer = Arc::new(Gazetteer::from_env());

    let interpreter_model = Arc::new(ModelClient::new(config.interpreter_model.clone()));
    let analyzer_model = Arc::new(ModelClient::new(config.analyzer_model.clone()));

    let search_cache = Arc::new(TtlCache::new(config.cache_ttl));
    let weather_cache = Arc::new(TtlCache::new(config.cache_ttl));
    let result_cache = Arc::new(TtlCache::new(config.cache_ttl));

    let evidence = Arc::new(WebSearchSource::new(search_cache));
    let weather = Arc::new(OpenWeatherSource::new(
        config.openweather_api_key.clone(),
        config.openweather_base_url.clone(),
        config.fetch_timeout,
        weather_cache,
    ));

    let orchestrator = Arc::new(PipelineOrchestrator::new(
        QueryInterpreter::new(
            interpreter_model,
            gazetteer.clone(),
            config.default_city.clone(),
            config.carriers.clone(),
            config.max_search_queries,
        ),
        IntelligenceGatherer::new(
            evidence,
            weather,
            gazetteer.clone(),
            config.default_city.clone(),
            config.results_per_query,
        ),
        ImpactAnalyzer::new(analyzer_model, gazetteer, config.default_city.clone()),
        result_cache,
        config.max_areas,
        config.min_confidence,
    ));

    info!("netradar starting on {}", config.listen_addr);
    api::serve(orchestrator, &config.listen_addr).await
}
