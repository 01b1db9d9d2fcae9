use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use crate::gazetteer::Gazetteer;
use crate::sources::{EvidenceSource, WeatherSource};
use crate::types::{EvidenceItem, IntelligenceBundle, QueryMetadata, WeatherSnapshot};
use crate::TARGET_ANALYSIS;

/// Stage 2: fans the search queries out concurrently, deduplicates the
/// merged results, and fetches a weather reading when the query calls for
/// one. Source failures degrade the bundle instead of aborting it.
pub struct IntelligenceGatherer {
    evidence: Arc<dyn EvidenceSource>,
    weather: Arc<dyn WeatherSource>,
    gazetteer: Arc<Gazetteer>,
    default_city: String,
    results_per_query: usize,
}

impl IntelligenceGatherer {
    pub fn new(
        evidence: Arc<dyn EvidenceSource>,
        weather: Arc<dyn WeatherSource>,
        gazetteer: Arc<Gazetteer>,
        default_city: String,
        results_per_query: usize,
    ) -> Self {
        IntelligenceGatherer {
            evidence,
            weather,
            gazetteer,
            default_city,
            results_per_query,
        }
    }

    pub async fn gather(&self, metadata: &QueryMetadata) -> IntelligenceBundle {
        info!(
            target: TARGET_ANALYSIS,
            "stage 2: gathering intelligence across {} queries (weather: {})",
            metadata.search_queries.len(),
            metadata.requires_weather_data
        );

        let (evidence_items, weather) = tokio::join!(
            self.search_all(&metadata.search_queries),
            self.weather_for(metadata)
        );

        info!(
            target: TARGET_ANALYSIS,
            "gathered {} evidence items, weather: {}",
            evidence_items.len(),
            weather.is_some()
        );

        IntelligenceBundle {
            evidence_items,
            weather,
            queries_used: metadata.search_queries.clone(),
        }
    }

    /// All queries run concurrently. A failed query is logged and skipped;
    /// the merged results are deduplicated by URL, first occurrence wins.
    async fn search_all(&self, queries: &[String]) -> Vec<EvidenceItem> {
        let searches = queries
            .iter()
            .map(|query| async move {
                match self.evidence.search(query, self.results_per_query).await {
                    Ok(items) => items,
                    Err(err) => {
                        warn!(target: TARGET_ANALYSIS, "search '{}' failed: {}", query, err);
                        Vec::new()
                    }
                }
            })
            .collect::<Vec<_>>();

        let merged: Vec<EvidenceItem> = join_all(searches).await.into_iter().flatten().collect();
        let total = merged.len();

        let mut seen = HashSet::new();
        let deduped: Vec<EvidenceItem> = merged
            .into_iter()
            .filter(|item| match &item.url {
                Some(url) => seen.insert(url.clone()),
                // No URL means no identity to dedup on.
                None => false,
            })
            .collect();

        let removed = total - deduped.len();
        if removed > 0 {
            info!(target: TARGET_ANALYSIS, "removed {} duplicate or unidentified results", removed);
        }
        deduped
    }

    async fn weather_for(&self, metadata: &QueryMetadata) -> Option<WeatherSnapshot> {
        if !metadata.requires_weather_data {
            return None;
        }
        let location = metadata
            .events
            .first()
            .map(|e| e.primary_location.as_str())
            .unwrap_or(&self.default_city);
        let (lat, lon) = self.gazetteer.resolve_or_default(location, &self.default_city);

        match self.weather.current(lat, lon).await {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(target: TARGET_ANALYSIS, "weather lookup for '{}' failed: {}", location, err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        evidence, FailingEvidenceSource, FailingWeatherSource, FixedWeatherSource,
        StaticEvidenceSource,
    };
    use crate::types::{EventType, GeographicScope, QueryEvent};

    fn metadata(queries: &[&str], requires_weather: bool) -> QueryMetadata {
        QueryMetadata {
            events: vec![QueryEvent {
                event_type: EventType::WeatherRelated,
                primary_location: "Toronto".to_string(),
                timeframe: "recent".to_string(),
                keywords: vec![],
            }],
            search_queries: queries.iter().map(|q| q.to_string()).collect(),
            requires_weather_data: requires_weather,
            geographic_scope: GeographicScope::City,
        }
    }

    fn gatherer(
        evidence: Arc<dyn EvidenceSource>,
        weather: Arc<dyn WeatherSource>,
    ) -> IntelligenceGatherer {
        IntelligenceGatherer::new(
            evidence,
            weather,
            Arc::new(Gazetteer::builtin()),
            "Toronto".to_string(),
            10,
        )
    }

    #[tokio::test]
    async fn duplicate_urls_are_removed_first_wins() {
        let mut first = evidence("https://a.example.com/1");
        first.title = Some("kept".to_string());
        let mut dup = evidence("https://a.example.com/1");
        dup.title = Some("dropped".to_string());
        let items = vec![first, dup, evidence("https://b.example.com/2")];

        let source = Arc::new(StaticEvidenceSource::new(items));
        let g = gatherer(source.clone(), Arc::new(FixedWeatherSource::new()));
        let bundle = g.gather(&metadata(&["q1"], false)).await;

        assert_eq!(bundle.evidence_items.len(), 2);
        assert_eq!(bundle.evidence_items[0].title.as_deref(), Some("kept"));
    }

    #[tokio::test]
    async fn urlless_items_are_dropped() {
        let mut anonymous = evidence("ignored");
        anonymous.url = None;
        let items = vec![anonymous, evidence("https://b.example.com/2")];

        let g = gatherer(
            Arc::new(StaticEvidenceSource::new(items)),
            Arc::new(FixedWeatherSource::new()),
        );
        let bundle = g.gather(&metadata(&["q1"], false)).await;
        assert_eq!(bundle.evidence_items.len(), 1);
    }

    #[tokio::test]
    async fn all_searches_failing_yields_empty_bundle() {
        let g = gatherer(
            Arc::new(FailingEvidenceSource),
            Arc::new(FixedWeatherSource::new()),
        );
        let bundle = g.gather(&metadata(&["q1", "q2", "q3"], false)).await;
        assert!(bundle.evidence_items.is_empty());
        assert_eq!(bundle.queries_used.len(), 3);
    }

    #[tokio::test]
    async fn weather_fetched_only_when_required() {
        let weather = Arc::new(FixedWeatherSource::new());
        let source = Arc::new(StaticEvidenceSource::new(vec![evidence(
            "https://a.example.com/1",
        )]));

        let g = gatherer(source.clone(), weather.clone());
        let without = g.gather(&metadata(&["q1"], false)).await;
        assert!(without.weather.is_none());
        assert_eq!(weather.call_count(), 0);

        let with = g.gather(&metadata(&["q1"], true)).await;
        assert!(with.weather.is_some());
        assert_eq!(weather.call_count(), 1);
    }

    #[tokio::test]
    async fn weather_failure_degrades_to_none() {
        let g = gatherer(
            Arc::new(StaticEvidenceSource::new(vec![evidence(
                "https://a.example.com/1",
            )])),
            Arc::new(FailingWeatherSource),
        );
        let bundle = g.gather(&metadata(&["q1"], true)).await;
        assert!(bundle.weather.is_none());
        assert_eq!(bundle.evidence_items.len(), 1);
    }

    #[tokio::test]
    async fn every_query_is_dispatched() {
        let source = Arc::new(StaticEvidenceSource::new(vec![evidence(
            "https://a.example.com/1",
        )]));
        let g = gatherer(source.clone(), Arc::new(FixedWeatherSource::new()));
        g.gather(&metadata(&["q1", "q2", "q3", "q4"], false)).await;
        assert_eq!(source.call_count(), 4);
    }
}
