use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tracing::{debug, info};

use crate::cache::TtlCache;
use crate::types::EvidenceItem;
use crate::TARGET_WEB_REQUEST;

/// One place to fetch raw evidence text about a possible disruption.
/// Implementations are independently poolable and independently failable.
#[async_trait]
pub trait EvidenceSource: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>>;
}

/// Built-in web search behind the `EvidenceSource` contract.
///
/// Real search-engine integration is deliberately out of scope; this source
/// synthesizes plausible result sets keyed off the query terms so the rest
/// of the pipeline exercises realistic data. Per-query results are memoized
/// in the shared TTL cache.
pub struct WebSearchSource {
    cache: Arc<TtlCache<Vec<EvidenceItem>>>,
}

impl WebSearchSource {
    pub fn new(cache: Arc<TtlCache<Vec<EvidenceItem>>>) -> Self {
        WebSearchSource { cache }
    }

    fn build_results(query: &str) -> Vec<EvidenceItem> {
        let terms = query.to_lowercase();
        let location = if terms.contains("downtown") {
            "Downtown"
        } else {
            "Area"
        };
        let event = if terms.contains("ice") || terms.contains("storm") {
            "ice storm"
        } else if terms.contains("power") {
            "power outage"
        } else {
            "outage"
        };
        let slug = event.replace(' ', "-");
        let now = Utc::now();

        let item = |title: String, snippet: String, url: String, hours_ago: i64, source: &str| {
            EvidenceItem {
                title: Some(title),
                snippet: Some(snippet),
                url: Some(url),
                date: Some((now - ChronoDuration::hours(hours_ago)).to_rfc3339()),
                source: Some(source.to_string()),
            }
        };

        vec![
            item(
                format!("Breaking: {event} causes network outages in {location}"),
                format!(
                    "Multiple telecommunications providers are reporting widespread service \
                     disruptions in the {location} area. The {event} has affected cellular \
                     towers and network infrastructure; customers report complete loss of \
                     signal in several neighborhoods."
                ),
                format!("https://news.example.com/network-outage-{slug}"),
                0,
                "Local News Network",
            ),
            item(
                format!("Carrier confirms service interruption during {event}"),
                format!(
                    "A statement acknowledges service disruptions affecting approximately \
                     15,000 customers. Twelve cell towers in the {location} core are \
                     currently offline due to {event} damage and power loss; engineers are \
                     working to restore service."
                ),
                format!("https://carrier.example.com/updates/{slug}"),
                1,
                "Carrier Official",
            ),
            item(
                "Reddit users report widespread network issues".to_string(),
                format!(
                    "Community threads report complete loss of cellular service in {location} \
                     areas beginning around 6 AM, coinciding with the {event}. Many report \
                     being unable to make calls or use data services."
                ),
                format!("https://reddit.example.com/r/outages/network-down-{slug}"),
                2,
                "Reddit Community",
            ),
            item(
                format!("#NetworkDown trends as {event} hits"),
                format!(
                    "Social media reports of outages across {location}; users report no \
                     signal. Estimated impact: thousands of users affected."
                ),
                "https://social.example.com/search?q=%23NetworkDown".to_string(),
                3,
                "Social Media",
            ),
            item(
                format!("Weather service: {event} severity analysis"),
                "Severe conditions reported in the region, with ice accumulation reaching \
                 15mm on infrastructure and wind speeds up to 45 km/h. Power outages are \
                 affecting backup systems for telecommunications equipment."
                    .to_string(),
                format!("https://weather.example.gc.ca/{slug}-warning"),
                4,
                "Environment Canada",
            ),
            item(
                "City emergency services issue advisory".to_string(),
                format!(
                    "Residents of {location} are advised that cellular networks are \
                     experiencing significant disruptions. Citizens should use landlines or \
                     WiFi calling where available; 911 service remains operational."
                ),
                "https://city.example.ca/emergency-advisory".to_string(),
                1,
                "City Emergency Services",
            ),
            item(
                "Utility reports power restoration underway".to_string(),
                format!(
                    "Power has been restored to most areas affected by the {event}, but \
                     telecommunications equipment may take additional time to come back \
                     online as systems reboot and reconnect."
                ),
                "https://hydro.example.com/outages".to_string(),
                0,
                "Hydro Utility",
            ),
        ]
    }
}

#[async_trait]
impl EvidenceSource for WebSearchSource {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<EvidenceItem>> {
        let cache_key = format!("search_{}", query);
        if let Some(cached) = self.cache.get(&cache_key) {
            debug!(target: TARGET_WEB_REQUEST, "search cache hit for '{}'", query);
            return Ok(cached.into_iter().take(limit).collect());
        }

        info!(target: TARGET_WEB_REQUEST, "searching web: '{}'", query);
        let results = Self::build_results(query);
        self.cache.set(cache_key, results.clone());

        Ok(results.into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn source() -> WebSearchSource {
        WebSearchSource::new(Arc::new(TtlCache::new(Duration::from_secs(60))))
    }

    #[tokio::test]
    async fn search_respects_limit_and_carries_urls() {
        let results = source().search("Toronto network outage", 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.url.is_some()));
    }

    #[tokio::test]
    async fn query_terms_shape_the_results() {
        let results = source()
            .search("ice storm downtown Toronto", 10)
            .await
            .unwrap();
        let first_title = results[0].title.as_deref().unwrap();
        assert!(first_title.contains("ice storm"));
        assert!(first_title.contains("Downtown"));
    }

    #[tokio::test]
    async fn repeated_query_is_served_from_cache() {
        let src = source();
        let first = src.search("power outage Ottawa", 10).await.unwrap();
        let second = src.search("power outage Ottawa", 10).await.unwrap();
        // Identical timestamps prove the second set was not regenerated.
        assert_eq!(
            first.iter().map(|r| r.date.clone()).collect::<Vec<_>>(),
            second.iter().map(|r| r.date.clone()).collect::<Vec<_>>()
        );
    }
}
