use std::sync::Arc;

use tracing::{info, warn};

use crate::error::PipelineError;
use crate::gazetteer::Gazetteer;
use crate::llm::TextGenerator;
use crate::prompt;
use crate::types::{EventType, GeographicScope, QueryEvent, QueryMetadata};
use crate::util::extract_json_object;
use crate::TARGET_ANALYSIS;

/// Stage 1: turns the raw question into structured query metadata and a set
/// of search queries. Parse failures of the model reply never escape: the
/// rule-based fallback always produces usable metadata.
pub struct QueryInterpreter {
    model: Arc<dyn TextGenerator>,
    gazetteer: Arc<Gazetteer>,
    default_city: String,
    carriers: Vec<String>,
    max_queries: usize,
}

impl QueryInterpreter {
    pub fn new(
        model: Arc<dyn TextGenerator>,
        gazetteer: Arc<Gazetteer>,
        default_city: String,
        carriers: Vec<String>,
        max_queries: usize,
    ) -> Self {
        QueryInterpreter {
            model,
            gazetteer,
            default_city,
            carriers,
            max_queries,
        }
    }

    pub async fn interpret(&self, question: &str) -> Result<QueryMetadata, PipelineError> {
        info!(target: TARGET_ANALYSIS, "stage 1: interpreting query");

        let system = prompt::extraction_system_prompt();
        let user = prompt::extraction_user_prompt(question);
        let raw = self.model.generate(&user, Some(system.as_str())).await?;

        match Self::parse_response(&raw, self.max_queries) {
            Ok(metadata) => {
                if metadata.search_queries.len() < 3 {
                    warn!(target: TARGET_ANALYSIS, "only {} search queries generated (recommended: 3-5)", metadata.search_queries.len());
                }
                info!(target: TARGET_ANALYSIS, "extracted {} event(s), {} search queries", metadata.events.len(), metadata.search_queries.len());
                Ok(metadata)
            }
            Err(err) => {
                warn!(target: TARGET_ANALYSIS, "query parse failed ({}), using rule-based fallback", err);
                Ok(self.fallback(question))
            }
        }
    }

    fn parse_response(raw: &str, max_queries: usize) -> Result<QueryMetadata, PipelineError> {
        let span = extract_json_object(raw).ok_or_else(|| {
            PipelineError::MalformedModelOutput("no JSON object in reply".to_string())
        })?;
        let mut metadata: QueryMetadata = serde_json::from_str(span)
            .map_err(|e| PipelineError::MalformedModelOutput(e.to_string()))?;

        if metadata.events.is_empty() || metadata.search_queries.is_empty() {
            return Err(PipelineError::MalformedModelOutput(
                "events or search_queries empty".to_string(),
            ));
        }

        metadata.search_queries.truncate(max_queries);
        Ok(metadata)
    }

    /// Deterministic extraction from a fixed vocabulary. Total: always yields
    /// at least one event and exactly `max_queries` search queries.
    fn fallback(&self, question: &str) -> QueryMetadata {
        info!(target: TARGET_ANALYSIS, "generating fallback metadata");
        let lower = question.to_lowercase();

        let event_type = if contains_any(&lower, &["storm", "ice", "snow", "rain", "weather"]) {
            EventType::WeatherRelated
        } else if contains_any(&lower, &["power", "electricity", "grid"]) {
            EventType::PowerOutage
        } else if contains_any(&lower, &["equipment", "tower", "failure"]) {
            EventType::EquipmentFailure
        } else {
            EventType::Unknown
        };

        let location = self
            .gazetteer
            .find_in_text(question)
            .map(title_case)
            .unwrap_or_else(|| self.default_city.clone());

        let timeframe = if contains_any(&lower, &["today", "now", "current"]) {
            "today"
        } else if lower.contains("yesterday") {
            "yesterday"
        } else if lower.contains("last week") || lower.contains("this week") {
            "this week"
        } else {
            "recent"
        }
        .to_string();

        let carrier = self.carriers.first().map(String::as_str).unwrap_or("telus");
        let mut search_queries = vec![
            format!("{location} network outage {timeframe}"),
            format!("{carrier} {location} service disruption"),
            format!("{location} cellular network down"),
            format!("{} {location} telecommunications", event_type.as_str()),
            format!("{location} cell tower outage {timeframe}"),
        ];
        search_queries.truncate(self.max_queries);

        let requires_weather_data = event_type == EventType::WeatherRelated;

        QueryMetadata {
            events: vec![QueryEvent {
                event_type,
                primary_location: location,
                timeframe,
                keywords: question
                    .split_whitespace()
                    .take(5)
                    .map(str::to_string)
                    .collect(),
            }],
            search_queries,
            requires_weather_data,
            geographic_scope: GeographicScope::City,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedGenerator;

    fn interpreter(model: ScriptedGenerator) -> QueryInterpreter {
        QueryInterpreter::new(
            Arc::new(model),
            Arc::new(Gazetteer::builtin()),
            "Toronto".to_string(),
            vec!["telus".to_string(), "rogers".to_string()],
            5,
        )
    }

    #[tokio::test]
    async fn garbage_model_output_falls_back_deterministically() {
        let interp = interpreter(ScriptedGenerator::garbage());
        let metadata = interp
            .interpret("What areas were affected by the ice storm in Toronto yesterday?")
            .await
            .unwrap();

        assert_eq!(metadata.events.len(), 1);
        assert_eq!(metadata.events[0].event_type, EventType::WeatherRelated);
        assert_eq!(metadata.events[0].primary_location, "Toronto");
        assert_eq!(metadata.events[0].timeframe, "yesterday");
        assert_eq!(metadata.search_queries.len(), 5);
        assert!(metadata.requires_weather_data);
    }

    #[tokio::test]
    async fn fallback_defaults_location_and_timeframe() {
        let interp = interpreter(ScriptedGenerator::garbage());
        let metadata = interp
            .interpret("Why is my phone not working properly?")
            .await
            .unwrap();

        assert_eq!(metadata.events[0].primary_location, "Toronto");
        assert_eq!(metadata.events[0].timeframe, "recent");
        assert_eq!(metadata.events[0].event_type, EventType::Unknown);
        assert!(!metadata.requires_weather_data);
    }

    #[tokio::test]
    async fn well_formed_reply_in_code_fence_is_parsed() {
        let reply = r#"Here you go:
```json
{
  "events": [{"event_type": "power_outage", "primary_location": "Calgary", "timeframe": "today", "keywords": ["power"]}],
  "search_queries": ["Calgary power outage today", "Calgary grid failure"],
  "requires_weather_data": false,
  "geographic_scope": "city"
}
```"#;
        let interp = interpreter(ScriptedGenerator::repeating(reply));
        let metadata = interp.interpret("Is the power out in Calgary?").await.unwrap();

        assert_eq!(metadata.events[0].event_type, EventType::PowerOutage);
        assert_eq!(metadata.events[0].primary_location, "Calgary");
        assert_eq!(metadata.search_queries.len(), 2);
        assert_eq!(metadata.geographic_scope, GeographicScope::City);
    }

    #[tokio::test]
    async fn empty_search_queries_trigger_fallback() {
        let reply = r#"{"events": [{"event_type": "unknown"}], "search_queries": []}"#;
        let interp = interpreter(ScriptedGenerator::repeating(reply));
        let metadata = interp
            .interpret("Anything going on with the network in Ottawa?")
            .await
            .unwrap();

        // Fallback engaged: queries synthesized, location from the gazetteer.
        assert_eq!(metadata.search_queries.len(), 5);
        assert_eq!(metadata.events[0].primary_location, "Ottawa");
    }

    #[tokio::test]
    async fn excess_queries_are_truncated() {
        let reply = r#"{
            "events": [{"event_type": "unknown", "primary_location": "Toronto"}],
            "search_queries": ["a", "b", "c", "d", "e", "f", "g"]
        }"#;
        let interp = interpreter(ScriptedGenerator::repeating(reply));
        let metadata = interp.interpret("What is happening in Toronto?").await.unwrap();
        assert_eq!(metadata.search_queries.len(), 5);
    }

    #[tokio::test]
    async fn model_timeout_propagates() {
        let interp = interpreter(ScriptedGenerator::new(vec![Err(
            PipelineError::ModelTimeout,
        )]));
        let err = interp
            .interpret("What areas were affected by the storm?")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ModelTimeout));
    }
}
