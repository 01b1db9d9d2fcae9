use std::sync::Arc;

use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::gazetteer::Gazetteer;
use crate::geo;
use crate::llm::TextGenerator;
use crate::prompt;
use crate::types::{
    AffectedArea, DisruptionEvent, EventType, GeoPoint, IntelligenceBundle, QueryMetadata,
    Severity,
};
use crate::util::extract_json_object;
use crate::TARGET_ANALYSIS;

/// Stage 3: asks the model to reason evidence into named areas with a
/// center point and impact radius, then derives the coordinate ranges
/// locally. Malformed replies degrade to a single low-confidence event.
pub struct ImpactAnalyzer {
    model: Arc<dyn TextGenerator>,
    gazetteer: Arc<Gazetteer>,
    default_city: String,
}

/// Wire shape of the model reply. Every field the model might omit or
/// garble carries an explicit default so one bad area does not sink the
/// whole reply.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    events: Vec<RawEvent>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default = "default_event_name")]
    event_name: String,
    #[serde(default)]
    event_type: EventType,
    #[serde(default = "default_raw_timeframe")]
    timeframe: String,
    #[serde(default)]
    affected_areas: Vec<RawArea>,
}

#[derive(Debug, Deserialize)]
struct RawArea {
    #[serde(default = "default_area_name")]
    area_name: String,
    #[serde(default)]
    severity: Severity,
    #[serde(default = "default_lat")]
    latitude: f64,
    #[serde(default = "default_lon")]
    longitude: f64,
    #[serde(default = "default_radius")]
    radius_km: f64,
    #[serde(default = "default_reasoning")]
    reasoning: String,
    #[serde(
        default = "default_estimated_users",
        deserialize_with = "string_or_number"
    )]
    estimated_users: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    supporting_data_points: u32,
}

fn default_event_name() -> String {
    "Unnamed Event".to_string()
}
fn default_raw_timeframe() -> String {
    "Unknown timeframe".to_string()
}
fn default_area_name() -> String {
    "Unknown Area".to_string()
}
fn default_reasoning() -> String {
    "No reasoning provided".to_string()
}
fn default_estimated_users() -> String {
    "Unknown".to_string()
}
fn default_lat() -> f64 {
    43.6532
}
fn default_lon() -> f64 {
    -79.3832
}
fn default_radius() -> f64 {
    2.0
}
fn default_confidence() -> f64 {
    0.7
}

/// Models sometimes answer `"estimated_users": 15000` instead of the
/// requested string. Accept both.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => default_estimated_users(),
    })
}

impl ImpactAnalyzer {
    pub fn new(
        model: Arc<dyn TextGenerator>,
        gazetteer: Arc<Gazetteer>,
        default_city: String,
    ) -> Self {
        ImpactAnalyzer {
            model,
            gazetteer,
            default_city,
        }
    }

    pub async fn analyze(
        &self,
        metadata: &QueryMetadata,
        bundle: &IntelligenceBundle,
    ) -> Result<Vec<DisruptionEvent>, PipelineError> {
        info!(
            target: TARGET_ANALYSIS,
            "stage 3: analyzing {} evidence items", bundle.evidence_items.len()
        );

        let system = prompt::impact_system_prompt();
        let user = prompt::impact_user_prompt(metadata, bundle);
        let raw = self.model.generate(&user, Some(system.as_str())).await?;

        match Self::parse_response(&raw) {
            Ok(events) => {
                info!(
                    target: TARGET_ANALYSIS,
                    "identified {} event(s), {} area(s)",
                    events.len(),
                    events.iter().map(|e| e.affected_areas.len()).sum::<usize>()
                );
                Ok(events)
            }
            Err(err) => {
                warn!(target: TARGET_ANALYSIS, "impact parse failed ({}), using fallback analysis", err);
                Ok(self.fallback(metadata, bundle))
            }
        }
    }

    fn parse_response(raw: &str) -> Result<Vec<DisruptionEvent>, PipelineError> {
        let span = extract_json_object(raw).ok_or_else(|| {
            PipelineError::MalformedModelOutput("no JSON object in reply".to_string())
        })?;
        let analysis: RawAnalysis = serde_json::from_str(span)
            .map_err(|e| PipelineError::MalformedModelOutput(e.to_string()))?;

        if analysis.events.is_empty() {
            return Err(PipelineError::MalformedModelOutput(
                "no events in analysis".to_string(),
            ));
        }

        Ok(analysis
            .events
            .into_iter()
            .enumerate()
            .map(|(i, event)| DisruptionEvent {
                id: format!("evt_{:03}", i + 1),
                name: event.event_name,
                event_type: event.event_type,
                timeframe: event.timeframe,
                affected_areas: event.affected_areas.into_iter().map(Self::build_area).collect(),
            })
            .collect())
    }

    fn build_area(raw: RawArea) -> AffectedArea {
        let (lat_range, lon_range) = geo::ranges_for(raw.latitude, raw.longitude, raw.radius_km);
        AffectedArea {
            name: raw.area_name,
            severity: raw.severity,
            center: GeoPoint {
                lat: geo::round6(raw.latitude),
                lon: geo::round6(raw.longitude),
            },
            lat_range,
            lon_range,
            reasoning: raw.reasoning,
            estimated_impact: raw.estimated_users,
            confidence: raw.confidence.clamp(0.0, 1.0),
            supporting_points: raw.supporting_data_points,
        }
    }

    /// One broad low-confidence event centered on the query location. Used
    /// whenever the model reply cannot be parsed into events.
    fn fallback(
        &self,
        metadata: &QueryMetadata,
        bundle: &IntelligenceBundle,
    ) -> Vec<DisruptionEvent> {
        info!(target: TARGET_ANALYSIS, "generating fallback analysis");

        let (event_type, location, timeframe) = match metadata.events.first() {
            Some(event) => (
                event.event_type,
                event.primary_location.clone(),
                event.timeframe.clone(),
            ),
            None => (
                EventType::Unknown,
                self.default_city.clone(),
                "recent".to_string(),
            ),
        };
        let location = if location.is_empty() {
            self.default_city.clone()
        } else {
            location
        };

        let (lat, lon) = self.gazetteer.resolve_or_default(&location, &self.default_city);
        let (lat_range, lon_range) = geo::ranges_for(lat, lon, 5.0);
        let sources = bundle.evidence_items.len();

        vec![DisruptionEvent {
            id: "evt_001".to_string(),
            name: format!("{} - {}", event_type.display_name(), location),
            event_type,
            timeframe,
            affected_areas: vec![AffectedArea {
                name: format!("{} Area", location),
                severity: Severity::Moderate,
                center: GeoPoint {
                    lat: geo::round6(lat),
                    lon: geo::round6(lon),
                },
                lat_range,
                lon_range,
                reasoning: format!(
                    "Broad-area estimate based on {} collected data points; detailed \
                     geographic reasoning was unavailable",
                    sources
                ),
                estimated_impact: "~10,000 users (estimated)".to_string(),
                confidence: 0.6,
                supporting_points: sources as u32,
            }],
        }]
    }
}
