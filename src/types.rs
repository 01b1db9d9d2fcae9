use serde::{Deserialize, Deserializer, Serialize};

/// Categories of network disruption events the pipeline recognizes.
/// Anything the model invents outside this list maps to `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub enum EventType {
    #[serde(rename = "weather_related_outage")]
    WeatherRelated,
    #[serde(rename = "infrastructure_outage")]
    Infrastructure,
    #[serde(rename = "cyber_attack")]
    CyberAttack,
    #[serde(rename = "natural_disaster")]
    NaturalDisaster,
    #[serde(rename = "equipment_failure")]
    EquipmentFailure,
    #[serde(rename = "power_outage")]
    PowerOutage,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl EventType {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "weather_related_outage" => EventType::WeatherRelated,
            "infrastructure_outage" => EventType::Infrastructure,
            "cyber_attack" => EventType::CyberAttack,
            "natural_disaster" => EventType::NaturalDisaster,
            "equipment_failure" => EventType::EquipmentFailure,
            "power_outage" => EventType::PowerOutage,
            _ => EventType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::WeatherRelated => "weather_related_outage",
            EventType::Infrastructure => "infrastructure_outage",
            EventType::CyberAttack => "cyber_attack",
            EventType::NaturalDisaster => "natural_disaster",
            EventType::EquipmentFailure => "equipment_failure",
            EventType::PowerOutage => "power_outage",
            EventType::Unknown => "unknown",
        }
    }

    /// Human-readable form, e.g. "Weather Related Outage".
    pub fn display_name(&self) -> String {
        self.as_str()
            .split('_')
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
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventType::from_wire(&s))
    }
}

/// Severity of impact in one affected area. Unrecognized or missing model
/// output defaults to `Moderate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Moderate,
    Low,
}

impl Severity {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "critical" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Moderate,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Moderate => "moderate",
            Severity::Low => "low",
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Severity::from_wire(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GeographicScope {
    City,
    #[default]
    Region,
    Province,
    Country,
}

impl<'de> Deserialize<'de> for GeographicScope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "city" => GeographicScope::City,
            "province" => GeographicScope::Province,
            "country" => GeographicScope::Country,
            _ => GeographicScope::Region,
        })
    }
}

/// One event hypothesis extracted from the user question (stage 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryEvent {
    #[serde(default)]
    pub event_type: EventType,
    #[serde(default)]
    pub primary_location: String,
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_timeframe() -> String {
    "recent".to_string()
}

/// Structured query metadata produced by stage 1. `events` and
/// `search_queries` are deliberately not defaulted: a model reply missing
/// either key is malformed and triggers the rule-based fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub events: Vec<QueryEvent>,
    pub search_queries: Vec<String>,
    #[serde(default)]
    pub requires_weather_data: bool,
    #[serde(default)]
    pub geographic_scope: GeographicScope,
}

/// One unit of third-party evidence about a possible disruption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub url: Option<String>,
    pub date: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeatherSeverity {
    Severe,
    Moderate,
    #[default]
    Mild,
}

impl<'de> Deserialize<'de> for WeatherSeverity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "severe" => WeatherSeverity::Severe,
            "moderate" => WeatherSeverity::Moderate,
            _ => WeatherSeverity::Mild,
        })
    }
}

/// Current weather reading for the primary location. `synthetic` marks
/// readings fabricated when the provider is unreachable or unconfigured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub condition: String,
    pub description: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
    pub visibility_km: f64,
    pub warnings: Vec<String>,
    pub severity: WeatherSeverity,
    pub synthetic: bool,
}

/// Everything stage 2 gathered. Built once per analysis, immutable after.
#[derive(Debug, Clone, Serialize)]
pub struct IntelligenceBundle {
    pub evidence_items: Vec<EvidenceItem>,
    pub weather: Option<WeatherSnapshot>,
    pub queries_used: Vec<String>,
}

impl IntelligenceBundle {
    pub fn total_data_points(&self) -> usize {
        self.evidence_items.len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// A geographic area identified as affected, with coordinate ranges derived
/// from the center point and impact radius.
#[derive(Debug, Clone, Serialize)]
pub struct AffectedArea {
    pub name: String,
    pub severity: Severity,
    pub center: GeoPoint,
    pub lat_range: [f64; 2],
    pub lon_range: [f64; 2],
    pub reasoning: String,
    pub estimated_impact: String,
    pub confidence: f64,
    pub supporting_points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DisruptionEvent {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timeframe: String,
    pub affected_areas: Vec<AffectedArea>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FiltersApplied {
    pub max_areas: usize,
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StageDurations {
    pub interpret_ms: u64,
    pub gather_ms: u64,
    pub analyze_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisMetadata {
    pub queries_used: Vec<String>,
    pub data_sources: Vec<String>,
    pub searches_performed: usize,
    pub weather_calls: usize,
    pub total_data_points: usize,
    pub duration_ms: u64,
    pub stage_durations_ms: StageDurations,
    pub filters_applied: FiltersApplied,
}

/// Complete analysis returned to the caller and cached by value.
/// `total_events` and `total_affected_areas` always equal the derived counts.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub query: String,
    pub timestamp: String,
    pub summary: String,
    pub events: Vec<DisruptionEvent>,
    pub total_events: usize,
    pub total_affected_areas: usize,
    pub metadata: AnalysisMetadata,
}
