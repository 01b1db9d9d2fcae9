use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use tracing::info;

use crate::analyzer::ImpactAnalyzer;
use crate::cache::TtlCache;
use crate::error::PipelineError;
use crate::gatherer::IntelligenceGatherer;
use crate::interpreter::QueryInterpreter;
use crate::types::{
    AnalysisMetadata, AnalysisResult, DisruptionEvent, FiltersApplied, StageDurations,
};
use crate::TARGET_ANALYSIS;

const REASONING_PLACEHOLDER: &str =
    "Reasoning omitted (set include_reasoning=true to see details)";

/// Per-request knobs. Absent fields fall back to the configured defaults;
/// reasoning text is included unless explicitly turned off.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzeOptions {
    pub max_areas: Option<usize>,
    pub min_confidence: Option<f64>,
    pub include_reasoning: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            max_areas: None,
            min_confidence: None,
            include_reasoning: true,
        }
    }
}

/// Runs the three stages in strict sequence with a cache-aside check on the
/// verbatim question. Owns its result cache; nothing here is process-global.
pub struct PipelineOrchestrator {
    interpreter: QueryInterpreter,
    gatherer: IntelligenceGatherer,
    analyzer: ImpactAnalyzer,
    cache: Arc<TtlCache<AnalysisResult>>,
    max_areas: usize,
    min_confidence: f64,
}

impl PipelineOrchestrator {
    pub fn new(
        interpreter: QueryInterpreter,
        gatherer: IntelligenceGatherer,
        analyzer: ImpactAnalyzer,
        cache: Arc<TtlCache<AnalysisResult>>,
        max_areas: usize,
        min_confidence: f64,
    ) -> Self {
        PipelineOrchestrator {
            interpreter,
            gatherer,
            analyzer,
            cache,
            max_areas,
            min_confidence,
        }
    }

    pub async fn analyze(
        &self,
        question: &str,
        options: &AnalyzeOptions,
    ) -> Result<AnalysisResult, PipelineError> {
        validate_question(question)?;

        let cache_key = format!("analysis_{}", question);
        if let Some(cached) = self.cache.get(&cache_key) {
            info!(target: TARGET_ANALYSIS, "returning cached analysis");
            return Ok(cached);
        }

        info!(target: TARGET_ANALYSIS, "starting analysis for '{}'", question);
        let started = Instant::now();

        let stage_start = Instant::now();
        let metadata = self.interpreter.interpret(question).await?;
        let interpret_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let bundle = self.gatherer.gather(&metadata).await;
        let gather_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let events = self.analyzer.analyze(&metadata, &bundle).await?;
        let analyze_ms = stage_start.elapsed().as_millis() as u64;

        let max_areas = options.max_areas.unwrap_or(self.max_areas);
        let min_confidence = options.min_confidence.unwrap_or(self.min_confidence);
        let mut events = filter_events(events, max_areas, min_confidence);

        if !options.include_reasoning {
            redact_reasoning(&mut events);
        }

        let total_areas = events.iter().map(|e| e.affected_areas.len()).sum::<usize>();
        let summary = generate_summary(&events, total_areas);

        let mut data_sources = vec!["web_search".to_string()];
        if bundle.weather.is_some() {
            data_sources.push("openweathermap".to_string());
        }

        let result = AnalysisResult {
            query: question.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            summary,
            total_events: events.len(),
            total_affected_areas: total_areas,
            events,
            metadata: AnalysisMetadata {
                queries_used: bundle.queries_used.clone(),
                data_sources,
                searches_performed: bundle.queries_used.len(),
                weather_calls: usize::from(bundle.weather.is_some()),
                total_data_points: bundle.total_data_points(),
                duration_ms: started.elapsed().as_millis() as u64,
                stage_durations_ms: StageDurations {
                    interpret_ms,
                    gather_ms,
                    analyze_ms,
                },
                filters_applied: FiltersApplied {
                    max_areas,
                    min_confidence,
                },
            },
        };

        self.cache.set(cache_key, result.clone());
        info!(
            target: TARGET_ANALYSIS,
            "analysis complete: {} event(s), {} area(s) in {}ms",
            result.total_events,
            result.total_affected_areas,
            result.metadata.duration_ms
        );
        Ok(result)
    }
}

pub fn validate_question(question: &str) -> Result<(), PipelineError> {
    if question.trim().is_empty() {
        return Err(PipelineError::validation("Question cannot be empty"));
    }
    let chars = question.chars().count();
    if chars < 10 {
        return Err(PipelineError::validation(
            "Question too short (minimum 10 characters)",
        ));
    }
    if chars > 500 {
        return Err(PipelineError::validation(
            "Question too long (maximum 500 characters)",
        ));
    }
    Ok(())
}

/// Drops low-confidence areas, orders the rest by confidence descending
/// (stable on ties), truncates to `max_areas`, and drops emptied events.
fn filter_events(
    events: Vec<DisruptionEvent>,
    max_areas: usize,
    min_confidence: f64,
) -> Vec<DisruptionEvent> {
    info!(
        target: TARGET_ANALYSIS,
        "applying filters: max_areas={}, min_confidence={}", max_areas, min_confidence
    );
    let areas_before = events.iter().map(|e| e.affected_areas.len()).sum::<usize>();

    let filtered: Vec<DisruptionEvent> = events
        .into_iter()
        .filter_map(|mut event| {
            event
                .affected_areas
                .retain(|area| area.confidence >= min_confidence);
            event.affected_areas.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(Ordering::Equal)
            });
            event.affected_areas.truncate(max_areas);
            (!event.affected_areas.is_empty()).then_some(event)
        })
        .collect();

    let areas_after = filtered.iter().map(|e| e.affected_areas.len()).sum::<usize>();
    info!(target: TARGET_ANALYSIS, "filtered: {} -> {} areas", areas_before, areas_after);
    filtered
}

fn redact_reasoning(events: &mut [DisruptionEvent]) {
    for event in events {
        for area in &mut event.affected_areas {
            area.reasoning = REASONING_PLACEHOLDER.to_string();
        }
    }
}

fn generate_summary(events: &[DisruptionEvent], total_areas: usize) -> String {
    if events.is_empty() {
        return "No significant network impacts detected based on available data. \
                This could indicate either no current outages or insufficient data sources."
            .to_string();
    }

    let mut summary = format!(
        "Analysis identified {} distinct event(s) affecting {} area(s). ",
        events.len(),
        total_areas
    );

    let names: Vec<&str> = events.iter().take(3).map(|e| e.name.as_str()).collect();
    if events.len() == 1 {
        summary.push_str(&format!("Primary event: {}. ", names[0]));
    } else {
        summary.push_str(&format!("Events detected: {}. ", names.join(", ")));
    }

    let areas = events.iter().flat_map(|e| e.affected_areas.iter());
    let critical = areas
        .clone()
        .filter(|a| a.severity == crate::types::Severity::Critical)
        .count();
    let high = areas
        .clone()
        .filter(|a| a.severity == crate::types::Severity::High)
        .count();
    if critical > 0 {
        summary.push_str(&format!(
            "{} area(s) experiencing critical service disruption. ",
            critical
        ));
    } else if high > 0 {
        summary.push_str(&format!(
            "{} area(s) experiencing high-severity impact. ",
            high
        ));
    } else {
        summary.push_str("Impact levels range from moderate to low. ");
    }

    let avg_confidence = if total_areas > 0 {
        areas.map(|a| a.confidence).sum::<f64>() / total_areas as f64
    } else {
        0.0
    };
    if avg_confidence >= 0.8 {
        summary.push_str("Analysis confidence: High.");
    } else if avg_confidence >= 0.7 {
        summary.push_str("Analysis confidence: Moderate.");
    } else {
        summary.push_str("Analysis confidence: Limited data available.");
    }

    summary
}
