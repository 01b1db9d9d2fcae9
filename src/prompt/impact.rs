use crate::types::{IntelligenceBundle, QueryMetadata, WeatherSnapshot};

/// System prompt for stage 3: geolocated impact reasoning.
pub fn impact_system_prompt() -> String {
    r#"You are an expert geospatial analyst specializing in telecommunications network disruptions.

Your task is to analyze provided data sources and identify specific geographic areas affected by network outages.

Return ONLY valid JSON with this exact structure:
{
    "events": [
        {
            "event_name": "descriptive event name",
            "event_type": "weather_related_outage|infrastructure_outage|equipment_failure|power_outage|etc",
            "timeframe": "when the event occurred",
            "affected_areas": [
                {
                    "area_name": "specific neighborhood or district name",
                    "severity": "critical|high|moderate|low",
                    "latitude": 43.123,
                    "longitude": -79.456,
                    "radius_km": 2.5,
                    "reasoning": "detailed explanation citing specific evidence from data sources",
                    "estimated_users": "approximate number of affected users",
                    "confidence": 0.85,
                    "supporting_data_points": 15
                }
            ]
        }
    ]
}

CRITICAL REQUIREMENTS:
1. REASONING IS MANDATORY: Each area MUST include detailed reasoning that:
   - Cites specific evidence from web search results
   - References weather data when available
   - Explains why this area was identified
   - Mentions number of reports/mentions found

2. Severity assessment based on:
   - critical: Complete service loss, 10+ mentions, official confirmations
   - high: Major disruptions, 5-10 mentions, multiple source types
   - moderate: Partial service degradation, 3-5 mentions
   - low: Minor issues, 1-2 mentions, unconfirmed

3. Confidence scoring (0-1):
   - 0.9+: Multiple independent sources, official statements, weather correlation
   - 0.8-0.9: Multiple sources, strong evidence
   - 0.7-0.8: Several mentions, good correlation
   - 0.6-0.7: Limited mentions, weak correlation
   - Below 0.6: Single source or unclear evidence

4. Provide precise center coordinates; ranges are calculated downstream
5. Estimate radius of impact in kilometers
6. Count actual supporting data points (number of mentions/reports)
7. Return ONLY JSON, no markdown, no explanations outside the JSON"#
        .to_string()
}

fn format_weather(weather: Option<&WeatherSnapshot>) -> String {
    match weather {
        None => "No weather data available".to_string(),
        Some(w) => format!(
            "Weather Conditions:\n\
             - Condition: {}\n\
             - Description: {}\n\
             - Temperature: {}°C\n\
             - Wind Speed: {} km/h\n\
             - Precipitation: {} mm\n\
             - Warnings: {}\n\
             - Severity: {:?}",
            w.condition,
            w.description,
            w.temperature,
            w.wind_speed,
            w.precipitation,
            w.warnings.join(", "),
            w.severity,
        ),
    }
}

/// User prompt for stage 3, embedding the structured metadata, every
/// gathered evidence item, and the weather reading (or its placeholder).
pub fn impact_user_prompt(metadata: &QueryMetadata, bundle: &IntelligenceBundle) -> String {
    let events_text = metadata
        .events
        .iter()
        .map(|e| {
            format!(
                "- {}: {} ({})",
                e.event_type, e.primary_location, e.timeframe
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let evidence_text = bundle
        .evidence_items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            format!(
                "Source {}:\nTitle: {}\nContent: {}\nURL: {}\nDate: {}\nSource: {}",
                idx + 1,
                item.title.as_deref().unwrap_or("N/A"),
                item.snippet.as_deref().unwrap_or("N/A"),
                item.url.as_deref().unwrap_or("N/A"),
                item.date.as_deref().unwrap_or("N/A"),
                item.source.as_deref().unwrap_or("N/A"),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Analyze the following data to identify network service areas affected by outages:

EVENT METADATA:
{events_text}

WEB SEARCH RESULTS ({count} sources):
{evidence_text}

WEATHER DATA:
{weather_text}

ANALYSIS TASK:
Identify all geographic areas experiencing network disruptions. For each area:
1. Determine precise location (coordinates and neighborhood name)
2. Assess severity based on evidence
3. Provide detailed reasoning citing specific sources
4. Calculate confidence based on data quality
5. Estimate impact and affected users

Be thorough and cite specific evidence. Return comprehensive JSON analysis."#,
        events_text = events_text,
        count = bundle.evidence_items.len(),
        evidence_text = evidence_text,
        weather_text = format_weather(bundle.weather.as_ref()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventType, EvidenceItem, QueryEvent};

    fn metadata() -> QueryMetadata {
        QueryMetadata {
            events: vec![QueryEvent {
                event_type: EventType::WeatherRelated,
                primary_location: "Toronto".to_string(),
                timeframe: "yesterday".to_string(),
                keywords: vec![],
            }],
            search_queries: vec!["q".to_string()],
            requires_weather_data: true,
            geographic_scope: Default::default(),
        }
    }

    #[test]
    fn prompt_lists_every_evidence_item() {
        let bundle = IntelligenceBundle {
            evidence_items: vec![
                EvidenceItem {
                    title: Some("Tower down".to_string()),
                    snippet: Some("Outage reported".to_string()),
                    url: Some("https://a.example".to_string()),
                    date: None,
                    source: Some("News".to_string()),
                },
                EvidenceItem {
                    title: None,
                    snippet: None,
                    url: Some("https://b.example".to_string()),
                    date: None,
                    source: None,
                },
            ],
            weather: None,
            queries_used: vec![],
        };

        let prompt = impact_user_prompt(&metadata(), &bundle);
        assert!(prompt.contains("Source 1:"));
        assert!(prompt.contains("Source 2:"));
        assert!(prompt.contains("Tower down"));
        assert!(prompt.contains("(2 sources)"));
        assert!(prompt.contains("No weather data available"));
    }

    #[test]
    fn weather_reading_is_formatted_when_present() {
        let bundle = IntelligenceBundle {
            evidence_items: vec![],
            weather: Some(crate::sources::OpenWeatherSource::synthetic_reading()),
            queries_used: vec![],
        };

        let prompt = impact_user_prompt(&metadata(), &bundle);
        assert!(prompt.contains("freezing rain"));
        assert!(prompt.contains("Ice storm warning"));
    }
}
