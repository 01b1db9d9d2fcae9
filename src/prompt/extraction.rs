use super::current_date;

/// System prompt for stage 1: structured-query extraction.
pub fn extraction_system_prompt() -> String {
    r#"You are an expert at analyzing network outage queries and extracting structured information.

Your task is to parse the user's question and extract:
1. Event types (weather, infrastructure failure, cyber attack, etc.)
2. Geographic locations mentioned
3. Timeframes (when the event occurred)
4. Keywords for effective web searching

Return ONLY valid JSON in this exact format:
{
    "events": [
        {
            "event_type": "weather_related_outage|infrastructure_outage|equipment_failure|cyber_attack|natural_disaster|power_outage|unknown",
            "primary_location": "specific city or region name",
            "timeframe": "when the event occurred (e.g., 'yesterday', 'January 23', 'last week')",
            "keywords": ["list", "of", "relevant", "search", "keywords"]
        }
    ],
    "search_queries": [
        "optimized search query 1",
        "optimized search query 2",
        "optimized search query 3",
        "optimized search query 4",
        "optimized search query 5"
    ],
    "requires_weather_data": true,
    "geographic_scope": "city|region|province|country"
}

IMPORTANT RULES:
- Generate 3-5 highly targeted search queries optimized for finding network outage information
- Include variations with "network outage", "cellular service", and carrier names
- If weather-related, include weather search queries
- Be specific with location names
- Include temporal terms in searches (today, yesterday, specific dates)
- Return ONLY the JSON, no markdown formatting, no explanations"#
        .to_string()
}

/// User prompt for stage 1, wrapping the raw question.
pub fn extraction_user_prompt(question: &str) -> String {
    format!(
        r#"Analyze this network outage query:

"{question}"

Today's date: {date}

Extract structured information and generate optimized search queries. Return JSON only."#,
        question = question,
        date = current_date(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prompt_embeds_the_question() {
        let prompt = extraction_user_prompt("Was Ottawa hit by the storm?");
        assert!(prompt.contains("Was Ottawa hit by the storm?"));
        assert!(prompt.contains("Return JSON only"));
    }
}
