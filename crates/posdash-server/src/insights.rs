//! Prompt assembly and reply shaping for the Claude-backed recommendation
//! endpoints. Everything here is pure so the wording and fallbacks can be
//! tested without an endpoint.

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

const INSIGHT_MAX_CHARS: usize = 500;
const STRATEGY_INSIGHT_MAX_CHARS: usize = 300;
const PROMPT_COUNTRY_LIMIT: usize = 5;
const PROMPT_TALLY_LIMIT: usize = 3;

/// Counts in first-seen order.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Tally(Vec<(String, usize)>);

impl Tally {
    fn add(&mut self, key: &str) {
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, count)) => *count += 1,
            None => self.0.push((key.to_string(), 1)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn keys(&self, limit: usize) -> Vec<&str> {
        self.0.iter().take(limit).map(|(k, _)| k.as_str()).collect()
    }

    fn render(&self, limit: usize) -> String {
        let parts: Vec<String> = self
            .0
            .iter()
            .take(limit)
            .map(|(k, n)| format!("{k}: {n}"))
            .collect();
        format!("{{{}}}", parts.join(", "))
    }
}

/// Headline numbers over a batch of POS records sent by the frontend.
#[derive(Debug, Default)]
pub struct PosSummary {
    pub total_locations: usize,
    pub total_sales: i64,
    pub countries: Tally,
    pub business_types: Tally,
    pub product_families: Tally,
}

/// Tallies records as loosely-shaped JSON; missing fields count as
/// `"Unknown"` or zero.
#[must_use]
pub fn summarize_pos_records(records: &[Value]) -> PosSummary {
    let mut summary = PosSummary {
        total_locations: records.len(),
        ..PosSummary::default()
    };

    for record in records {
        let sales = record
            .get("salesVolume")
            .and_then(Value::as_i64)
            .unwrap_or(0);
        summary.total_sales = summary.total_sales.saturating_add(sales);

        let text = |key: &str| {
            record
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string()
        };
        summary.business_types.add(&text("businessType"));
        summary.countries.add(&text("country"));

        if let Some(families) = record.get("productFamilies").and_then(Value::as_array) {
            for family in families.iter().filter_map(Value::as_str) {
                summary.product_families.add(family);
            }
        }
    }

    summary
}

/// Formats an integer with comma thousands separators.
#[must_use]
pub fn format_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[must_use]
pub fn build_recommendations_prompt(summary: &PosSummary) -> String {
    format!(
        "As a business analyst for Danone, analyze this POS data and provide strategic recommendations:\n\
         \n\
         Data Summary:\n\
         - Total POS Locations: {locations}\n\
         - Total Sales Volume: €{sales}\n\
         - Countries: {country_count} ({countries})\n\
         - Business Types: {types}\n\
         - Top Product Families: {families}\n\
         \n\
         Please provide 2-3 specific, actionable recommendations for Danone focusing on:\n\
         1. Growth opportunities in underperforming segments\n\
         2. Optimization strategies for existing channels\n\
         3. Geographic expansion or intensification\n\
         \n\
         Format as JSON with: type, title, description, priority (high/medium/low), impact",
        locations = summary.total_locations,
        sales = format_thousands(summary.total_sales),
        country_count = summary.countries.len(),
        countries = summary.countries.keys(PROMPT_COUNTRY_LIMIT).join(", "),
        types = summary.business_types.render(PROMPT_TALLY_LIMIT),
        families = summary.product_families.render(PROMPT_TALLY_LIMIT),
    )
}

#[must_use]
pub fn recommendations_summary(summary: &PosSummary) -> String {
    format!(
        "Analysis of {} POS locations across {} countries",
        summary.total_locations,
        summary.countries.len()
    )
}

/// Keeps the first `max` characters and marks the cut with `...`.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Turns a Claude reply into a list of recommendation objects.
///
/// A reply starting with `[` or `{` is parsed as JSON: an array is used as
/// is, an object contributes its `recommendations` array or is itself the
/// single recommendation. Anything else, including JSON that fails to parse,
/// becomes one `ai_insight` carrying the first 500 characters.
#[must_use]
pub fn parse_recommendations_reply(reply: &str) -> Vec<Value> {
    if reply.starts_with('[') || reply.starts_with('{') {
        match serde_json::from_str::<Value>(reply) {
            Ok(Value::Array(items)) => return items,
            Ok(Value::Object(mut object)) => {
                return match object.remove("recommendations") {
                    Some(Value::Array(items)) => items,
                    Some(other) => {
                        object.insert("recommendations".to_string(), other);
                        vec![Value::Object(object)]
                    }
                    None => vec![Value::Object(object)],
                };
            }
            Ok(_) | Err(_) => {
                tracing::warn!("claude reply looked like JSON but did not parse");
            }
        }
    }

    vec![json!({
        "type": "ai_insight",
        "title": "AI Analysis",
        "description": truncate_chars(reply, INSIGHT_MAX_CHARS),
        "priority": "medium",
        "impact": "Based on current data patterns",
    })]
}

/// Recommendation reported when the Claude call itself failed.
#[must_use]
pub fn claude_error_recommendation(error: &str) -> Value {
    json!({
        "type": "error",
        "title": "AI Service Error",
        "description": format!("Claude API error: {error}. Using fallback recommendations."),
        "priority": "medium",
        "impact": "Verify token permissions and Claude endpoint access in Databricks",
    })
}

pub const MOCK_SUMMARY: &str = "Analysis shows strong opportunities in Baby Nutrition expansion \
                                and hypermarket channel optimization.";

/// Canned recommendations for local development without a forwarded token.
#[must_use]
pub fn mock_recommendations() -> Vec<Value> {
    vec![
        json!({
            "type": "growth_opportunity",
            "title": "Expand Baby Nutrition in Germany",
            "description": "Germany shows strong potential for Baby Nutrition products with only \
                            23% market penetration compared to 45% in France.",
            "priority": "high",
            "impact": "Could increase revenue by 15-20% in German markets",
        }),
        json!({
            "type": "optimization",
            "title": "Focus on Hypermarket Channel",
            "description": "Hypermarkets show 40% higher sales volume than supermarkets but \
                            represent only 25% of our POS locations.",
            "priority": "medium",
            "impact": "Opportunity to increase average sales per location",
        }),
    ]
}

/// Sections of the analytics overview handed to the strategy prompt.
pub struct StrategyInput<'a, C: Serialize, P: Serialize, T: Serialize> {
    pub revenue_by_country: &'a [C],
    pub competition_analysis: &'a [P],
    pub pricing_trends: &'a [T],
}

fn pretty_head<S: Serialize>(items: &[S], limit: usize) -> String {
    let head = &items[..items.len().min(limit)];
    serde_json::to_string_pretty(head).unwrap_or_else(|_| "[]".to_string())
}

#[must_use]
pub fn build_strategy_prompt<C: Serialize, P: Serialize, T: Serialize>(
    input: &StrategyInput<'_, C, P, T>,
) -> String {
    format!(
        "As a Danone sales strategy expert, analyze this scout intelligence data and provide 3-4 \
         specific, actionable recommendations for sales reps:\n\
         \n\
         REVENUE BY COUNTRY:\n{revenue}\n\
         \n\
         COMPETITION ANALYSIS:\n{competition}\n\
         \n\
         PRICING TRENDS (Latest 3 months):\n{pricing}\n\
         \n\
         Focus on:\n\
         1. Pricing optimization opportunities (where our prices vs RRP indicate margin improvement potential)\n\
         2. Competitive threats and response strategies (competitors gaining market share)\n\
         3. Geographic expansion opportunities (countries with high volume but low business count)\n\
         4. Product category recommendations (trends showing growth or decline)\n\
         \n\
         Provide recommendations in JSON format:\n\
         [\n  {{\n\
         \x20   \"type\": \"pricing_optimization|competitive_response|market_expansion|product_focus\",\n\
         \x20   \"title\": \"Clear actionable title\",\n\
         \x20   \"description\": \"Specific recommendation with numbers\",\n\
         \x20   \"priority\": \"high|medium|low\",\n\
         \x20   \"impact\": \"Expected business impact\",\n\
         \x20   \"action_items\": [\"Specific step 1\", \"Specific step 2\"]\n\
         \x20 }}\n]",
        revenue = pretty_head(input.revenue_by_country, 5),
        competition = pretty_head(input.competition_analysis, 5),
        pricing = pretty_head(input.pricing_trends, 10),
    )
}

fn strategy_insight(title: &str, impact: &str, actions: [&str; 2], reply: &str) -> Value {
    json!({
        "type": "ai_insight",
        "title": title,
        "description": truncate_chars(reply, STRATEGY_INSIGHT_MAX_CHARS),
        "priority": "medium",
        "impact": impact,
        "action_items": actions,
    })
}

/// Extracts the recommendation array from a strategy reply.
///
/// Uses the whole reply when it starts with `[`, otherwise the outermost
/// bracketed span. A reply with no array becomes an `AI Analysis` insight; an
/// array that fails to parse becomes a `Strategic Analysis` insight.
#[must_use]
pub fn parse_strategy_reply(reply: &str) -> Vec<Value> {
    let candidate = if reply.trim_start().starts_with('[') {
        Some(reply.trim())
    } else {
        let re = Regex::new(r"(?s)\[.*\]").expect("valid array regex");
        re.find(reply).map(|m| m.as_str())
    };

    let Some(candidate) = candidate else {
        return vec![strategy_insight(
            "AI Analysis",
            "Strategic insight from field intelligence",
            ["Review full AI analysis", "Implement recommendations"],
            reply,
        )];
    };

    match serde_json::from_str::<Vec<Value>>(candidate) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, "strategy reply array did not parse");
            vec![strategy_insight(
                "Strategic Analysis",
                "AI-powered market intelligence",
                ["Review recommendations", "Prioritize actions"],
                reply,
            )]
        }
    }
}

/// Shown in place of strategy recommendations when Claude could not be reached.
#[must_use]
pub fn strategy_unavailable(error: &str) -> Value {
    json!({
        "type": "system_info",
        "title": "AI Recommendations Unavailable",
        "description": format!("Unable to generate AI recommendations: {error}"),
        "priority": "low",
        "impact": "Manual analysis required",
        "action_items": ["Review data manually", "Check AI service status"],
    })
}

#[cfg(test)]
#[path = "insights_test.rs"]
mod tests;
