use crate::models::{markets, AggregatedMarket, PredictionSummary, RiskLevel};

const RULE_WIDTH: usize = 60;

/// Secondary markets shown under the top list, with their report labels
const DETAIL_MARKETS: [(&str, &str); 9] = [
    (markets::HT_FT, "HT/FT"),
    (markets::OVER_UNDER_HT, "First-half goals"),
    (markets::OVER_UNDER_1_5, "Over/Under 1.5"),
    (markets::OVER_UNDER_2_5, "Over/Under 2.5"),
    (markets::OVER_UNDER_3_5, "Over/Under 3.5"),
    (markets::BTTS, "Both teams score"),
    (markets::DOUBLE_CHANCE, "Double chance"),
    (markets::CORNERS, "Corners"),
    (markets::CARDS, "Cards"),
];

fn tier(confidence: f64) -> &'static str {
    if confidence >= 0.75 {
        "[A]"
    } else if confidence >= 0.65 {
        "[B]"
    } else if confidence >= 0.55 {
        "[C]"
    } else {
        "[-]"
    }
}

fn percent(market: &AggregatedMarket) -> String {
    format!("{:.0}%", market.confidence * 100.0)
}

/// Detailed text report of one prediction
pub fn render_prediction(prediction: &PredictionSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let thin = "-".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        format!("{} ({})", prediction.fixture, prediction.league),
        format!("  Best market: {}", prediction.best_market),
        format!("  Prediction:  {}", prediction.final_prediction),
        format!("  Confidence:  {:.1}%", prediction.final_confidence * 100.0),
        format!("  Risk:        {}", prediction.risk_level.as_str().to_uppercase()),
        format!("  {}", prediction.recommendation),
        rule,
    ];

    let mut ranked: Vec<&AggregatedMarket> = prediction.all_markets.values().collect();
    ranked.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    lines.push("Top 5 markets:".to_string());
    lines.push(thin.clone());
    for (i, market) in ranked.iter().take(5).enumerate() {
        lines.push(format!(
            "  {}. {} {:<25} -> {:<20} ({:.1}%, {}/{} agents)",
            i + 1,
            tier(market.confidence),
            market.market_name,
            market.outcome_label,
            market.confidence * 100.0,
            market.agents_agreed,
            market.total_agents
        ));
    }

    let (home, away) = prediction
        .fixture
        .split_once(" vs ")
        .unwrap_or((prediction.fixture.as_str(), ""));
    let exact: Vec<String> = [(markets::EXACT_GOALS_HOME, home), (markets::EXACT_GOALS_AWAY, away)]
        .into_iter()
        .filter_map(|(name, team)| {
            prediction
                .all_markets
                .get(name)
                .map(|m| format!("  {}: {} ({})", team, m.outcome_label, percent(m)))
        })
        .collect();
    if !exact.is_empty() {
        lines.push(String::new());
        lines.push("Exact goals:".to_string());
        lines.push(thin.clone());
        lines.extend(exact);
    }

    let details: Vec<String> = DETAIL_MARKETS
        .iter()
        .filter_map(|(name, label)| {
            prediction.all_markets.get(*name).map(|m| {
                let outcome = match *name {
                    markets::HT_FT => m.outcome_label.replace('_', "/"),
                    markets::BTTS => m.outcome_label.trim_start_matches("BTTS_").to_string(),
                    _ => m.outcome_label.clone(),
                };
                format!("  {:<18} {} ({})", format!("{}:", label), outcome, percent(m))
            })
        })
        .collect();
    if !details.is_empty() {
        lines.push(String::new());
        lines.push("Other markets:".to_string());
        lines.push(thin);
        lines.extend(details);
    }

    lines.push(String::new());
    lines.push(prediction.reasoning.clone());
    lines.push(format!("Analysis time: {}ms", prediction.execution_time_ms));

    lines.join("\n")
}

/// Counts per risk band and the three most confident opportunities
pub fn render_summary(predictions: &[PredictionSummary]) -> String {
    let count = |level: RiskLevel| predictions.iter().filter(|p| p.risk_level == level).count();

    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        rule.clone(),
        "Prediction summary".to_string(),
        rule.clone(),
        format!("Low risk:    {}", count(RiskLevel::Low)),
        format!("Medium risk: {}", count(RiskLevel::Medium)),
        format!("High risk:   {}", count(RiskLevel::High)),
    ];

    if !predictions.is_empty() {
        let mut ranked: Vec<&PredictionSummary> = predictions.iter().collect();
        ranked.sort_by(|a, b| b.final_confidence.total_cmp(&a.final_confidence));

        lines.push(String::new());
        lines.push("Top 3 opportunities:".to_string());
        lines.push("-".repeat(RULE_WIDTH));
        for (i, p) in ranked.iter().take(3).enumerate() {
            lines.push(format!("  {}. {}", i + 1, p.fixture));
            lines.push(format!(
                "     {} -> {} ({:.1}%)",
                p.best_market,
                p.final_prediction,
                p.final_confidence * 100.0
            ));
            lines.push(format!("     {}", p.recommendation));
        }
    }

    lines.push(rule);
    lines.join("\n")
}
