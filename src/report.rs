use std::fmt::Write;

use serde_json::{json, Value};

use crate::batch::BatchOutcome;
use crate::calendar;
use crate::models::{FeatureValue, Tier, TierSummary};
use crate::pipeline::{Assessment, Importances};
use crate::projection::Precision;
use crate::schema::Schema;

pub fn render_assessment(assessment: &Assessment) -> String {
    let mut output = String::new();
    let risk = &assessment.risk;

    let _ = writeln!(output, "Delay risk: {}", risk.display_label());
    let _ = writeln!(output, "Probability: {}", risk.probability_pct());

    let Some(delay) = &assessment.delay else {
        return output;
    };

    if delay.estimate.negative_estimate {
        let _ = writeln!(
            output,
            "Estimated delay: 0 days (model returned {:.1}; flagged as anomalous)",
            delay.estimate.raw_days
        );
    } else {
        let _ = writeln!(
            output,
            "Estimated delay: {} days",
            delay.estimate.display_days()
        );
    }

    let month = calendar::month_name(delay.projection.impact_month);
    match delay.projection.impact_year {
        Some(year) => {
            let _ = writeln!(output, "Impact around: {month} {year}");
        }
        None => {
            let _ = writeln!(output, "Impact around: {month}");
        }
    }
    if let Some(date) = delay.projection.new_completion_date {
        let _ = writeln!(output, "New completion date: {date}");
    }
    if risk.margin_absorbed {
        if let Some(margin) = assessment.record.derived.schedule_margin_days {
            let _ = writeln!(
                output,
                "Schedule margin of {margin} days absorbs the estimated delay (provisional tier {}).",
                risk.provisional_tier
            );
        }
    }
    let _ = writeln!(output, "Probable causes: {}", delay.explanation);

    output
}

pub fn assessment_json(assessment: &Assessment) -> Value {
    let features: serde_json::Map<String, Value> = assessment
        .record
        .columns()
        .iter()
        .map(|(name, value)| {
            let value = match value {
                FeatureValue::Text(text) => json!(text),
                FeatureValue::Number(number) => json!(number),
            };
            (name.to_string(), value)
        })
        .collect();

    let delay = assessment.delay.as_ref().map(|delay| {
        json!({
            "estimated_days": delay.estimate.days,
            "raw_estimate_days": delay.estimate.raw_days,
            "negative_estimate": delay.estimate.negative_estimate,
            "impact_month": calendar::month_name(delay.projection.impact_month),
            "impact_year": delay.projection.impact_year,
            "new_completion_date": delay.projection.new_completion_date.map(|d| d.to_string()),
            "precision": match delay.projection.precision {
                Precision::Exact => "exact",
                Precision::Approximate => "approximate",
            },
            "causes": delay.causes,
            "explanation": delay.explanation,
        })
    });

    json!({
        "request_id": assessment.request_id.to_string(),
        "generation": assessment.record.generation.as_str(),
        "probability": assessment.risk.probability,
        "tier": assessment.risk.tier.label(),
        "provisional_tier": assessment.risk.provisional_tier.label(),
        "margin_absorbed": assessment.risk.margin_absorbed,
        "schedule_margin_days": assessment.record.derived.schedule_margin_days,
        "start_date": assessment.record.derived.start_date.map(|d| d.to_string()),
        "features": features,
        "delay": delay,
    })
}

pub fn render_importances(importances: &Importances) -> String {
    let mut output = String::new();
    match importances {
        Importances::Available(ranked) => {
            let _ = writeln!(output, "Feature importance (classifier):");
            for (column, score) in ranked {
                let _ = writeln!(output, "- {column}: {:.1}%", score * 100.0);
            }
        }
        Importances::Unavailable(notice) => {
            let _ = writeln!(output, "{notice}");
        }
    }
    output
}

pub fn render_schema(schema: &Schema) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Generation: {}", schema.generation.as_str());
    let _ = writeln!(output, "Calendar aware: {}", schema.calendar_aware);
    let _ = writeln!(output, "Columns: {}", schema.columns.join(", "));
    let _ = writeln!(output, "Work types: {}", schema.work_types.join(", "));
    let _ = writeln!(output, "Regions: {}", schema.regions.join(", "));
    let _ = writeln!(output, "Bounds:");
    for bound in schema.bounds {
        let _ = writeln!(output, "- {}: {}..={}", bound.field, bound.min, bound.max);
    }
    output
}

pub fn summarize_by_tier(outcomes: &[BatchOutcome]) -> Vec<TierSummary> {
    let mut map: std::collections::HashMap<Tier, (usize, f64)> = std::collections::HashMap::new();

    for assessment in outcomes.iter().filter_map(|o| o.result.as_ref().ok()) {
        let entry = map.entry(assessment.risk.tier).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += assessment.risk.probability;
    }

    let mut summaries: Vec<TierSummary> = map
        .into_iter()
        .map(|(tier, (count, total_probability))| TierSummary {
            tier,
            count,
            avg_probability: if count == 0 {
                0.0
            } else {
                total_probability / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| b.tier.cmp(&a.tier));
    summaries
}

pub fn build_batch_report(schema: &Schema, source: &str, outcomes: &[BatchOutcome]) -> String {
    let summaries = summarize_by_tier(outcomes);

    let mut output = String::new();
    let _ = writeln!(output, "# Construction Delay Risk Report");
    let _ = writeln!(
        output,
        "Generated from {} with the `{}` models ({} projects)",
        source,
        schema.generation.as_str(),
        outcomes.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Tier Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No projects were assessed.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} projects (avg probability {:.2}%)",
                summary.tier,
                summary.count,
                summary.avg_probability * 100.0
            );
        }
    }

    let mut ranked: Vec<(&BatchOutcome, &Assessment)> = outcomes
        .iter()
        .filter_map(|outcome| outcome.result.as_ref().ok().map(|a| (outcome, a)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.risk
            .probability
            .partial_cmp(&a.1.risk.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Risk Projects");
    if ranked.is_empty() {
        let _ = writeln!(output, "No projects were assessed.");
    } else {
        for (outcome, assessment) in ranked.iter().take(10) {
            let _ = write!(
                output,
                "- {}: {} ({})",
                outcome.label,
                assessment.risk.display_label(),
                assessment.risk.probability_pct()
            );
            match &assessment.delay {
                Some(delay) => {
                    let _ = writeln!(
                        output,
                        ", ~{} days late. {}",
                        delay.estimate.display_days(),
                        delay.explanation
                    );
                }
                None => {
                    let _ = writeln!(output);
                }
            }
        }
    }

    let failures: Vec<&BatchOutcome> = outcomes.iter().filter(|o| o.result.is_err()).collect();
    let _ = writeln!(output);
    let _ = writeln!(output, "## Rejected Rows");
    if failures.is_empty() {
        let _ = writeln!(output, "Every row was assessed.");
    } else {
        for outcome in failures {
            if let Err(err) = &outcome.result {
                let _ = writeln!(output, "- row {} ({}): {}", outcome.row, outcome.label, err);
            }
        }
    }

    output
}
