//! Deterministic rules that explain a risk tier.
//!
//! Rules are evaluated in a fixed order. In the default mode every matching
//! rule is reported; the legacy mode stops at the first match and also knows
//! the labor-shortage rule.

use clap::ValueEnum;
use serde::Serialize;

use crate::features::FeatureRecord;
use crate::models::{FeatureValue, HazardLevel, Tier};
use crate::schema::columns;

const PROGRESS_LAG_POINTS: f64 = 10.0;
const DISBURSEMENT_RATIO: f64 = 0.75;
const MAX_PENDING_CONTRACTS: u32 = 2;
const HEAVY_RAINFALL_MM: f64 = 100.0;
const MIN_STAFF: u32 = 150;

pub const NO_DOMINANT_FACTOR: &str =
    "No single dominant factor; risk stems from a subtle combination of variables.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cause {
    ExecutionLag,
    FinancialShortfall,
    UnassignedContracts,
    AdverseClimate,
    ElevatedFloodRisk,
    ElevatedSeismicRisk,
    LaborShortage,
}

impl Cause {
    pub fn label(&self) -> &'static str {
        match self {
            Cause::ExecutionLag => "execution lag",
            Cause::FinancialShortfall => "financial shortfall",
            Cause::UnassignedContracts => "unassigned contracts",
            Cause::AdverseClimate => "adverse climate",
            Cause::ElevatedFloodRisk => "elevated flood risk",
            Cause::ElevatedSeismicRisk => "elevated seismic risk",
            Cause::LaborShortage => "labor shortage",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum CauseMode {
    /// Report every matching rule.
    #[default]
    AccumulateAll,
    /// Report only the first matching rule.
    FirstMatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CauseInference {
    pub causes: Vec<Cause>,
    pub explanation: String,
}

type Predicate = fn(&FeatureRecord) -> bool;

const RULES: [(Cause, Predicate); 7] = [
    (Cause::ExecutionLag, execution_lag),
    (Cause::FinancialShortfall, financial_shortfall),
    (Cause::UnassignedContracts, unassigned_contracts),
    (Cause::AdverseClimate, adverse_climate),
    (Cause::ElevatedFloodRisk, elevated_flood_risk),
    (Cause::ElevatedSeismicRisk, elevated_seismic_risk),
    (Cause::LaborShortage, labor_shortage),
];

/// Numeric model column; `None` when the active generation does not use it.
fn number(record: &FeatureRecord, column: &str) -> Option<f64> {
    record.get(column).and_then(FeatureValue::as_number)
}

fn execution_lag(record: &FeatureRecord) -> bool {
    match (
        number(record, columns::ACTUAL_PROGRESS),
        number(record, columns::PLANNED_PROGRESS),
    ) {
        (Some(actual), Some(planned)) => actual < planned - PROGRESS_LAG_POINTS,
        _ => false,
    }
}

fn financial_shortfall(record: &FeatureRecord) -> bool {
    record.input.disbursed_flow < record.input.updated_budget * DISBURSEMENT_RATIO
}

fn unassigned_contracts(record: &FeatureRecord) -> bool {
    record.input.pending_contracts > MAX_PENDING_CONTRACTS
}

fn adverse_climate(record: &FeatureRecord) -> bool {
    record.derived.season.is_adverse()
        || number(record, columns::RAINFALL).is_some_and(|rainfall| rainfall > HEAVY_RAINFALL_MM)
}

fn elevated_flood_risk(record: &FeatureRecord) -> bool {
    record.flood_risk == HazardLevel::High
}

fn elevated_seismic_risk(record: &FeatureRecord) -> bool {
    record.seismic_risk == HazardLevel::High
}

fn labor_shortage(record: &FeatureRecord) -> bool {
    record.input.staff_count < MIN_STAFF
}

pub fn infer_causes(record: &FeatureRecord, tier: Tier, mode: CauseMode) -> CauseInference {
    let causes: Vec<Cause> = match mode {
        CauseMode::AccumulateAll => RULES
            .iter()
            .filter(|(cause, _)| *cause != Cause::LaborShortage)
            .filter(|(_, predicate)| predicate(record))
            .map(|(cause, _)| *cause)
            .collect(),
        CauseMode::FirstMatch => RULES
            .iter()
            .find(|(_, predicate)| predicate(record))
            .map(|(cause, _)| *cause)
            .into_iter()
            .collect(),
    };

    let explanation = if causes.is_empty() {
        NO_DOMINANT_FACTOR.to_string()
    } else {
        format!(
            "{} delay risk is most likely driven by {}.",
            tier,
            join_labels(&causes)
        )
    };
    CauseInference {
        causes,
        explanation,
    }
}

fn join_labels(causes: &[Cause]) -> String {
    let labels: Vec<&str> = causes.iter().map(Cause::label).collect();
    match labels.split_last() {
        None => String::new(),
        Some((last, [])) => last.to_string(),
        Some((last, rest)) => format!("{} and {}", rest.join(", "), last),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features;
    use crate::models::fixtures::sample_input;
    use crate::schema::{AVANCE, CALENDARIO, REALISTA};

    #[test]
    fn end_to_end_sample_flags_finance_and_climate_only() {
        let record = features::build(sample_input(), &CALENDARIO).expect("valid input");
        let inference = infer_causes(&record, Tier::Moderate, CauseMode::AccumulateAll);
        assert_eq!(
            inference.causes,
            vec![Cause::FinancialShortfall, Cause::AdverseClimate]
        );
        assert!(inference.explanation.contains("financial shortfall"));
        assert!(inference.explanation.contains("adverse climate"));
        assert!(!inference.explanation.contains("execution lag"));
        assert_eq!(
            inference.explanation,
            "MODERATE delay risk is most likely driven by financial shortfall and adverse climate."
        );
    }

    #[test]
    fn accumulates_every_rule_in_order() {
        let mut input = sample_input();
        input.actual_progress_pct = Some(30.0);
        input.pending_contracts = 4;
        input.flood_risk = "Alto".to_string();
        input.seismic_risk = "Alto".to_string();
        input.staff_count = 100;
        let record = features::build(input, &CALENDARIO).expect("valid input");
        let inference = infer_causes(&record, Tier::High, CauseMode::AccumulateAll);
        assert_eq!(
            inference.causes,
            vec![
                Cause::ExecutionLag,
                Cause::FinancialShortfall,
                Cause::UnassignedContracts,
                Cause::AdverseClimate,
                Cause::ElevatedFloodRisk,
                Cause::ElevatedSeismicRisk,
            ]
        );
        assert!(inference.explanation.contains(
            "execution lag, financial shortfall, unassigned contracts, adverse climate, \
             elevated flood risk and elevated seismic risk"
        ));
        // repeated evaluation yields the same answer
        assert_eq!(
            infer_causes(&record, Tier::High, CauseMode::AccumulateAll),
            inference
        );
    }

    #[test]
    fn first_match_reports_one_cause_and_knows_labor() {
        let mut input = sample_input();
        input.start_month = "Enero".to_string();
        input.disbursed_flow = 50.0;
        input.staff_count = 120;
        input.rainfall_mm = Some(60.0);
        let record = features::build(input, &REALISTA).expect("valid input");
        let legacy = infer_causes(&record, Tier::High, CauseMode::FirstMatch);
        assert_eq!(legacy.causes, vec![Cause::LaborShortage]);
        let canonical = infer_causes(&record, Tier::High, CauseMode::AccumulateAll);
        assert!(canonical.causes.is_empty());
        assert_eq!(canonical.explanation, NO_DOMINANT_FACTOR);
    }

    #[test]
    fn heavy_rainfall_counts_as_adverse_climate() {
        let mut input = sample_input();
        input.start_month = "Enero".to_string();
        input.disbursed_flow = 50.0;
        input.rainfall_mm = Some(150.0);
        let record = features::build(input, &REALISTA).expect("valid input");
        let inference = infer_causes(&record, Tier::Moderate, CauseMode::AccumulateAll);
        assert_eq!(inference.causes, vec![Cause::AdverseClimate]);
        assert!(inference.explanation.ends_with("driven by adverse climate."));
    }

    #[test]
    fn inputs_outside_the_generation_columns_are_ignored() {
        let mut input = sample_input();
        input.start_month = "Enero".to_string();
        input.disbursed_flow = 50.0;
        input.rainfall_mm = Some(150.0);
        let record = features::build(input, &CALENDARIO).expect("valid input");
        assert!(record.get(columns::RAINFALL).is_none());
        let inference = infer_causes(&record, Tier::Moderate, CauseMode::AccumulateAll);
        assert!(inference.causes.is_empty());

        let mut input = sample_input();
        input.start_month = "Enero".to_string();
        input.disbursed_flow = 50.0;
        input.rainfall_mm = Some(60.0);
        input.planned_progress_pct = Some(60.0);
        input.actual_progress_pct = Some(10.0);
        let record = features::build(input.clone(), &REALISTA).expect("valid input");
        let inference = infer_causes(&record, Tier::High, CauseMode::AccumulateAll);
        assert!(!inference.causes.contains(&Cause::ExecutionLag));

        // the same progress gap counts once the generation models progress
        let record = features::build(input, &AVANCE).expect("valid input");
        let inference = infer_causes(&record, Tier::High, CauseMode::AccumulateAll);
        assert_eq!(inference.causes, vec![Cause::ExecutionLag]);
    }
}
