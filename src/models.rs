use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Deserialize;

use crate::causes::Cause;
use crate::projection::Projection;

/// Raw attributes of one project as captured by the form or a CSV row.
///
/// Field names on the wire are the model column names, so a batch CSV can be
/// exported straight from the training sheet.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectInput {
    #[serde(rename = "proyecto", default)]
    pub name: Option<String>,
    #[serde(rename = "tipo_obra")]
    pub work_type: String,
    #[serde(rename = "region_geografica")]
    pub region: String,
    #[serde(rename = "mes_inicio")]
    pub start_month: String,
    #[serde(rename = "riesgo_sismico")]
    pub seismic_risk: String,
    #[serde(rename = "riesgo_inundacion")]
    pub flood_risk: String,
    #[serde(rename = "duracion_planeada_dias")]
    pub planned_duration_days: u32,
    #[serde(rename = "presupuesto_base_mdp")]
    pub base_budget: f64,
    #[serde(rename = "presupuesto_actualizado_mdp")]
    pub updated_budget: f64,
    #[serde(rename = "flujo_erogado_mdp")]
    pub disbursed_flow: f64,
    #[serde(rename = "contratos_por_asignar")]
    pub pending_contracts: u32,
    #[serde(rename = "trabajadores")]
    pub staff_count: u32,
    #[serde(rename = "m2_construccion")]
    pub floor_area_m2: f64,
    #[serde(rename = "lluvia_promedio_mm", default)]
    pub rainfall_mm: Option<f64>,
    #[serde(rename = "proveedores", default)]
    pub suppliers: Option<u32>,
    #[serde(rename = "avance_programado_pct", default)]
    pub planned_progress_pct: Option<f64>,
    #[serde(rename = "avance_real_pct", default)]
    pub actual_progress_pct: Option<f64>,
    #[serde(rename = "anio_inicio", default)]
    pub start_year: Option<i32>,
    #[serde(rename = "fecha_fin_planeada", default)]
    pub planned_end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HazardLevel {
    Low,
    Medium,
    High,
}

impl HazardLevel {
    pub const LABELS: [&'static str; 3] = ["Bajo", "Medio", "Alto"];

    pub fn label(&self) -> &'static str {
        match self {
            HazardLevel::Low => "Bajo",
            HazardLevel::Medium => "Medio",
            HazardLevel::High => "Alto",
        }
    }
}

impl FromStr for HazardLevel {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "bajo" => Ok(HazardLevel::Low),
            "medio" => Ok(HazardLevel::Medium),
            "alto" => Ok(HazardLevel::High),
            other => Err(format!(
                "`{other}` is not one of {}",
                HazardLevel::LABELS.join(", ")
            )),
        }
    }
}

/// Climatic regime at the start of the works.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Season {
    Dry,
    Rainy,
    Cyclonic,
}

impl Season {
    /// Category value the models were trained on.
    pub fn label(&self) -> &'static str {
        match self {
            Season::Dry => "seca",
            Season::Rainy => "lluvias",
            Season::Cyclonic => "ciclónica",
        }
    }

    pub fn is_adverse(&self) -> bool {
        matches!(self, Season::Rainy | Season::Cyclonic)
    }
}

/// Values computed from a [`ProjectInput`] for a single request.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub season: Season,
    /// Updated budget minus disbursed flow. Negative means overrun.
    pub pending_cash: f64,
    /// Base budget minus disbursed flow. Negative means overrun.
    pub remaining_from_base: f64,
    pub start_date: Option<NaiveDate>,
    pub schedule_margin_days: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Text(String),
    Number(f64),
}

impl FeatureValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FeatureValue::Text(value) => Some(value),
            FeatureValue::Number(_) => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FeatureValue::Number(value) => Some(*value),
            FeatureValue::Text(_) => None,
        }
    }
}

/// Discrete risk bucket, ordered `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Low,
    Moderate,
    High,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Low => "LOW",
            Tier::Moderate => "MODERATE",
            Tier::High => "HIGH",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskAssessment {
    pub probability: f64,
    pub provisional_tier: Tier,
    pub tier: Tier,
    /// Set when the schedule margin absorbs the estimated delay.
    pub margin_absorbed: bool,
}

impl RiskAssessment {
    pub fn display_label(&self) -> String {
        if self.margin_absorbed {
            format!("{} (margin-absorbed)", self.tier)
        } else {
            self.tier.to_string()
        }
    }

    pub fn probability_pct(&self) -> String {
        format!("{:.2}%", self.probability * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayEstimate {
    /// What the regressor returned.
    pub raw_days: f64,
    /// Clamped to zero.
    pub days: f64,
    pub negative_estimate: bool,
}

impl DelayEstimate {
    pub fn from_raw(raw_days: f64) -> Self {
        DelayEstimate {
            raw_days,
            days: raw_days.max(0.0),
            negative_estimate: raw_days < 0.0,
        }
    }

    pub fn display_days(&self) -> i64 {
        self.days.round() as i64
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayProjection {
    pub estimate: DelayEstimate,
    pub projection: Projection,
    pub causes: Vec<Cause>,
    pub explanation: String,
}

#[derive(Debug, Clone)]
pub struct TierSummary {
    pub tier: Tier,
    pub count: usize,
    pub avg_probability: f64,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::NaiveDate;

    use super::ProjectInput;

    /// Junio/Sureste project matching the form defaults, with calendar fields.
    pub(crate) fn sample_input() -> ProjectInput {
        ProjectInput {
            name: Some("Hospital Regional Mérida".to_string()),
            work_type: "Hospital".to_string(),
            region: "Sureste".to_string(),
            start_month: "Junio".to_string(),
            seismic_risk: "Bajo".to_string(),
            flood_risk: "Medio".to_string(),
            planned_duration_days: 365,
            base_budget: 50.0,
            updated_budget: 55.0,
            disbursed_flow: 40.0,
            pending_contracts: 1,
            staff_count: 300,
            floor_area_m2: 3000.0,
            rainfall_mm: Some(85.0),
            suppliers: Some(10),
            planned_progress_pct: Some(60.0),
            actual_progress_pct: Some(50.0),
            start_year: Some(2024),
            planned_end_date: NaiveDate::from_ymd_opt(2025, 8, 30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hazard_levels_parse_case_insensitively() {
        assert_eq!("alto".parse::<HazardLevel>(), Ok(HazardLevel::High));
        assert_eq!(" Medio ".parse::<HazardLevel>(), Ok(HazardLevel::Medium));
        assert!("Extremo".parse::<HazardLevel>().is_err());
    }

    #[test]
    fn negative_estimates_are_clamped_and_flagged() {
        let estimate = DelayEstimate::from_raw(-12.4);
        assert_eq!(estimate.days, 0.0);
        assert!(estimate.negative_estimate);
        assert_eq!(estimate.raw_days, -12.4);

        let estimate = DelayEstimate::from_raw(40.6);
        assert!(!estimate.negative_estimate);
        assert_eq!(estimate.display_days(), 41);
    }

    #[test]
    fn margin_absorbed_label_is_annotated() {
        let risk = RiskAssessment {
            probability: 0.5,
            provisional_tier: Tier::Moderate,
            tier: Tier::Low,
            margin_absorbed: true,
        };
        assert_eq!(risk.display_label(), "LOW (margin-absorbed)");
        assert_eq!(risk.probability_pct(), "50.00%");
    }
}
