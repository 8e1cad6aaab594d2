use chrono::{Month, NaiveDate};
use tracing::debug;

use crate::calendar;
use crate::error::{AssessmentError, Result};
use crate::models::{DerivedFeatures, FeatureValue, HazardLevel, ProjectInput};
use crate::schema::{columns, ModelGeneration, Schema};

/// Flat record handed to the models: raw input, derived values and the
/// ordered columns the active schema allows.
#[derive(Debug, Clone)]
pub struct FeatureRecord {
    pub generation: ModelGeneration,
    pub input: ProjectInput,
    pub start_month: Month,
    pub seismic_risk: HazardLevel,
    pub flood_risk: HazardLevel,
    pub derived: DerivedFeatures,
    columns: Vec<(&'static str, FeatureValue)>,
}

impl FeatureRecord {
    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(name, _)| *name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> &[(&'static str, FeatureValue)] {
        &self.columns
    }
}

pub fn build(input: ProjectInput, schema: &Schema) -> Result<FeatureRecord> {
    check_membership(columns::WORK_TYPE, &input.work_type, schema.work_types)?;
    check_membership(columns::REGION, &input.region, schema.regions)?;

    let start_month = calendar::month_from_name(&input.start_month).ok_or_else(|| {
        AssessmentError::validation(
            columns::START_MONTH,
            format!("`{}` is not a month name", input.start_month),
        )
    })?;
    let seismic_risk = parse_hazard(columns::SEISMIC_RISK, &input.seismic_risk)?;
    let flood_risk = parse_hazard(columns::FLOOD_RISK, &input.flood_risk)?;

    check_invariants(&input, schema)?;
    check_bounds(&input, schema)?;

    let start_date = match input.start_year {
        Some(year) => Some(calendar::approximate_start_date(start_month, year).ok_or_else(
            || AssessmentError::validation(columns::START_YEAR, format!("{year} is out of range")),
        )?),
        None => None,
    };
    let schedule_margin_days = match (start_date, input.planned_end_date) {
        (Some(start), Some(end)) => Some(schedule_margin(start, end, input.planned_duration_days)?),
        _ => None,
    };

    let derived = DerivedFeatures {
        season: calendar::season_for(start_month, &input.region, schema.season_table),
        pending_cash: input.updated_budget - input.disbursed_flow,
        remaining_from_base: input.base_budget - input.disbursed_flow,
        start_date,
        schedule_margin_days,
    };

    let mut record = FeatureRecord {
        generation: schema.generation,
        input,
        start_month,
        seismic_risk,
        flood_risk,
        derived,
        columns: Vec::with_capacity(schema.columns.len()),
    };
    for &column in schema.columns {
        let value = column_value(&record, column)?;
        record.columns.push((column, value));
    }

    debug!(
        generation = schema.generation.as_str(),
        columns = record.columns.len(),
        season = record.derived.season.label(),
        "feature record built"
    );
    Ok(record)
}

fn schedule_margin(start: NaiveDate, end: NaiveDate, planned_duration_days: u32) -> Result<i64> {
    if end < start {
        return Err(AssessmentError::validation(
            "fecha_fin_planeada",
            format!("{end} is before the project start {start}"),
        ));
    }
    Ok((end - start).num_days() - i64::from(planned_duration_days))
}

fn check_membership(field: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(AssessmentError::validation(
            field,
            format!("`{value}` is not one of {}", allowed.join(", ")),
        ))
    }
}

fn parse_hazard(field: &str, value: &str) -> Result<HazardLevel> {
    value
        .parse()
        .map_err(|message: String| AssessmentError::validation(field, message))
}

/// Inputs outside the schema's columns are ignored, never rejected.
fn check_invariants(input: &ProjectInput, schema: &Schema) -> Result<()> {
    let amounts = [
        (columns::BASE_BUDGET, input.base_budget),
        (columns::UPDATED_BUDGET, input.updated_budget),
        (columns::DISBURSED_FLOW, input.disbursed_flow),
        (columns::FLOOR_AREA, input.floor_area_m2),
    ];
    for (field, value) in amounts {
        if !value.is_finite() || value < 0.0 {
            return Err(AssessmentError::validation(
                field,
                format!("{value} must be a non-negative number"),
            ));
        }
    }

    let progress = [
        (columns::PLANNED_PROGRESS, input.planned_progress_pct),
        (columns::ACTUAL_PROGRESS, input.actual_progress_pct),
    ];
    for (field, value) in progress {
        if !schema.expects(field) {
            continue;
        }
        if let Some(value) = value {
            if !(0.0..=100.0).contains(&value) {
                return Err(AssessmentError::validation(
                    field,
                    format!("{value} is outside 0..=100"),
                ));
            }
        }
    }

    if let Some(rainfall) = input.rainfall_mm.filter(|_| schema.expects(columns::RAINFALL)) {
        if !rainfall.is_finite() {
            return Err(AssessmentError::validation(columns::RAINFALL, "must be finite"));
        }
    }
    Ok(())
}

fn check_bounds(input: &ProjectInput, schema: &Schema) -> Result<()> {
    for bound in schema.bounds {
        let Some(value) = raw_numeric(input, bound.field) else {
            continue;
        };
        if value < bound.min || value > bound.max {
            return Err(AssessmentError::validation(
                bound.field,
                format!("{value} is outside {}..={}", bound.min, bound.max),
            ));
        }
    }
    Ok(())
}

/// Numeric inputs by column name; `None` when the input was not supplied.
fn raw_numeric(input: &ProjectInput, field: &str) -> Option<f64> {
    match field {
        columns::DURATION => Some(f64::from(input.planned_duration_days)),
        columns::BASE_BUDGET => Some(input.base_budget),
        columns::UPDATED_BUDGET => Some(input.updated_budget),
        columns::DISBURSED_FLOW => Some(input.disbursed_flow),
        columns::PENDING_CONTRACTS => Some(f64::from(input.pending_contracts)),
        columns::STAFF => Some(f64::from(input.staff_count)),
        columns::FLOOR_AREA => Some(input.floor_area_m2),
        columns::RAINFALL => input.rainfall_mm,
        columns::SUPPLIERS => input.suppliers.map(f64::from),
        columns::PLANNED_PROGRESS => input.planned_progress_pct,
        columns::ACTUAL_PROGRESS => input.actual_progress_pct,
        columns::START_YEAR => input.start_year.map(f64::from),
        _ => None,
    }
}

fn column_value(record: &FeatureRecord, column: &str) -> Result<FeatureValue> {
    let input = &record.input;
    let text = |value: &str| -> Result<FeatureValue> { Ok(FeatureValue::Text(value.to_string())) };
    match column {
        columns::WORK_TYPE => text(&input.work_type),
        columns::REGION => text(&input.region),
        columns::START_MONTH => text(calendar::month_name(record.start_month)),
        columns::SEASON => text(record.derived.season.label()),
        columns::SEISMIC_RISK => text(record.seismic_risk.label()),
        columns::FLOOD_RISK => text(record.flood_risk.label()),
        columns::PENDING_CASH => Ok(FeatureValue::Number(record.derived.pending_cash)),
        columns::REMAINING_FROM_BASE => {
            Ok(FeatureValue::Number(record.derived.remaining_from_base))
        }
        columns::SCHEDULE_MARGIN => match record.derived.schedule_margin_days {
            Some(days) => Ok(FeatureValue::Number(days as f64)),
            None => Err(AssessmentError::validation(
                column,
                "requires both anio_inicio and fecha_fin_planeada",
            )),
        },
        _ => match raw_numeric(input, column) {
            Some(value) => Ok(FeatureValue::Number(value)),
            None if is_known_numeric(column) => Err(AssessmentError::validation(
                column,
                format!("required by the {} model", record.generation.as_str()),
            )),
            None => Err(AssessmentError::configuration(
                record.generation.as_str(),
                format!("schema lists unknown column `{column}`"),
            )),
        },
    }
}

fn is_known_numeric(column: &str) -> bool {
    matches!(
        column,
        columns::RAINFALL
            | columns::SUPPLIERS
            | columns::PLANNED_PROGRESS
            | columns::ACTUAL_PROGRESS
            | columns::START_YEAR
    )
}
