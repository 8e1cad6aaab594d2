use chrono::{Datelike, Month, NaiveDate};

use crate::calendar;
use crate::error::{AssessmentError, ModelError, ModelStage, Result};
use crate::schema::columns;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// 30-day month steps, no year tracking.
    Approximate,
    /// Calendar arithmetic from the first day of the start month.
    Exact,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub precision: Precision,
    /// Month the planned completion falls in, where the delay starts to bite.
    pub impact_month: Month,
    pub impact_year: Option<i32>,
    pub new_completion_date: Option<NaiveDate>,
}

/// `delay_days` must already be clamped; it is rounded to whole days only for
/// the calendar date.
pub fn project(
    start_month: Month,
    start_year: Option<i32>,
    duration_days: u32,
    delay_days: f64,
) -> Result<Projection> {
    let Some(year) = start_year else {
        return Ok(Projection {
            precision: Precision::Approximate,
            impact_month: calendar::advance_month(start_month, f64::from(duration_days)),
            impact_year: None,
            new_completion_date: None,
        });
    };

    let start = calendar::approximate_start_date(start_month, year).ok_or_else(|| {
        AssessmentError::validation(columns::START_YEAR, format!("{year} is out of range"))
    })?;
    let planned_end = calendar::add_days(start, i64::from(duration_days)).ok_or_else(|| {
        AssessmentError::validation(columns::DURATION, "planned completion is out of range")
    })?;
    let new_completion = calendar::add_days(planned_end, delay_days.round() as i64)
        .ok_or_else(|| {
            AssessmentError::inference(
                ModelStage::Regression,
                ModelError::Malformed(format!("delay of {delay_days} days is out of range")),
            )
        })?;

    Ok(Projection {
        precision: Precision::Exact,
        impact_month: calendar::month_of(planned_end),
        impact_year: Some(planned_end.year()),
        new_completion_date: Some(new_completion),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_projection_uses_calendar_arithmetic() {
        let projection = project(Month::June, Some(2024), 365, 40.0).expect("in range");
        assert_eq!(projection.precision, Precision::Exact);
        assert_eq!(
            projection.new_completion_date,
            NaiveDate::from_ymd_opt(2025, 7, 11)
        );
        assert_eq!(projection.impact_month, Month::June);
        assert_eq!(projection.impact_year, Some(2025));
    }

    #[test]
    fn exact_projection_rolls_over_leap_years() {
        let projection = project(Month::November, Some(2023), 400, 0.0).expect("in range");
        assert_eq!(
            projection.new_completion_date,
            NaiveDate::from_ymd_opt(2024, 12, 5)
        );
        assert_eq!(projection.impact_month, Month::December);
        assert_eq!(projection.impact_year, Some(2024));
    }

    #[test]
    fn fractional_delays_round_to_whole_days() {
        let projection = project(Month::June, Some(2024), 365, 39.6).expect("in range");
        assert_eq!(
            projection.new_completion_date,
            NaiveDate::from_ymd_opt(2025, 7, 11)
        );
    }

    #[test]
    fn approximate_projection_steps_by_thirty_days() {
        let projection = project(Month::October, None, 90, 25.0).expect("approximate");
        assert_eq!(projection.precision, Precision::Approximate);
        assert_eq!(projection.impact_month, Month::January);
        assert_eq!(projection.impact_year, None);
        assert_eq!(projection.new_completion_date, None);
    }
}
