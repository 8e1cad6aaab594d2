use chrono::{Datelike, Days, Month, NaiveDate};

use crate::models::Season;
use crate::schema::{SeasonTable, CYCLONE_REGIONS};

pub const MONTH_NAMES: [&str; 12] = [
    "Enero",
    "Febrero",
    "Marzo",
    "Abril",
    "Mayo",
    "Junio",
    "Julio",
    "Agosto",
    "Septiembre",
    "Octubre",
    "Noviembre",
    "Diciembre",
];

const DAYS_PER_MONTH_STEP: f64 = 30.0;

pub fn month_from_name(name: &str) -> Option<Month> {
    let name = name.trim();
    MONTH_NAMES
        .iter()
        .position(|candidate| candidate.eq_ignore_ascii_case(name))
        .and_then(|idx| Month::try_from(idx as u8 + 1).ok())
}

pub fn month_name(month: Month) -> &'static str {
    MONTH_NAMES[month.number_from_month() as usize - 1]
}

pub fn season_for(month: Month, region: &str, table: SeasonTable) -> Season {
    let number = month.number_from_month();
    match table {
        SeasonTable::Fixed => match number {
            1..=3 => Season::Dry,
            4 | 5 => Season::Rainy,
            6..=9 => Season::Cyclonic,
            10 => Season::Rainy,
            _ => Season::Dry,
        },
        SeasonTable::RegionAware => match number {
            5..=9 => Season::Rainy,
            10 | 11 if CYCLONE_REGIONS.contains(&region) => Season::Cyclonic,
            10 | 11 => Season::Rainy,
            _ => Season::Dry,
        },
    }
}

/// Steps `start` forward one month per completed 30-day block, wrapping on December.
pub fn advance_month(start: Month, duration_days: f64) -> Month {
    let steps = (duration_days.max(0.0) / DAYS_PER_MONTH_STEP).floor() as u64;
    (0..steps % 12).fold(start, |month, _| month.succ())
}

pub fn month_of(date: NaiveDate) -> Month {
    (1..date.month()).fold(Month::January, |month, _| month.succ())
}

/// First day of the start month, the reference date for margin and projection.
pub fn approximate_start_date(month: Month, year: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.number_from_month(), 1)
}

pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    if days >= 0 {
        date.checked_add_days(Days::new(days as u64))
    } else {
        date.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_months() -> impl Iterator<Item = Month> {
        (1u8..=12).filter_map(|n| Month::try_from(n).ok())
    }

    #[test]
    fn month_names_round_trip_through_lookup() {
        for month in all_months() {
            assert_eq!(month_from_name(month_name(month)), Some(month));
        }
        assert_eq!(month_from_name("junio"), Some(Month::June));
        assert_eq!(month_from_name("Juni"), None);
    }

    #[test]
    fn advance_keeps_month_inside_first_block() {
        for month in all_months() {
            for days in [0.0, 1.0, 15.0, 29.0, 29.9] {
                assert_eq!(advance_month(month, days), month);
            }
            for days in [30.0, 45.0, 59.0] {
                assert_eq!(advance_month(month, days), month.succ());
            }
        }
    }

    #[test]
    fn advance_wraps_december_into_january() {
        assert_eq!(advance_month(Month::December, 30.0), Month::January);
        assert_eq!(advance_month(Month::November, 95.0), Month::February);
        assert_eq!(advance_month(Month::June, 365.0), Month::June);
    }

    #[test]
    fn season_lookup_is_total() {
        for month in all_months() {
            for table in [SeasonTable::Fixed, SeasonTable::RegionAware] {
                let _ = season_for(month, "Centro", table);
            }
        }
    }

    #[test]
    fn cyclone_window_depends_on_region() {
        for month in [Month::October, Month::November] {
            assert_eq!(
                season_for(month, "Sureste", SeasonTable::RegionAware),
                Season::Cyclonic
            );
            assert_eq!(
                season_for(month, "Golfo", SeasonTable::RegionAware),
                Season::Cyclonic
            );
            for region in ["Centro", "Occidente", "Noreste", "Sur", "Bajío"] {
                assert_eq!(
                    season_for(month, region, SeasonTable::RegionAware),
                    Season::Rainy
                );
            }
        }
    }

    #[test]
    fn region_aware_table_only_emits_cyclonic_in_window() {
        for month in all_months() {
            let n = month.number_from_month();
            let season = season_for(month, "Golfo", SeasonTable::RegionAware);
            if season == Season::Cyclonic {
                assert!(n == 10 || n == 11);
            }
        }
        assert_eq!(
            season_for(Month::June, "Sureste", SeasonTable::RegionAware),
            Season::Rainy
        );
        assert_eq!(
            season_for(Month::June, "Sureste", SeasonTable::Fixed),
            Season::Cyclonic
        );
    }

    #[test]
    fn add_days_respects_leap_years() {
        let start = NaiveDate::from_ymd_opt(2023, 11, 1).unwrap();
        assert_eq!(
            add_days(start, 400),
            NaiveDate::from_ymd_opt(2024, 12, 5)
        );
        assert_eq!(add_days(start, -1), NaiveDate::from_ymd_opt(2023, 10, 31));
    }
}
