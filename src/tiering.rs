use crate::models::{RiskAssessment, Tier};

pub const HIGH_THRESHOLD: f64 = 0.70;
pub const MODERATE_THRESHOLD: f64 = 0.40;
/// Smallest schedule margin that may absorb an estimated delay.
pub const MARGIN_OVERRIDE_MIN_DAYS: i64 = 60;

pub fn tier_for(probability: f64) -> Tier {
    if probability >= HIGH_THRESHOLD {
        Tier::High
    } else if probability >= MODERATE_THRESHOLD {
        Tier::Moderate
    } else {
        Tier::Low
    }
}

/// Whether a provisional tier calls for the delay estimator.
pub fn warrants_estimate(tier: Tier) -> bool {
    tier != Tier::Low
}

/// Second pass: downgrades to LOW when the schedule margin absorbs the delay.
///
/// `margin_days` is only supplied for calendar-aware generations. The
/// probability is never altered.
pub fn finalize(
    probability: f64,
    provisional: Tier,
    margin_days: Option<i64>,
    delay_days: Option<f64>,
) -> RiskAssessment {
    let absorbed = match (margin_days, delay_days) {
        (Some(margin), Some(delay)) => {
            warrants_estimate(provisional)
                && margin >= MARGIN_OVERRIDE_MIN_DAYS
                && delay < margin as f64
        }
        _ => false,
    };

    RiskAssessment {
        probability,
        provisional_tier: provisional,
        tier: if absorbed { Tier::Low } else { provisional },
        margin_absorbed: absorbed,
    }
}
