use std::collections::BTreeMap;

use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::causes::{self, CauseMode};
use crate::error::{AssessmentError, ModelStage, Result};
use crate::features::{self, FeatureRecord};
use crate::inference::{self, ModelPair};
use crate::models::{DelayEstimate, DelayProjection, ProjectInput, RiskAssessment};
use crate::projection;
use crate::tiering;

#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    pub cause_mode: CauseMode,
}

/// Everything one request produces. Nothing here outlives the response.
#[derive(Debug, Clone)]
pub struct Assessment {
    pub request_id: Uuid,
    pub record: FeatureRecord,
    pub risk: RiskAssessment,
    pub delay: Option<DelayProjection>,
}

pub fn assess(
    models: &ModelPair,
    input: ProjectInput,
    options: PipelineOptions,
) -> Result<Assessment> {
    let request_id = Uuid::new_v4();
    let span = info_span!(
        "assessment",
        %request_id,
        generation = models.schema.generation.as_str()
    );
    let _guard = span.enter();

    let record = features::build(input, models.schema)?;
    let probability = inference::classify(models.classifier.as_ref(), &record)?;
    let provisional = tiering::tier_for(probability);

    if !tiering::warrants_estimate(provisional) {
        info!(probability, tier = %provisional, "assessment complete");
        return Ok(Assessment {
            request_id,
            risk: tiering::finalize(probability, provisional, None, None),
            record,
            delay: None,
        });
    }

    let estimate = DelayEstimate::from_raw(inference::estimate(
        models.regressor.as_ref(),
        &record,
    )?);
    if estimate.negative_estimate {
        warn!(
            raw_days = estimate.raw_days,
            "regressor returned a negative delay; clamped to zero"
        );
    }

    let margin = if models.schema.calendar_aware {
        record.derived.schedule_margin_days
    } else {
        None
    };
    let risk = tiering::finalize(probability, provisional, margin, Some(estimate.days));

    let diagnosis = causes::infer_causes(&record, risk.tier, options.cause_mode);
    let start_year = if models.schema.calendar_aware {
        record.input.start_year
    } else {
        None
    };
    let projection = projection::project(
        record.start_month,
        start_year,
        record.input.planned_duration_days,
        estimate.days,
    )?;

    info!(
        probability,
        tier = %risk.tier,
        margin_absorbed = risk.margin_absorbed,
        delay_days = estimate.days,
        causes = diagnosis.causes.len(),
        "assessment complete"
    );

    Ok(Assessment {
        request_id,
        delay: Some(DelayProjection {
            estimate,
            projection,
            causes: diagnosis.causes,
            explanation: diagnosis.explanation,
        }),
        record,
        risk,
    })
}

/// Outcome of the optional importance lookup. Failures never abort a request.
#[derive(Debug, Clone)]
pub enum Importances {
    Available(Vec<(String, f64)>),
    Unavailable(String),
}

pub fn feature_importances(models: &ModelPair) -> Importances {
    match models.classifier.feature_importances() {
        Ok(map) => Importances::Available(rank(map)),
        Err(err) => {
            let err = AssessmentError::inference(ModelStage::Importance, err);
            warn!(error = %err, "feature importances unavailable");
            Importances::Unavailable(format!("Feature importances are unavailable: {err}"))
        }
    }
}

fn rank(map: BTreeMap<String, f64>) -> Vec<(String, f64)> {
    let mut ranked: Vec<(String, f64)> = map.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
