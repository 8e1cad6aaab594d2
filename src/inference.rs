//! Model bundles and the adapters the pipeline calls them through.
//!
//! A bundle is a JSON document holding a column preprocessor and a linear
//! model. Classification bundles use a logistic link, regression bundles an
//! identity link.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AssessmentError, ModelError, ModelStage, Result};
use crate::features::FeatureRecord;
use crate::models::FeatureValue;
use crate::schema::{ModelGeneration, Schema};

pub trait ProbabilityModel: Send + Sync {
    fn preprocess(&self, record: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError>;

    fn predict_probability(&self, features: &[f64]) -> std::result::Result<f64, ModelError>;

    /// Relative importance per source column.
    fn feature_importances(&self) -> std::result::Result<BTreeMap<String, f64>, ModelError>;
}

pub trait EstimateModel: Send + Sync {
    fn preprocess(&self, record: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError>;

    fn predict(&self, features: &[f64]) -> std::result::Result<f64, ModelError>;
}

/// The two read-only models one process serves requests with.
#[derive(Clone)]
pub struct ModelPair {
    pub schema: &'static Schema,
    pub classifier: Arc<dyn ProbabilityModel>,
    pub regressor: Arc<dyn EstimateModel>,
}

pub fn classify(model: &dyn ProbabilityModel, record: &FeatureRecord) -> Result<f64> {
    let stage = ModelStage::Classification;
    let features = model
        .preprocess(record)
        .map_err(|err| AssessmentError::inference(stage, err))?;
    let probability = model
        .predict_probability(&features)
        .map_err(|err| AssessmentError::inference(stage, err))?;
    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(AssessmentError::inference(
            stage,
            ModelError::Malformed(format!("probability {probability} is outside [0, 1]")),
        ));
    }
    Ok(probability)
}

pub fn estimate(model: &dyn EstimateModel, record: &FeatureRecord) -> Result<f64> {
    let stage = ModelStage::Regression;
    let features = model
        .preprocess(record)
        .map_err(|err| AssessmentError::inference(stage, err))?;
    let days = model
        .predict(&features)
        .map_err(|err| AssessmentError::inference(stage, err))?;
    if !days.is_finite() {
        return Err(AssessmentError::inference(
            stage,
            ModelError::Malformed(format!("delay estimate {days} is not finite")),
        ));
    }
    Ok(days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Link {
    #[default]
    Identity,
    Logistic,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encoding {
    OneHot { categories: Vec<String> },
    Standardize { mean: f64, scale: f64 },
    Passthrough,
}

impl Encoding {
    fn width(&self) -> usize {
        match self {
            Encoding::OneHot { categories } => categories.len(),
            Encoding::Standardize { .. } | Encoding::Passthrough => 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnStep {
    pub column: String,
    pub encoding: Encoding,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Preprocessor {
    pub steps: Vec<ColumnStep>,
}

impl Preprocessor {
    pub fn width(&self) -> usize {
        self.steps.iter().map(|step| step.encoding.width()).sum()
    }

    pub fn transform(&self, record: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError> {
        let mut output = Vec::with_capacity(self.width());
        for step in &self.steps {
            let value = record
                .get(&step.column)
                .ok_or_else(|| ModelError::MissingColumn(step.column.clone()))?;
            match &step.encoding {
                Encoding::OneHot { categories } => {
                    let category = value.as_text().ok_or_else(|| ModelError::TypeMismatch {
                        column: step.column.clone(),
                        expected: "categorical",
                    })?;
                    // unseen categories encode as all zeros
                    output.extend(
                        categories
                            .iter()
                            .map(|candidate| if candidate == category { 1.0 } else { 0.0 }),
                    );
                }
                Encoding::Standardize { mean, scale } => {
                    let number = numeric(&step.column, value)?;
                    output.push((number - mean) / scale);
                }
                Encoding::Passthrough => output.push(numeric(&step.column, value)?),
            }
        }
        Ok(output)
    }
}

fn numeric(column: &str, value: &FeatureValue) -> std::result::Result<f64, ModelError> {
    value.as_number().ok_or_else(|| ModelError::TypeMismatch {
        column: column.to_string(),
        expected: "numeric",
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    #[serde(default)]
    pub link: Link,
}

impl LinearModel {
    fn score(&self, features: &[f64]) -> std::result::Result<f64, ModelError> {
        if features.len() != self.coefficients.len() {
            return Err(ModelError::SchemaMismatch {
                expected: self.coefficients.len(),
                actual: features.len(),
            });
        }
        let linear = self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(coef, value)| coef * value)
                .sum::<f64>();
        Ok(match self.link {
            Link::Identity => linear,
            Link::Logistic => 1.0 / (1.0 + (-linear).exp()),
        })
    }
}

#[derive(Debug, Deserialize)]
struct BundleFile {
    generation: ModelGeneration,
    preprocessor: Option<Preprocessor>,
    model: Option<LinearModel>,
}

/// A validated preprocessor/model pair loaded from one artifact.
#[derive(Debug, Clone)]
pub struct ModelBundle {
    pub artifact: String,
    pub preprocessor: Preprocessor,
    pub model: LinearModel,
}

impl ModelBundle {
    pub fn load(path: &Path, generation: ModelGeneration, link: Link) -> Result<Self> {
        let artifact = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AssessmentError::configuration(&artifact, format!("cannot read artifact: {err}"))
        })?;
        let bundle = Self::from_json(&artifact, &raw, generation, link)?;
        info!(
            artifact = %bundle.artifact,
            generation = generation.as_str(),
            features = bundle.model.coefficients.len(),
            "model bundle loaded"
        );
        Ok(bundle)
    }

    pub fn from_json(
        artifact: &str,
        raw: &str,
        generation: ModelGeneration,
        link: Link,
    ) -> Result<Self> {
        let file: BundleFile = serde_json::from_str(raw).map_err(|err| {
            AssessmentError::configuration(artifact, format!("invalid bundle: {err}"))
        })?;
        let preprocessor = file.preprocessor.ok_or_else(|| {
            AssessmentError::configuration(artifact, "bundle has no preprocessor")
        })?;
        let model = file
            .model
            .ok_or_else(|| AssessmentError::configuration(artifact, "bundle has no model"))?;

        if file.generation != generation {
            return Err(AssessmentError::configuration(
                artifact,
                format!(
                    "bundle was trained for `{}`, configured generation is `{}`",
                    file.generation.as_str(),
                    generation.as_str()
                ),
            ));
        }
        let schema = generation.schema();
        if let Some(step) = preprocessor
            .steps
            .iter()
            .find(|step| !schema.expects(&step.column))
        {
            return Err(AssessmentError::configuration(
                artifact,
                format!(
                    "column `{}` is not part of the `{}` feature record",
                    step.column,
                    generation.as_str()
                ),
            ));
        }
        if model.link != link {
            return Err(AssessmentError::configuration(
                artifact,
                format!("expected a {link:?} link, found {:?}", model.link),
            ));
        }
        if preprocessor.width() != model.coefficients.len() {
            return Err(AssessmentError::configuration(
                artifact,
                format!(
                    "preprocessor emits {} features but the model has {} coefficients",
                    preprocessor.width(),
                    model.coefficients.len()
                ),
            ));
        }
        for step in &preprocessor.steps {
            if let Encoding::Standardize { scale, .. } = step.encoding {
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(AssessmentError::configuration(
                        artifact,
                        format!("column `{}` has non-positive scale {scale}", step.column),
                    ));
                }
            }
        }

        Ok(ModelBundle {
            artifact: artifact.to_string(),
            preprocessor,
            model,
        })
    }
}

impl ProbabilityModel for ModelBundle {
    fn preprocess(&self, record: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError> {
        self.preprocessor.transform(record)
    }

    fn predict_probability(&self, features: &[f64]) -> std::result::Result<f64, ModelError> {
        self.model.score(features)
    }

    fn feature_importances(&self) -> std::result::Result<BTreeMap<String, f64>, ModelError> {
        let mut importances = BTreeMap::new();
        let mut offset = 0;
        for step in &self.preprocessor.steps {
            let width = step.encoding.width();
            let weights = self
                .model
                .coefficients
                .get(offset..offset + width)
                .ok_or(ModelError::SchemaMismatch {
                    expected: offset + width,
                    actual: self.model.coefficients.len(),
                })?;
            *importances.entry(step.column.clone()).or_insert(0.0) +=
                weights.iter().map(|w| w.abs()).sum::<f64>();
            offset += width;
        }

        let total: f64 = importances.values().sum();
        if !(total.is_finite() && total > 0.0) {
            return Err(ModelError::Malformed(
                "model has no non-zero coefficients".to_string(),
            ));
        }
        for value in importances.values_mut() {
            *value /= total;
        }
        debug!(columns = importances.len(), "feature importances computed");
        Ok(importances)
    }
}

impl EstimateModel for ModelBundle {
    fn preprocess(&self, record: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError> {
        self.preprocessor.transform(record)
    }

    fn predict(&self, features: &[f64]) -> std::result::Result<f64, ModelError> {
        self.model.score(features)
    }
}

#[cfg(test)]
pub(crate) mod stubs {
    use super::*;

    /// Classifier returning a fixed probability.
    pub(crate) struct FixedProbability(pub f64);

    impl ProbabilityModel for FixedProbability {
        fn preprocess(&self, _: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError> {
            Ok(Vec::new())
        }

        fn predict_probability(&self, _: &[f64]) -> std::result::Result<f64, ModelError> {
            Ok(self.0)
        }

        fn feature_importances(&self) -> std::result::Result<BTreeMap<String, f64>, ModelError> {
            Err(ModelError::Malformed("no importances".to_string()))
        }
    }

    /// Regressor returning a fixed delay, or failing when `None`.
    pub(crate) struct FixedDelay(pub Option<f64>);

    impl EstimateModel for FixedDelay {
        fn preprocess(&self, _: &FeatureRecord) -> std::result::Result<Vec<f64>, ModelError> {
            Ok(Vec::new())
        }

        fn predict(&self, _: &[f64]) -> std::result::Result<f64, ModelError> {
            self.0.ok_or(ModelError::SchemaMismatch {
                expected: 18,
                actual: 17,
            })
        }
    }
}
