use std::path::PathBuf;
use std::sync::Arc;

use crate::error::Result;
use crate::inference::{Link, ModelBundle, ModelPair};
use crate::schema::ModelGeneration;

pub const MODELS_DIR_ENV: &str = "DELAY_RISK_MODELS_DIR";
const DEFAULT_MODELS_DIR: &str = "models";
const CLASSIFIER_FILE: &str = "clasificacion.json";
const REGRESSOR_FILE: &str = "regresion.json";

/// Where the artifacts of one model generation live:
/// `<models_dir>/<generation>/{clasificacion,regresion}.json`.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub generation: ModelGeneration,
    pub models_dir: PathBuf,
}

impl ModelConfig {
    /// An explicit directory wins over `DELAY_RISK_MODELS_DIR`, which wins over `./models`.
    pub fn resolve(generation: ModelGeneration, models_dir: Option<PathBuf>) -> Self {
        let models_dir = models_dir
            .or_else(|| std::env::var(MODELS_DIR_ENV).ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODELS_DIR));
        ModelConfig {
            generation,
            models_dir,
        }
    }

    fn generation_dir(&self) -> PathBuf {
        self.models_dir.join(self.generation.as_str())
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.generation_dir().join(CLASSIFIER_FILE)
    }

    pub fn regressor_path(&self) -> PathBuf {
        self.generation_dir().join(REGRESSOR_FILE)
    }
}

/// Loads both bundles once; the returned pair is shared read-only afterwards.
pub fn load_models(config: &ModelConfig) -> Result<ModelPair> {
    let classifier =
        ModelBundle::load(&config.classifier_path(), config.generation, Link::Logistic)?;
    let regressor =
        ModelBundle::load(&config.regressor_path(), config.generation, Link::Identity)?;
    Ok(ModelPair {
        schema: config.generation.schema(),
        classifier: Arc::new(classifier),
        regressor: Arc::new(regressor),
    })
}
