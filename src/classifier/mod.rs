// Text classification — trait-based abstraction for swappable backends.
//
// The Classifier trait is the only thing the endpoint depends on. The ONNX
// backend is the default; Perspective is selectable via GUARD_SCORER.

pub mod download;
pub mod onnx;
pub mod perspective;
pub mod rate_limiter;
pub mod traits;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::{ClassifierBackend, Config};

pub use traits::{Classifier, LabelScores};

/// Build the configured classifier. Called once at startup; any failure
/// here is fatal because the service must not serve without a model.
pub fn create_classifier(config: &Config) -> Result<Arc<dyn Classifier>> {
    config.require_classifier()?;
    match config.classifier_backend {
        ClassifierBackend::Onnx => {
            info!(model_dir = %config.model_dir.display(), "Using local ONNX classifier");
            let classifier = onnx::OnnxClassifier::load(&config.model_dir)?;
            Ok(Arc::new(classifier))
        }
        ClassifierBackend::Perspective => {
            info!("Using Perspective API classifier");
            let classifier =
                perspective::PerspectiveClassifier::new(config.perspective_api_key.clone());
            Ok(Arc::new(classifier))
        }
    }
}
