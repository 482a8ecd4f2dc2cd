//! ONNX image classification: preprocessing, forward pass and mapping of
//! raw scores to a diagnosis.

mod builder;
#[allow(clippy::module_inception)]
mod classifier;
mod error;
mod inference;
pub mod outcome;
pub mod preprocess;
pub mod utils;

pub use builder::ClassifierBuilder;
pub use classifier::{Classifier, ClassifierInfo, ImageClassifier};
pub use error::{ClassifierError, ONNX_EXPORT_HINT};
pub use outcome::{Diagnosis, LabelMap, Prediction};
pub use preprocess::{Preprocessor, PreprocessorConfig, SizeSpec};

use crate::models::ModelInfo;
use crate::runtime::RuntimeConfig;
use crate::ModelManager;

/// Fetches the artifact (unless cached) and builds a classifier from it.
///
/// With `fresh` set, cached files are removed first. Loading is attempted
/// once; failures come back as `LoadError` or `BuildError`.
pub async fn load_classifier(
    manager: &ModelManager,
    info: &ModelInfo,
    runtime_config: RuntimeConfig,
    fresh: bool,
) -> Result<Classifier, ClassifierError> {
    if fresh {
        log::info!("Fresh download requested - removing any existing model files...");
        manager.remove_download(info)?;
    }
    manager.ensure_model_downloaded(info).await?;

    Classifier::builder()
        .with_runtime_config(runtime_config)
        .with_model(manager, info)?
        .build()
}
