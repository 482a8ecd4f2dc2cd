use std::path::PathBuf;

use ort::Error as OrtError;

use crate::model_manager::ModelError as ArtifactError;
use crate::models::ArtifactKind;

/// Represents the different types of errors that can occur in the image classifier.
#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    /// The model artifact could not be fetched or read
    #[error("Load error: {0}")]
    LoadError(String),
    /// Error occurred while loading or running the ONNX model
    #[error("Model error: {0}")]
    ModelError(String),
    /// Error occurred during the build phase
    #[error("Build error: {0}")]
    BuildError(String),
    /// Error occurred while making predictions
    #[error("Prediction error: {0}")]
    PredictionError(String),
    /// Error occurred due to invalid input, such as bytes that are not an image
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// The input image path does not exist
    #[error("Could not find image at '{}'", .0.display())]
    MissingFile(PathBuf),
}

impl From<OrtError> for ClassifierError {
    fn from(err: OrtError) -> Self {
        ClassifierError::BuildError(err.to_string())
    }
}

/// Appended to load errors when the hub folder has no ONNX graph, which is
/// the case for folders holding only PyTorch or safetensors weights.
pub const ONNX_EXPORT_HINT: &str = "the artifact must contain an ONNX export of the classifier. \
Export it with `optimum-cli export onnx --model <repo> <dir>`, then pass `--model-dir <dir>` \
or point `--repo`/`--subfolder` at a hub folder holding the .onnx file";

impl From<ArtifactError> for ClassifierError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::ArtifactNotFound { kind: ArtifactKind::Model, .. } => {
                ClassifierError::LoadError(format!("{}: {}", err, ONNX_EXPORT_HINT))
            }
            err => ClassifierError::LoadError(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_onnx_graph_mentions_export() {
        let err: ClassifierError = ArtifactError::ArtifactNotFound {
            kind: ArtifactKind::Model,
            url: "https://hub/owner/repo/resolve/main/model.onnx".to_string(),
        }
        .into();
        let message = err.to_string();
        assert!(matches!(err, ClassifierError::LoadError(_)));
        assert!(message.contains("model file not found at https://hub/owner/repo/resolve/main/model.onnx"));
        assert!(message.contains(ONNX_EXPORT_HINT));
    }

    #[test]
    fn test_missing_config_has_no_export_hint() {
        let err: ClassifierError = ArtifactError::ArtifactNotFound {
            kind: ArtifactKind::Config,
            url: "https://hub/config.json".to_string(),
        }
        .into();
        assert!(!err.to_string().contains("optimum-cli"));
    }

    #[test]
    fn test_missing_file_message() {
        let err = ClassifierError::MissingFile(PathBuf::from("scans/mouth.jpeg"));
        assert_eq!(err.to_string(), "Could not find image at 'scans/mouth.jpeg'");
    }
}
