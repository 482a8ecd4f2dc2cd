use std::path::Path;
use std::sync::Mutex;

use image::{Rgb, RgbImage};
use log::{info, warn};
use ort::session::Session;

use super::classifier::Classifier;
use super::error::ClassifierError;
use super::inference::ForwardPass;
use super::outcome::LabelMap;
use super::preprocess::{Preprocessor, PreprocessorConfig};
use crate::models::ModelInfo;
use crate::runtime::{create_session_builder, RuntimeConfig};
use crate::ModelManager;

/// A builder for constructing a Classifier with a fluent interface.
#[derive(Default)]
pub struct ClassifierBuilder {
    model_path: Option<String>,
    session: Option<Mutex<Session>>,
    preprocessor_config: Option<PreprocessorConfig>,
    labels: Option<LabelMap>,
    runtime_config: RuntimeConfig,
}

impl std::fmt::Debug for ClassifierBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierBuilder")
            .field("model_path", &self.model_path)
            .field("preprocessor_config", &self.preprocessor_config)
            .field("labels", &self.labels)
            .field("runtime_config", &self.runtime_config)
            .finish_non_exhaustive()
    }
}

impl ForwardPass for ClassifierBuilder {
    fn session(&self) -> Option<&Mutex<Session>> {
        self.session.as_ref()
    }
}

impl ClassifierBuilder {
    /// Creates a new empty ClassifierBuilder instance with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the runtime configuration for ONNX model execution.
    /// Must be called before the model is loaded to take effect.
    ///
    /// # Example
    /// ```
    /// use oralscan::{ClassifierBuilder, RuntimeConfig};
    ///
    /// let config = RuntimeConfig { intra_threads: 2, ..RuntimeConfig::default() };
    /// let builder = ClassifierBuilder::new()
    ///     .with_runtime_config(config);
    /// ```
    pub fn with_runtime_config(mut self, config: RuntimeConfig) -> Self {
        self.runtime_config = config;
        self
    }

    /// Loads the artifact described by `info` from the manager's cache.
    ///
    /// # Returns
    /// * `Result<Self, ClassifierError>` - The builder instance if successful, or an error if:
    ///   - A model is already set
    ///   - The artifact is not downloaded
    ///   - Any of the three files fails to load
    ///   - The model structure is invalid
    pub fn with_model(self, manager: &ModelManager, info: &ModelInfo) -> Result<Self, ClassifierError> {
        if !manager.is_model_downloaded(info) {
            return Err(ClassifierError::BuildError(format!(
                "Model '{}' is not downloaded. Please download it first using ModelManager::download_model()",
                info.repo_id
            )));
        }

        self.load_files(
            &manager.get_model_path(info),
            &manager.get_preprocessor_path(info),
            &manager.get_config_path(info),
        )
    }

    /// Loads a model from explicit file paths
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file
    /// * `preprocessor_path` - Path to `preprocessor_config.json`
    /// * `config_path` - Path to the model's `config.json` holding `id2label`
    pub fn with_custom_model(
        self,
        model_path: &str,
        preprocessor_path: &str,
        config_path: &str,
    ) -> Result<Self, ClassifierError> {
        if model_path.is_empty() || preprocessor_path.is_empty() || config_path.is_empty() {
            return Err(ClassifierError::BuildError("Model file paths cannot be empty".to_string()));
        }
        for path in [model_path, preprocessor_path, config_path] {
            if !Path::new(path).exists() {
                return Err(ClassifierError::BuildError(format!("Model file not found: {}", path)));
            }
        }

        self.load_files(Path::new(model_path), Path::new(preprocessor_path), Path::new(config_path))
    }

    /// Loads a model from a directory holding `model.onnx`,
    /// `preprocessor_config.json` and `config.json`.
    pub fn with_model_dir(self, dir: impl AsRef<Path>, model_file: &str) -> Result<Self, ClassifierError> {
        let dir = dir.as_ref();
        let path = |name: &str| dir.join(name).to_string_lossy().to_string();
        self.with_custom_model(
            &path(model_file),
            &path("preprocessor_config.json"),
            &path("config.json"),
        )
    }

    fn load_files(
        mut self,
        model_path: &Path,
        preprocessor_path: &Path,
        config_path: &Path,
    ) -> Result<Self, ClassifierError> {
        if self.model_path.is_some() {
            return Err(ClassifierError::BuildError("Model already set".to_string()));
        }

        let preprocessor_config = PreprocessorConfig::from_file(preprocessor_path)?;
        info!("Preprocessor config loaded from {:?}", preprocessor_path);

        let labels = LabelMap::from_file(config_path)?;
        info!("Label table loaded with {} entries", labels.len());

        let session = create_session_builder(&self.runtime_config)?
            .commit_from_file(model_path)
            .map_err(|e| ClassifierError::LoadError(format!("Failed to load model {:?}: {}", model_path, e)))?;

        Self::validate_model(&session)?;
        info!("Model structure validated successfully");

        self.model_path = Some(model_path.to_string_lossy().to_string());
        self.session = Some(Mutex::new(session));
        self.preprocessor_config = Some(preprocessor_config);
        self.labels = Some(labels);
        Ok(self)
    }

    /// Builds and returns the final Classifier instance.
    ///
    /// Runs one forward pass on a blank image so a model whose output does
    /// not fit the label table fails here rather than on the first request.
    ///
    /// # Example
    /// ```no_run
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// use oralscan::ClassifierBuilder;
    ///
    /// let classifier = ClassifierBuilder::new()
    ///     .with_model_dir("models/vit", "model.onnx")?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn build(mut self) -> Result<Classifier, ClassifierError> {
        let model_path = self.model_path.take()
            .ok_or_else(|| ClassifierError::BuildError("Model must be set".to_string()))?;
        let preprocessor = Preprocessor::new(self.preprocessor_config.take()
            .ok_or_else(|| ClassifierError::BuildError("Preprocessor config not set".to_string()))?);
        let labels = self.labels.take()
            .ok_or_else(|| ClassifierError::BuildError("Label table not set".to_string()))?;

        let probe = RgbImage::from_pixel(32, 32, Rgb([128, 128, 128]));
        let scores = self.forward(&preprocessor.preprocess(&probe)?)
            .map_err(|e| ClassifierError::BuildError(format!("Warm-up inference failed: {}", e)))?;
        info!("Model produces {} scores", scores.len());
        if scores.is_empty() {
            return Err(ClassifierError::BuildError("Model produced no scores".to_string()));
        }
        if !labels.is_empty() && scores.len() != labels.len() {
            warn!(
                "Model produces {} scores but its config declares {} labels",
                scores.len(),
                labels.len()
            );
        }

        let session = self.session.take()
            .ok_or_else(|| ClassifierError::BuildError("No ONNX model loaded".into()))?;

        Ok(Classifier {
            model_path,
            session,
            preprocessor,
            labels,
        })
    }

    /// Validates that the model has the expected input/output structure
    fn validate_model(session: &Session) -> Result<(), ClassifierError> {
        if session.inputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 input for pixel values".to_string()
            ));
        }
        if session.outputs.is_empty() {
            return Err(ClassifierError::ModelError(
                "Model must have at least 1 output for scores".to_string()
            ));
        }
        Ok(())
    }
}
