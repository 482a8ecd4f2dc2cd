use std::sync::Mutex;

use image::RgbImage;
use ort::session::Session;

use super::error::ClassifierError;
use super::inference::ForwardPass;
use super::outcome::{LabelMap, Prediction};
use super::preprocess::Preprocessor;

/// Anything that can turn a decoded image into a [`Prediction`].
///
/// The HTTP layer only depends on this trait, so tests can inject a
/// classifier with canned scores.
pub trait ImageClassifier: Send + Sync {
    fn classify(&self, image: &RgbImage) -> Result<Prediction, ClassifierError>;
}

/// A thread-safe image classifier backed by an ONNX vision model.
///
/// # Thread Safety
///
/// ONNX Runtime needs exclusive access to a session while it runs, so the
/// session sits behind a `Mutex` and concurrent predictions are
/// serialized. Everything else is read-only after construction.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use oralscan::Classifier;
///
/// let classifier = Classifier::builder()
///     .with_custom_model(
///         "vit/model.onnx",
///         "vit/preprocessor_config.json",
///         "vit/config.json",
///     )?
///     .build()?;
///
/// let image = oralscan::open_image("backend/test-image.jpeg")?;
/// let prediction = classifier.predict(&image)?;
/// println!("{} ({:.2}%)", prediction.diagnosis, prediction.confidence);
/// # Ok(())
/// # }
/// ```
pub struct Classifier {
    pub model_path: String,
    pub(crate) session: Mutex<Session>,
    pub(crate) preprocessor: Preprocessor,
    pub(crate) labels: LabelMap,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("model_path", &self.model_path)
            .field("preprocessor", &self.preprocessor)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<Classifier>();
    }
};

/// Summary of a loaded classifier
#[derive(Debug, Clone)]
pub struct ClassifierInfo {
    pub model_path: String,
    pub num_labels: usize,
    pub labels: Vec<(usize, String)>,
    pub input_names: Vec<String>,
}

impl ForwardPass for Classifier {
    fn session(&self) -> Option<&Mutex<Session>> {
        Some(&self.session)
    }
}

impl Classifier {
    /// Creates a new ClassifierBuilder for fluent construction
    pub fn builder() -> super::builder::ClassifierBuilder {
        super::builder::ClassifierBuilder::new()
    }

    /// Returns information about the classifier's current state
    pub fn info(&self) -> Result<ClassifierInfo, ClassifierError> {
        let session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::ModelError(format!("Session mutex poisoned: {}", e)))?;
        Ok(ClassifierInfo {
            model_path: self.model_path.clone(),
            num_labels: self.labels.len(),
            labels: self.labels.labels().map(|(i, l)| (i, l.to_string())).collect(),
            input_names: session.inputs.iter().map(|input| input.name.clone()).collect(),
        })
    }

    /// Raw scores for an image, before softmax.
    pub fn logits(&self, image: &RgbImage) -> Result<Vec<f32>, ClassifierError> {
        let input = self.preprocessor.preprocess(image)?;
        self.forward(&input)
    }

    /// Classifies a decoded RGB image
    pub fn predict(&self, image: &RgbImage) -> Result<Prediction, ClassifierError> {
        let logits = self.logits(image)?;
        log::debug!("Raw scores: {:?}", logits);
        Prediction::from_logits(&logits, &self.labels)
    }
}

impl ImageClassifier for Classifier {
    fn classify(&self, image: &RgbImage) -> Result<Prediction, ClassifierError> {
        self.predict(image)
    }
}
