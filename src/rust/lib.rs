//! Oral cancer image classification with a pretrained ONNX vision transformer.
//!
//! The crate loads a classifier artifact (ONNX graph, preprocessor config and
//! label table) from a model hub or a local directory, turns images into the
//! tensor the model expects and maps its raw scores to a diagnosis with a
//! softmax confidence. The same pipeline backs the `diagnose` CLI and the
//! HTTP service in [`server`].
//!
//! # Basic Usage
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use oralscan::{load_classifier, BuiltinModel, ModelManager, RuntimeConfig};
//!
//! let manager = ModelManager::new_default()?;
//! let info = BuiltinModel::OralCancerVit.get_model_info();
//! let classifier = load_classifier(&manager, &info, RuntimeConfig::default(), false).await?;
//!
//! let image = oralscan::open_image("backend/test-image.jpeg")?;
//! let prediction = classifier.predict(&image)?;
//! println!("{}: {:.2}%", prediction.diagnosis, prediction.confidence);
//! # Ok(())
//! # }
//! ```
//!
//! # Serving
//!
//! ```no_run
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! use std::sync::Arc;
//! use oralscan::server::{AppState, HttpServer, ServerConfig};
//! # let classifier = oralscan::Classifier::builder().with_model_dir("vit", "model.onnx")?.build()?;
//!
//! let state = AppState::ready(Arc::new(classifier));
//! let server = HttpServer::new(state, &ServerConfig::default()).await?;
//! server.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! # Ok(())
//! # }
//! ```

pub mod classifier;
pub mod cli;
pub mod image_io;
pub mod model_manager;
pub mod models;
pub mod report;
mod runtime;
pub mod server;

pub use classifier::{
    load_classifier, Classifier, ClassifierBuilder, ClassifierError, ClassifierInfo, Diagnosis,
    ImageClassifier, LabelMap, Prediction, Preprocessor, PreprocessorConfig, ONNX_EXPORT_HINT,
};
pub use image_io::{decode_image, open_image};
pub use model_manager::{ModelError, ModelManager};
pub use models::{ArtifactKind, BuiltinModel, ModelInfo};
pub use runtime::{create_session_builder, RuntimeConfig};

pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
