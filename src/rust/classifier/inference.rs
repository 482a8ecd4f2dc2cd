use std::sync::Mutex;

use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;

use super::error::ClassifierError;

/// Runs the ONNX classifier on preprocessed pixel tensors.
///
/// The model is expected to:
/// - Accept one input of shape [batch_size=1, 3, height, width] (`pixel_values`)
/// - Output raw scores of shape [batch_size=1, num_labels] as its first output
pub(crate) trait ForwardPass {
    /// Returns the initialized ONNX session if available
    fn session(&self) -> Option<&Mutex<Session>>;

    /// Executes the model and returns the raw score vector of the single
    /// batch entry.
    ///
    /// # Errors
    /// - `ModelError` if the session is not initialized
    /// - `PredictionError` if tensor creation, execution or extraction fails
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        let session = self.session()
            .ok_or_else(|| ClassifierError::ModelError("Session not initialized".into()))?;
        let mut session = session
            .lock()
            .map_err(|e| ClassifierError::PredictionError(format!("Session mutex poisoned: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| ClassifierError::ModelError("Model has no outputs".into()))?;

        let owned_buffer;
        let input_view = if input.is_standard_layout() {
            input.view()
        } else {
            owned_buffer = input.as_standard_layout().to_owned();
            owned_buffer.view()
        };

        let tensor = TensorRef::from_array_view(input_view)
            .map_err(|e| ClassifierError::PredictionError(format!("Failed to create input tensor: {}", e)))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| ClassifierError::PredictionError(format!("Failed to run model: {}", e)))?;

        let (shape, data) = outputs[output_name.as_str()]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::PredictionError(format!("Failed to extract output tensor: {}", e)))?;

        if shape.len() != 2 || shape[0] != 1 {
            return Err(ClassifierError::PredictionError(format!(
                "Unexpected output shape {:?}, expected [1, num_labels]",
                shape.to_vec()
            )));
        }

        Ok(data.to_vec())
    }
}
