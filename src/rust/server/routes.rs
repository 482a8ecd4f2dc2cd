use axum::{
    extract::{Multipart, State},
    response::Json,
};
use axum::body::Bytes;
use serde::{Deserialize, Serialize};

use super::error::{ApiError, NOT_AN_IMAGE};
use super::AppState;
use crate::classifier::Prediction;
use crate::image_io::decode_image;

pub const LIVENESS_MESSAGE: &str = "Oral Cancer Detection API is running";
const UPLOAD_FIELD: &str = "file";

#[derive(Serialize, Deserialize)]
pub struct Status {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct PredictionResponse {
    pub result: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_label: Option<String>,
}

impl PredictionResponse {
    pub fn new(prediction: Prediction, expose_raw_label: bool) -> Self {
        Self {
            result: prediction.result(),
            confidence: prediction.confidence,
            raw_label: expose_raw_label.then_some(prediction.raw_label),
        }
    }
}

pub async fn home() -> Json<Status> {
    Json(Status {
        message: LIVENESS_MESSAGE.into(),
    })
}

/// Reads the `file` field, refusing anything not declared as `image/*`.
async fn read_upload(multipart: &mut Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let is_image = field
            .content_type()
            .map(|content_type| content_type.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(ApiError::BadRequest(NOT_AN_IMAGE.into()));
        }
        return Ok(field.bytes().await?);
    }
    Err(ApiError::BadRequest("No file uploaded".into()))
}

pub async fn predict(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PredictionResponse>, ApiError> {
    let upload = read_upload(&mut multipart).await?;
    let classifier = state.classifier()?;
    log::debug!("Received upload of {} bytes", upload.len());

    let prediction = tokio::task::spawn_blocking(move || {
        let image = decode_image(&upload)?;
        classifier.classify(&image)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("inference task failed: {}", e)))??;

    log::info!(
        "Prediction: {} ({:.2}%, {})",
        prediction.diagnosis,
        prediction.confidence,
        prediction.raw_label
    );
    Ok(Json(PredictionResponse::new(prediction, state.expose_raw_label)))
}
