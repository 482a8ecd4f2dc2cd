use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::classifier::ClassifierError;

pub const NOT_AN_IMAGE: &str = "File must be an image";
pub const INTERNAL_ERROR: &str = "Internal Server Error";
pub const MODEL_NOT_LOADED: &str = "Model is not loaded";

/// Error body shared by every failing route
#[derive(Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    /// Multipart body rejected by the extractor, with the status it chose
    #[error("{1}")]
    Upload(StatusCode, String),
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ClassifierError> for ApiError {
    fn from(err: ClassifierError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Upload(err.status(), format!("Invalid upload: {}", err.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail.clone()),
            ApiError::Upload(status, detail) => {
                log::warn!("Upload rejected with {}: {}", status, detail);
                (*status, detail.clone())
            }
            ApiError::ModelUnavailable(reason) => {
                log::error!("Prediction rejected, model not loaded: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, MODEL_NOT_LOADED.to_string())
            }
            ApiError::Internal(reason) => {
                log::error!("Prediction Error: {}", reason);
                (StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR.to_string())
            }
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::{FromRequest, Multipart, Request};
    use axum::http::header::CONTENT_TYPE;

    const BOUNDARY: &str = "oralscan-boundary";

    fn multipart_request(payload_len: usize) -> Request {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"scan.png\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat(b'x').take(payload_len));
        body.extend(format!("\r\n--{BOUNDARY}--\r\n").into_bytes());

        Request::builder()
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    async fn read_all(request: Request) -> Result<(), MultipartError> {
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();
        while let Some(field) = multipart.next_field().await? {
            field.bytes().await?;
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_oversized_upload_keeps_payload_too_large() {
        // Above the extractor's default 2 MiB limit
        let err = read_all(multipart_request(3 * 1024 * 1024)).await.unwrap_err();
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_small_upload_is_read() {
        assert!(read_all(multipart_request(1024)).await.is_ok());
    }

    #[test]
    fn test_error_statuses() {
        let cases = [
            (ApiError::BadRequest(NOT_AN_IMAGE.to_string()), StatusCode::BAD_REQUEST),
            (ApiError::ModelUnavailable("offline".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Internal("decode".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
