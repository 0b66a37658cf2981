use crate::{errors::ServiceError, ApiResponse};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// PDF download with a suggested file name.
pub fn pdf_response(file_name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response()
}

pub fn text_response(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

/// Decodes an image sent as standard base64.
pub fn decode_image(field: &str, encoded: &str) -> Result<Vec<u8>, ServiceError> {
    STANDARD
        .decode(encoded.trim())
        .map_err(|e| ServiceError::ValidationError(format!("{} is not valid base64: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn decodes_padded_base64() {
        assert_eq!(decode_image("image", " AQID ").unwrap(), vec![1, 2, 3]);
        assert_matches!(
            decode_image("image", "not base64!"),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn pdf_response_sets_headers() {
        let response = pdf_response("order-7.pdf", b"%PDF-1.4".to_vec());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"order-7.pdf\""
        );
    }
}
