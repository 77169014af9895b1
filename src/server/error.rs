//! Error types for the server

use crate::error::{format_field_list, format_rejections, PricerError, RowRejection};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid JSON body")]
    InvalidBody,

    #[error("Missing required fields: {}", format_field_list(.0))]
    MissingFields(Vec<String>),

    #[error("Invalid input rows: {}", format_rejections(.0))]
    InvalidRows(Vec<RowRejection>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Model prediction error: {0}")]
    Prediction(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PricerError> for ServerError {
    fn from(err: PricerError) -> Self {
        match err {
            PricerError::InvalidPayload => ServerError::InvalidBody,
            PricerError::MissingColumns(fields) => ServerError::MissingFields(fields),
            PricerError::InvalidRows(rows) => ServerError::InvalidRows(rows),
            PricerError::PredictionError(msg) => ServerError::Prediction(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let (status, body) = match &self {
            ServerError::InvalidBody => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            ServerError::MissingFields(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": message, "missing": fields }),
            ),
            ServerError::InvalidRows(rows) => {
                let rows: Vec<_> = rows
                    .iter()
                    .map(|r| json!({ "row": r.row, "field": r.field, "reason": r.reason.to_string() }))
                    .collect();
                (StatusCode::BAD_REQUEST, json!({ "error": message, "rows": rows }))
            }
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            ServerError::MethodNotAllowed => {
                (StatusCode::METHOD_NOT_ALLOWED, json!({ "error": message }))
            }
            ServerError::Prediction(detail) => {
                tracing::error!(detail = %detail, "Prediction failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": message }))
            }
            ServerError::Internal(detail) => {
                tracing::error!(detail = %detail, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "An internal error occurred" }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RejectReason;

    #[test]
    fn test_messages_match_pricer_errors() {
        let fields = vec!["age".to_string(), "mileage".to_string()];
        assert_eq!(
            ServerError::MissingFields(fields.clone()).to_string(),
            PricerError::MissingColumns(fields).to_string()
        );
        assert_eq!(ServerError::InvalidBody.to_string(), "Invalid JSON body");
        assert_eq!(
            ServerError::Prediction("boom".to_string()).to_string(),
            "Model prediction error: boom"
        );
    }

    #[test]
    fn test_status_codes() {
        let rows = vec![RowRejection {
            row: 0,
            field: "mileage",
            reason: RejectReason::Missing,
        }];
        let cases = [
            (ServerError::from(PricerError::InvalidPayload), StatusCode::BAD_REQUEST),
            (ServerError::from(PricerError::MissingColumns(vec![])), StatusCode::BAD_REQUEST),
            (ServerError::from(PricerError::InvalidRows(rows)), StatusCode::BAD_REQUEST),
            (
                ServerError::from(PricerError::PredictionError("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (ServerError::from(PricerError::ModelNotFitted), StatusCode::INTERNAL_SERVER_ERROR),
            (ServerError::NotFound("/x".into()), StatusCode::NOT_FOUND),
            (ServerError::MethodNotAllowed, StatusCode::METHOD_NOT_ALLOWED),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
