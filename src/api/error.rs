use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::service::ProvisionError;
use crate::validation::RejectionCode;

const CATALOG_UNAVAILABLE: &str = "catalog service unavailable";
const GATEWAY_UNAVAILABLE: &str = "provisioning service unavailable";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body could not be read as the endpoint's JSON shape.
    #[error("malformed request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

/// Body of every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<RejectionCode>,
}

impl ErrorBody {
    fn message(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            field: None,
            code: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Malformed(reason) => (StatusCode::BAD_REQUEST, ErrorBody::message(reason)),
            ApiError::Provision(ProvisionError::Rejected(rejection)) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: rejection.message().to_string(),
                    field: Some(rejection.field().to_string()),
                    code: Some(rejection.code()),
                },
            ),
            ApiError::Provision(err @ ProvisionError::NameUnavailable(_)) => {
                (StatusCode::CONFLICT, ErrorBody::message(err.to_string()))
            }
            // Provider detail goes to the log only, never into the response
            ApiError::Provision(ProvisionError::Catalog(err)) => {
                tracing::error!(error = %err, "catalog call failed");
                (StatusCode::BAD_GATEWAY, ErrorBody::message(CATALOG_UNAVAILABLE))
            }
            ApiError::Provision(ProvisionError::Gateway(err)) => {
                tracing::error!(error = %err, "provisioning gateway call failed");
                (StatusCode::BAD_GATEWAY, ErrorBody::message(GATEWAY_UNAVAILABLE))
            }
        };

        (status, Json(body)).into_response()
    }
}
