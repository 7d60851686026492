use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::ApiError;
use crate::cloud::{Image, ProvisioningHandle, Sku};
use crate::service::Provisioner;
use crate::validation::ValidationResult;

type AppState = State<Arc<Provisioner>>;

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    location: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn list_skus(
    State(provisioner): AppState,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> Result<Json<Vec<Sku>>, ApiError> {
    let query = catalog_query(query)?;
    let sizes = provisioner.list_sizes(query.location.as_deref()).await?;
    Ok(Json(sizes))
}

pub async fn list_images(
    State(provisioner): AppState,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> Result<Json<Vec<Image>>, ApiError> {
    let query = catalog_query(query)?;
    let images = provisioner.list_images(query.location.as_deref()).await?;
    Ok(Json(images))
}

pub async fn create_vm(
    State(provisioner): AppState,
    body: Bytes,
) -> Result<(StatusCode, Json<ProvisioningHandle>), ApiError> {
    let payload = json_object(&body)?;
    let handle = provisioner.provision(&payload).await?;
    Ok((StatusCode::CREATED, Json(handle)))
}

pub async fn validate_name(
    State(provisioner): AppState,
    body: Bytes,
) -> Result<Json<ValidationResult>, ApiError> {
    let payload = json_object(&body)?;
    let name = match payload.get("name") {
        Some(Value::String(name)) => name,
        Some(_) => {
            return Err(ApiError::Malformed(
                "field 'name' must be a string".to_string(),
            ));
        }
        None => return Err(ApiError::Malformed("field 'name' is required".to_string())),
    };

    let result = provisioner.validate_name(name).await?;
    Ok(Json(result))
}

fn catalog_query(
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> Result<CatalogQuery, ApiError> {
    query
        .map(|Query(query)| query)
        .map_err(|rejection| ApiError::Malformed(rejection.body_text()))
}

/// Bodies are parsed by hand so a bad body gets the same `{error}` shape as
/// every other failure instead of the extractor's plain-text rejection.
fn json_object(body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::Malformed(
            "request body must be a JSON object".to_string(),
        )),
        Err(err) => Err(ApiError::Malformed(format!(
            "request body is not valid JSON: {err}"
        ))),
    }
}
