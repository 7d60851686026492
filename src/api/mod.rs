//! HTTP surface.
//!
//! | Method & path             | Success                    | Failure                     |
//! |---------------------------|----------------------------|-----------------------------|
//! | `GET /vms/skus`           | 200 `[Sku]`                | 400, 502 `{error}`          |
//! | `GET /vms/images`         | 200 `[Image]`              | 400, 502 `{error}`          |
//! | `POST /vms`               | 201 `ProvisioningHandle`   | 400 `{error, field, code}`, 409, 502 |
//! | `POST /vms/validate-name` | 200 `{valid, message}`     | 400, 502 `{error}`          |
//! | `GET /health`             | 200 `{status, version}`    |                             |

mod error;
mod handlers;

pub use error::{ApiError, ErrorBody};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::Provisioner;

pub fn build_router(provisioner: Arc<Provisioner>) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/vms", post(handlers::create_vm))
        .route("/vms/skus", get(handlers::list_skus))
        .route("/vms/images", get(handlers::list_images))
        .route("/vms/validate-name", post(handlers::validate_name))
        .layer(TraceLayer::new_for_http())
        .with_state(provisioner)
}
