//! In-memory stand-ins for the provider, plus request helpers.

#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;

use azure_vm_provisioner::api::build_router;
use azure_vm_provisioner::cloud::{Image, ProvisioningHandle, ProvisioningRequest, Sku, VmStatus};
use azure_vm_provisioner::config::KnownLocations;
use azure_vm_provisioner::provider::{
    CatalogClient, CatalogError, GatewayError, ProvisioningGateway,
};
use azure_vm_provisioner::service::{Provisioner, ProvisionerOptions};

pub const RESOURCE_GROUP: &str = "rg-test";

#[derive(Default)]
pub struct FakeCatalog {
    pub sizes: Vec<Sku>,
    pub images: Vec<Image>,
    pub delay: Option<Duration>,
    pub fail: bool,
}

impl FakeCatalog {
    pub fn eastus() -> Self {
        Self {
            sizes: vec![
                Sku::new("Standard_B1s", "Standard", "standardBSFamily", "B1s", 0),
                Sku::new("Standard_D2s_v3", "Standard", "standardDSv3Family", "D2s_v3", 0),
            ],
            images: vec![
                Image::new("Canonical", "0001-com-ubuntu-server-focal", "ubuntu-20.04", "latest"),
                Image::new("Debian", "debian-12", "12-gen2", "latest"),
            ],
            ..Self::default()
        }
    }

    async fn answer<T: Clone>(&self, items: &[T]) -> Result<Vec<T>, CatalogError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(CatalogError::Unavailable(anyhow::anyhow!(
                "AADSTS700016: application 0000-1111 not found in tenant"
            )));
        }
        Ok(items.to_vec())
    }
}

#[async_trait::async_trait]
impl CatalogClient for FakeCatalog {
    async fn list_sizes(&self, _location: &str) -> Result<Vec<Sku>, CatalogError> {
        self.answer(&self.sizes).await
    }

    async fn list_images(&self, _location: &str) -> Result<Vec<Image>, CatalogError> {
        self.answer(&self.images).await
    }
}

/// Remembers what it created so a later lookup finds it.
#[derive(Default)]
pub struct FakeGateway {
    pub vms: Mutex<HashMap<String, ProvisioningHandle>>,
    pub create_delay: Option<Duration>,
    pub fail_lookup: bool,
    pub fail_create: bool,
    pub creates: AtomicUsize,
    pub last_image: Mutex<Option<Image>>,
}

impl FakeGateway {
    pub fn with_existing(name: &str) -> Self {
        let gateway = Self::default();
        gateway.vms.lock().insert(
            name.to_string(),
            ProvisioningHandle {
                id: format!("/resourceGroups/{RESOURCE_GROUP}/virtualMachines/{name}"),
                name: name.to_string(),
                size: "Standard_B1s".to_string(),
                image: "ubuntu-20.04".to_string(),
                status: VmStatus::Succeeded,
            },
        );
        gateway
    }

    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ProvisioningGateway for FakeGateway {
    async fn lookup_vm(
        &self,
        _resource_group: &str,
        name: &str,
    ) -> Result<Option<ProvisioningHandle>, GatewayError> {
        if self.fail_lookup {
            return Err(GatewayError::Failed(anyhow::anyhow!(
                "AuthorizationFailed: client 0000-1111 has no read access"
            )));
        }
        Ok(self.vms.lock().get(name).cloned())
    }

    async fn create_vm(
        &self,
        resource_group: &str,
        request: &ProvisioningRequest,
        image: &Image,
    ) -> Result<ProvisioningHandle, GatewayError> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_create {
            return Err(GatewayError::Failed(anyhow::anyhow!(
                "QuotaExceeded: Operation could not be completed as it results in exceeding approved cores quota"
            )));
        }

        *self.last_image.lock() = Some(image.clone());
        let handle = ProvisioningHandle {
            id: format!("/resourceGroups/{resource_group}/virtualMachines/{}", request.name()),
            name: request.name().to_string(),
            size: request.size().to_string(),
            image: request.image().to_string(),
            status: VmStatus::Provisioning,
        };
        self.vms.lock().insert(request.name().to_string(), handle.clone());
        Ok(handle)
    }
}

pub fn options(deadline: Duration) -> ProvisionerOptions {
    ProvisionerOptions {
        resource_group: RESOURCE_GROUP.to_string(),
        default_location: "eastus".to_string(),
        locations: KnownLocations::from_iter(["eastus", "westeurope"]),
        deadline,
    }
}

pub fn router(catalog: FakeCatalog, gateway: Arc<FakeGateway>) -> Router {
    router_with_deadline(catalog, gateway, Duration::from_secs(5))
}

pub fn router_with_deadline(
    catalog: FakeCatalog,
    gateway: Arc<FakeGateway>,
    deadline: Duration,
) -> Router {
    let provisioner = Provisioner::new(Arc::new(catalog), gateway, options(deadline));
    build_router(Arc::new(provisioner))
}

pub fn valid_payload() -> Value {
    serde_json::json!({
        "name": "my-vm",
        "size": "Standard_B1s",
        "image": "ubuntu-20.04",
        "adminUsername": "x",
        "adminPassword": "y",
        "location": "eastus",
    })
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> (StatusCode, Value) {
    post_raw(app, uri, body.to_string()).await
}

pub async fn post_raw(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}
