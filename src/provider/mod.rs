//! Seams to the cloud provider. The service only ever talks to these traits;
//! [`crate::azure::AzureCompute`] is the production implementation and tests
//! plug in in-memory doubles.

use std::time::Duration;

use crate::cloud::{Image, ProvisioningHandle, ProvisioningRequest, Sku};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog request timed out after {0:?}")]
    Timeout(Duration),
    #[error("catalog unavailable: {0:#}")]
    Unavailable(#[source] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("provisioning gateway timed out after {0:?}")]
    Timeout(Duration),
    #[error("provisioning gateway failed: {0:#}")]
    Failed(#[source] anyhow::Error),
}

/// Read-through listing of what a location offers.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn list_sizes(&self, location: &str) -> Result<Vec<Sku>, CatalogError>;

    async fn list_images(&self, location: &str) -> Result<Vec<Image>, CatalogError>;
}

/// Looks up and creates virtual machines.
#[async_trait::async_trait]
pub trait ProvisioningGateway: Send + Sync {
    /// `Ok(None)` means no VM by that name exists in the resource group.
    async fn lookup_vm(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ProvisioningHandle>, GatewayError>;

    /// Issue the create call. The returned status is a snapshot; nothing
    /// waits for provisioning to finish.
    async fn create_vm(
        &self,
        resource_group: &str,
        request: &ProvisioningRequest,
        image: &Image,
    ) -> Result<ProvisioningHandle, GatewayError>;
}
