//! Request-scoped orchestration between the HTTP layer and the provider.
//!
//! A create request flows through normalization, a catalog membership check
//! for the requested size and image, a per-name claim, the existence lookup
//! and finally the create call. Every provider call runs under the configured
//! deadline; when it expires the in-flight future is dropped, which cancels
//! the underlying HTTP request.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cloud::{Image, ProvisioningHandle, Sku};
use crate::config::KnownLocations;
use crate::provider::{CatalogClient, CatalogError, GatewayError, ProvisioningGateway};
use crate::validation::{
    NameCheck, Rejection, RejectionCode, ValidationResult, check_availability, normalize,
};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("virtual machine name '{0}' is already in use")]
    NameUnavailable(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone)]
pub struct ProvisionerOptions {
    /// Resource group VMs are created in and names are checked against.
    pub resource_group: String,
    /// Location for catalog queries that do not name one.
    pub default_location: String,
    pub locations: KnownLocations,
    /// Upper bound on each provider call.
    pub deadline: Duration,
}

pub struct Provisioner {
    catalog: Arc<dyn CatalogClient>,
    gateway: Arc<dyn ProvisioningGateway>,
    options: ProvisionerOptions,
    claims: NameClaims,
}

impl Provisioner {
    pub fn new(
        catalog: Arc<dyn CatalogClient>,
        gateway: Arc<dyn ProvisioningGateway>,
        options: ProvisionerOptions,
    ) -> Self {
        Self {
            catalog,
            gateway,
            options,
            claims: NameClaims::default(),
        }
    }

    /// Resolve an optional location override against the recognized set.
    fn location<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str, Rejection> {
        match requested {
            None => Ok(self.options.default_location.as_str()),
            Some(location) if self.options.locations.contains(location) => Ok(location),
            Some(location) => Err(Rejection::unknown_location(location)),
        }
    }

    pub async fn list_sizes(&self, location: Option<&str>) -> Result<Vec<Sku>, ProvisionError> {
        let location = self.location(location)?;
        let sizes = self.catalog_call(self.catalog.list_sizes(location)).await?;
        tracing::debug!(location, count = sizes.len(), "listed VM sizes");
        Ok(sizes)
    }

    pub async fn list_images(&self, location: Option<&str>) -> Result<Vec<Image>, ProvisionError> {
        let location = self.location(location)?;
        let images = self.catalog_call(self.catalog.list_images(location)).await?;
        tracing::debug!(location, count = images.len(), "listed images");
        Ok(images)
    }

    /// Syntax check, then a live lookup in the configured resource group.
    pub async fn validate_name(&self, name: &str) -> Result<ValidationResult, ProvisionError> {
        let check = self
            .gateway_call(check_availability(
                self.gateway.as_ref(),
                &self.options.resource_group,
                name,
            ))
            .await?;
        Ok(ValidationResult::from(&check))
    }

    pub async fn provision(
        &self,
        payload: &Map<String, Value>,
    ) -> Result<ProvisioningHandle, ProvisionError> {
        let request = normalize(payload, &self.options.locations)?;
        let location = request.location();

        let (sizes, images) = self
            .catalog_call(futures::future::try_join(
                self.catalog.list_sizes(location),
                self.catalog.list_images(location),
            ))
            .await?;

        if !sizes.iter().any(|s| s.name() == request.size()) {
            return Err(Rejection::new(
                RejectionCode::UnknownSize,
                "size",
                format!("size '{}' is not offered in '{location}'", request.size()),
            )
            .into());
        }

        let image = select_image(images, request.image(), location)?;

        let resource_group = self.options.resource_group.as_str();

        // Held until the create call returns so a concurrent request for the
        // same name cannot slip between our lookup and our create.
        let _claim = self
            .claims
            .claim(resource_group, request.name())
            .ok_or_else(|| ProvisionError::NameUnavailable(request.name().to_string()))?;

        let check = self
            .gateway_call(check_availability(
                self.gateway.as_ref(),
                resource_group,
                request.name(),
            ))
            .await?;
        match check {
            NameCheck::Valid => {}
            NameCheck::Taken => {
                return Err(ProvisionError::NameUnavailable(
                    request.name().to_string(),
                ));
            }
            NameCheck::Invalid(violation) => {
                let rejection =
                    Rejection::new(RejectionCode::InvalidName, "name", violation.to_string());
                return Err(rejection.into());
            }
        }

        let handle = self
            .gateway_call(self.gateway.create_vm(resource_group, &request, &image))
            .await?;

        tracing::info!(
            name = %handle.name,
            id = %handle.id,
            size = %handle.size,
            image = %image,
            status = ?handle.status,
            "create request accepted"
        );
        Ok(handle)
    }

    async fn catalog_call<T>(
        &self,
        call: impl Future<Output = Result<T, CatalogError>>,
    ) -> Result<T, CatalogError> {
        let deadline = self.options.deadline;
        tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| CatalogError::Timeout(deadline))?
    }

    async fn gateway_call<T>(
        &self,
        call: impl Future<Output = Result<T, GatewayError>>,
    ) -> Result<T, GatewayError> {
        let deadline = self.options.deadline;
        tokio::time::timeout(deadline, call)
            .await
            .map_err(|_| GatewayError::Timeout(deadline))?
    }
}

/// The one listed image the client's identifier names. A bare SKU published
/// under several offers is refused so the caller has to give the URN.
fn select_image(images: Vec<Image>, identifier: &str, location: &str) -> Result<Image, Rejection> {
    let mut matches = images.into_iter().filter(|i| i.is_identified_by(identifier));
    let Some(image) = matches.next() else {
        return Err(Rejection::new(
            RejectionCode::UnknownImage,
            "image",
            format!("image '{identifier}' is not offered in '{location}'"),
        ));
    };
    if let Some(other) = matches.next() {
        return Err(Rejection::new(
            RejectionCode::UnknownImage,
            "image",
            format!(
                "image '{identifier}' matches both '{image}' and '{other}'; use the full URN"
            ),
        ));
    }
    Ok(image)
}

/// Names with a create in flight, keyed by resource group and lower-cased
/// name (the provider treats VM names case-insensitively).
#[derive(Debug, Default, Clone)]
pub struct NameClaims {
    held: Arc<Mutex<HashSet<String>>>,
}

impl NameClaims {
    /// `None` when another request already holds the name.
    pub fn claim(&self, resource_group: &str, name: &str) -> Option<NameClaim> {
        let key = claim_key(resource_group, name);
        if !self.held.lock().insert(key.clone()) {
            return None;
        }
        Some(NameClaim {
            key,
            held: Arc::clone(&self.held),
        })
    }

    #[cfg(test)]
    fn is_held(&self, resource_group: &str, name: &str) -> bool {
        self.held.lock().contains(&claim_key(resource_group, name))
    }
}

fn claim_key(resource_group: &str, name: &str) -> String {
    format!(
        "{}/{}",
        resource_group.to_ascii_lowercase(),
        name.to_ascii_lowercase()
    )
}

/// Released on drop, whichever way the create path exits.
#[derive(Debug)]
pub struct NameClaim {
    key: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl Drop for NameClaim {
    fn drop(&mut self) {
        self.held.lock().remove(&self.key);
    }
}
