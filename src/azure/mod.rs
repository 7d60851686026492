//! Azure Resource Manager client backing both collaborator traits.

mod credential;
pub mod models;

pub use credential::Credential;

use anyhow::{Context, Result, bail};
use futures::future::try_join_all;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use crate::cloud::{Image, ProvisioningHandle, ProvisioningRequest, Sku};
use crate::config::{ImageOffer, Settings};
use crate::provider::{CatalogClient, CatalogError, GatewayError, ProvisioningGateway};
use models::{ArmErrorBody, ArmPage, ImageSkuEntry, ResourceSku, VirtualMachine};

const COMPUTE_API_VERSION: &str = "2024-03-01";
const RESOURCE_SKUS_API_VERSION: &str = "2021-07-01";
/// Lets the VM PUT create its NIC inline instead of a separate network call.
const NETWORK_API_VERSION: &str = "2020-11-01";
/// Image listings name no concrete version; the create call resolves this.
const LATEST_IMAGE_VERSION: &str = "latest";
/// ARM error code for a missing resource inside an existing resource group.
const VM_NOT_FOUND: &str = "ResourceNotFound";

pub struct AzureCompute {
    http: Client,
    credential: Credential,
    endpoint: Url,
    subscription_id: String,
    subnet_id: String,
    image_offers: Vec<ImageOffer>,
}

impl AzureCompute {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .user_agent(concat!("azure-vm-provisioner/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;

        let credential = Credential::from_settings(
            &settings.credentials,
            &settings.authority_host,
            &settings.management_endpoint,
        );

        Ok(Self::new(
            http,
            credential,
            settings.management_endpoint.clone(),
            settings.subscription_id.clone(),
            settings.subnet_id.clone(),
            settings.catalog.image_offers().to_vec(),
        ))
    }

    pub fn new(
        http: Client,
        credential: Credential,
        endpoint: Url,
        subscription_id: String,
        subnet_id: String,
        image_offers: Vec<ImageOffer>,
    ) -> Self {
        Self {
            http,
            credential,
            endpoint,
            subscription_id,
            subnet_id,
            image_offers,
        }
    }

    /// `{endpoint}/subscriptions/{id}/{path}?api-version={version}`
    fn url(&self, path: &str, api_version: &str) -> Result<Url> {
        let mut url = self
            .endpoint
            .join(&format!("subscriptions/{}/{}", self.subscription_id, path))
            .with_context(|| format!("build management url for {path}"))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    fn vm_url(&self, resource_group: &str, name: &str) -> Result<Url> {
        let path = format!(
            "resourceGroups/{resource_group}/providers/Microsoft.Compute/virtualMachines/{name}"
        );
        self.url(&path, COMPUTE_API_VERSION)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let token = self
            .credential
            .bearer(&self.http)
            .await
            .context("acquire management token")?;
        Ok(request.bearer_auth(token).send().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let res = self
            .send(self.http.get(url.clone()))
            .await
            .with_context(|| format!("GET {url}"))?;
        read_json(res, &url).await
    }

    async fn resource_skus(&self, location: &str) -> Result<Vec<Sku>> {
        let mut url = self.url("providers/Microsoft.Compute/skus", RESOURCE_SKUS_API_VERSION)?;
        url.query_pairs_mut()
            .append_pair("$filter", &format!("location eq '{location}'"));

        let mut skus = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let page: ArmPage<ResourceSku> = self.get_json(page_url).await?;
            skus.extend(
                page.value
                    .into_iter()
                    .filter(ResourceSku::is_virtual_machine)
                    .map(ResourceSku::into_sku),
            );
            next = page
                .next_link
                .map(|link| Url::parse(&link).with_context(|| format!("parse nextLink {link}")))
                .transpose()?;
        }

        Ok(skus)
    }

    async fn offer_images(&self, location: &str, offer: &ImageOffer) -> Result<Vec<Image>> {
        let path = format!(
            "providers/Microsoft.Compute/locations/{location}/publishers/{}\
             /artifacttypes/vmimage/offers/{}/skus",
            offer.publisher(),
            offer.offer()
        );
        let url = self.url(&path, COMPUTE_API_VERSION)?;

        let res = self
            .send(self.http.get(url.clone()))
            .await
            .with_context(|| format!("GET {url}"))?;

        // Offers are not published in every location; skip rather than fail
        if res.status() == StatusCode::NOT_FOUND {
            tracing::warn!(
                location,
                publisher = offer.publisher(),
                offer = offer.offer(),
                "image offer not available in location"
            );
            return Ok(Vec::new());
        }

        let entries: Vec<ImageSkuEntry> = read_json(res, &url).await?;
        Ok(entries
            .into_iter()
            .map(|e| Image::new(offer.publisher(), offer.offer(), e.name, LATEST_IMAGE_VERSION))
            .collect())
    }

    async fn find_vm(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ProvisioningHandle>> {
        let url = self.vm_url(resource_group, name)?;
        let res = self
            .send(self.http.get(url.clone()))
            .await
            .with_context(|| format!("GET {url}"))?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            // A missing resource group also answers 404; only the VM's own
            // absence means the name is free.
            let body = res.text().await.unwrap_or_default();
            if body.trim().is_empty() {
                return Ok(None);
            }
            return match serde_json::from_str::<ArmErrorBody>(&body) {
                Ok(err) if err.error.code == VM_NOT_FOUND => Ok(None),
                Ok(err) => bail!(
                    "HTTP {} for {}: {}: {}",
                    status,
                    url,
                    err.error.code,
                    err.error.message
                ),
                Err(_) => bail!("HTTP {} for {}", status, url),
            };
        }

        let vm: VirtualMachine = read_json(res, &url).await?;
        Ok(Some(vm.into_handle("", "")))
    }

    async fn put_vm(
        &self,
        resource_group: &str,
        request: &ProvisioningRequest,
        image: &Image,
    ) -> Result<ProvisioningHandle> {
        let url = self.vm_url(resource_group, request.name())?;
        let body = self.create_body(request, image);
        let res = self
            .send(self.http.put(url.clone()).json(&body))
            .await
            .with_context(|| format!("PUT {url}"))?;

        let vm: VirtualMachine = read_json(res, &url).await?;
        Ok(vm.into_handle(request.size(), request.image()))
    }

    fn create_body(&self, request: &ProvisioningRequest, image: &Image) -> serde_json::Value {
        let name = request.name();
        json!({
            "location": request.location(),
            "properties": {
                "hardwareProfile": { "vmSize": request.size() },
                "storageProfile": {
                    "imageReference": {
                        "publisher": image.publisher(),
                        "offer": image.offer(),
                        "sku": image.sku(),
                        "version": image.version(),
                    },
                    "osDisk": { "createOption": "FromImage", "deleteOption": "Delete" },
                },
                "osProfile": {
                    "computerName": name,
                    "adminUsername": request.admin_username(),
                    "adminPassword": request.admin_password().expose(),
                },
                "networkProfile": {
                    "networkApiVersion": NETWORK_API_VERSION,
                    "networkInterfaceConfigurations": [{
                        "name": format!("{name}-nic"),
                        "properties": {
                            "primary": true,
                            "deleteOption": "Delete",
                            "ipConfigurations": [{
                                "name": format!("{name}-ipconfig"),
                                "properties": { "subnet": { "id": self.subnet_id } },
                            }],
                        },
                    }],
                },
            },
        })
    }
}

/// Fail on any non-2xx, surfacing the ARM error code when the body has one.
async fn read_json<T: DeserializeOwned>(res: Response, url: &Url) -> Result<T> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        match serde_json::from_str::<ArmErrorBody>(&body) {
            Ok(err) => bail!(
                "HTTP {} for {}: {}: {}",
                status,
                url,
                err.error.code,
                err.error.message
            ),
            Err(_) => bail!("HTTP {} for {}", status, url),
        }
    }

    res.json::<T>()
        .await
        .with_context(|| format!("parse JSON from {url}"))
}

#[async_trait::async_trait]
impl CatalogClient for AzureCompute {
    async fn list_sizes(&self, location: &str) -> Result<Vec<Sku>, CatalogError> {
        self.resource_skus(location)
            .await
            .with_context(|| format!("list VM sizes for location='{location}'"))
            .map_err(CatalogError::Unavailable)
    }

    async fn list_images(&self, location: &str) -> Result<Vec<Image>, CatalogError> {
        let per_offer = try_join_all(
            self.image_offers
                .iter()
                .map(|offer| self.offer_images(location, offer)),
        )
        .await
        .with_context(|| format!("list images for location='{location}'"))
        .map_err(CatalogError::Unavailable)?;

        Ok(per_offer.into_iter().flatten().collect())
    }
}

#[async_trait::async_trait]
impl ProvisioningGateway for AzureCompute {
    async fn lookup_vm(
        &self,
        resource_group: &str,
        name: &str,
    ) -> Result<Option<ProvisioningHandle>, GatewayError> {
        self.find_vm(resource_group, name)
            .await
            .with_context(|| format!("look up VM '{name}' in resource group '{resource_group}'"))
            .map_err(GatewayError::Failed)
    }

    async fn create_vm(
        &self,
        resource_group: &str,
        request: &ProvisioningRequest,
        image: &Image,
    ) -> Result<ProvisioningHandle, GatewayError> {
        self.put_vm(resource_group, request, image)
            .await
            .with_context(|| {
                format!(
                    "create VM '{}' in resource group '{resource_group}'",
                    request.name()
                )
            })
            .map_err(GatewayError::Failed)
    }
}
