//! Wire shapes of the Azure Resource Manager responses we read. Only the
//! fields this service uses are modelled; everything else is ignored.

use serde::Deserialize;

use crate::cloud::{Image, ProvisioningHandle, Sku, VmStatus};

/// One page of an ARM collection.
#[derive(Debug, Deserialize)]
pub struct ArmPage<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(rename = "nextLink", default)]
    pub next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ArmErrorBody {
    pub error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ArmErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Entry of `Microsoft.Compute/skus`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSku {
    #[serde(default)]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub capacity: Option<SkuCapacity>,
}

#[derive(Debug, Deserialize)]
pub struct SkuCapacity {
    #[serde(default)]
    pub default: Option<u32>,
}

impl ResourceSku {
    pub fn is_virtual_machine(&self) -> bool {
        self.resource_type.eq_ignore_ascii_case("virtualMachines")
    }

    pub fn into_sku(self) -> Sku {
        let capacity = self.capacity.and_then(|c| c.default).unwrap_or(0);
        Sku::new(
            self.name,
            self.tier.unwrap_or_default(),
            self.family.unwrap_or_default(),
            self.size.unwrap_or_default(),
            capacity,
        )
    }
}

/// Entry of `.../offers/{offer}/skus`.
#[derive(Debug, Deserialize)]
pub struct ImageSkuEntry {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct VirtualMachine {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Option<VirtualMachineProperties>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub hardware_profile: Option<HardwareProfile>,
    #[serde(default)]
    pub storage_profile: Option<StorageProfile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    #[serde(default)]
    pub vm_size: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    #[serde(default)]
    pub image_reference: Option<ImageReference>,
}

#[derive(Debug, Deserialize)]
pub struct ImageReference {
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub offer: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub version: String,
}

impl VirtualMachine {
    /// Handle for a VM read back from the provider. Size and image fall back
    /// to the given values when the response leaves them out, which the
    /// create response may do.
    pub fn into_handle(self, size_hint: &str, image_hint: &str) -> ProvisioningHandle {
        let properties = self.properties.unwrap_or_default();
        let status = VmStatus::from_provisioning_state(properties.provisioning_state.as_deref());
        let size = properties
            .hardware_profile
            .and_then(|h| h.vm_size)
            .unwrap_or_else(|| size_hint.to_string());
        let image = properties
            .storage_profile
            .and_then(|s| s.image_reference)
            .filter(|r| !r.publisher.is_empty())
            .map(|r| Image::new(r.publisher, r.offer, r.sku, r.version).urn())
            .unwrap_or_else(|| image_hint.to_string());

        ProvisioningHandle {
            id: self.id,
            name: self.name,
            size,
            image,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_sku_maps_onto_sku() {
        let raw: ResourceSku = serde_json::from_value(json!({
            "resourceType": "virtualMachines",
            "name": "Standard_B1s",
            "tier": "Standard",
            "size": "B1s",
            "family": "standardBSFamily",
            "locations": ["eastus"],
            "capabilities": [{"name": "vCPUs", "value": "1"}]
        }))
        .unwrap();

        assert!(raw.is_virtual_machine());
        let sku = raw.into_sku();
        assert_eq!(sku.name(), "Standard_B1s");
        assert_eq!(sku.family(), "standardBSFamily");
        assert_eq!(sku.capacity(), 0);
    }

    #[test]
    fn vm_without_profiles_uses_hints() {
        let raw: VirtualMachine = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/my-vm",
            "name": "my-vm",
            "properties": {"provisioningState": "Creating"}
        }))
        .unwrap();

        let handle = raw.into_handle("Standard_B1s", "ubuntu-20.04");
        assert_eq!(handle.size, "Standard_B1s");
        assert_eq!(handle.image, "ubuntu-20.04");
        assert_eq!(handle.status, VmStatus::Provisioning);
    }

    #[test]
    fn vm_with_image_reference_reports_urn() {
        let raw: VirtualMachine = serde_json::from_value(json!({
            "id": "id-1",
            "name": "my-vm",
            "properties": {
                "provisioningState": "Succeeded",
                "hardwareProfile": {"vmSize": "Standard_D2s_v3"},
                "storageProfile": {"imageReference": {
                    "publisher": "Canonical",
                    "offer": "0001-com-ubuntu-server-jammy",
                    "sku": "22_04-lts-gen2",
                    "version": "latest"
                }}
            }
        }))
        .unwrap();

        let handle = raw.into_handle("", "");
        assert_eq!(handle.size, "Standard_D2s_v3");
        assert_eq!(handle.image, "Canonical:0001-com-ubuntu-server-jammy:22_04-lts-gen2:latest");
        assert_eq!(handle.status, VmStatus::Succeeded);
    }
}
