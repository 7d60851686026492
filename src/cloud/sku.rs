use serde::{Deserialize, Serialize};

/// A virtual-machine size offered by the provider in one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    name: String,
    tier: String,
    family: String,
    size: String,
    capacity: u32,
}

#[allow(unused)]
impl Sku {
    pub fn new(
        name: impl Into<String>,
        tier: impl Into<String>,
        family: impl Into<String>,
        size: impl Into<String>,
        capacity: u32,
    ) -> Self {
        Self {
            name: name.into(),
            tier: tier.into(),
            family: family.into(),
            size: size.into(),
            capacity,
        }
    }

    /// Size name as accepted by the create call
    /// eg. Standard_B1s
    pub fn name(&self) -> &str {
        &self.name
    }

    /// eg. Standard
    pub fn tier(&self) -> &str {
        &self.tier
    }

    /// eg. standardBSFamily
    pub fn family(&self) -> &str {
        &self.family
    }

    /// eg. B1s
    pub fn size(&self) -> &str {
        &self.size
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}
