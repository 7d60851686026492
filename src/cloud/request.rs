use super::Secret;

/// A fully-typed create request, only ever produced by the request normalizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningRequest {
    pub(crate) name: String,
    pub(crate) size: String,
    pub(crate) image: String,
    pub(crate) admin_username: String,
    pub(crate) admin_password: Secret,
    pub(crate) location: String,
}

impl ProvisioningRequest {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> &str {
        &self.size
    }

    /// Image identifier exactly as the client sent it (URN or image SKU).
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn admin_username(&self) -> &str {
        &self.admin_username
    }

    pub fn admin_password(&self) -> &Secret {
        &self.admin_password
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}
