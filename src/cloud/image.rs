use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace image reference, as listed by the catalog for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    publisher: String,
    offer: String,
    sku: String,
    version: String,
}

#[allow(unused)]
impl Image {
    pub fn new(
        publisher: impl Into<String>,
        offer: impl Into<String>,
        sku: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            publisher: publisher.into(),
            offer: offer.into(),
            sku: sku.into(),
            version: version.into(),
        }
    }

    /// eg. Canonical
    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    /// eg. 0001-com-ubuntu-server-focal
    pub fn offer(&self) -> &str {
        &self.offer
    }

    /// eg. 20_04-lts-gen2
    pub fn sku(&self) -> &str {
        &self.sku
    }

    /// eg. latest
    pub fn version(&self) -> &str {
        &self.version
    }

    /// `publisher:offer:sku:version`, the provider's own shorthand for an image.
    pub fn urn(&self) -> String {
        format!("{}:{}:{}:{}", self.publisher, self.offer, self.sku, self.version)
    }

    /// Whether a client-supplied image identifier refers to this entry.
    ///
    /// Accepts the full URN or the bare image SKU. Comparison is exact. A bare
    /// SKU can name entries under more than one offer; callers must treat
    /// that as ambiguous.
    pub fn is_identified_by(&self, identifier: &str) -> bool {
        identifier == self.sku || identifier == self.urn()
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urn())
    }
}
