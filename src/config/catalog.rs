use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fs, path::Path};

use super::ConfigError;

/// Catalog settings shipped with the binary; `VMP_CATALOG_FILE` replaces them.
const DEFAULT_CATALOG: &str = include_str!("../../resources/catalog.json");

/// Publisher/offer pair whose image SKUs are listed for a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOffer {
    pub(crate) publisher: String,
    pub(crate) offer: String,
}

impl ImageOffer {
    pub fn new(publisher: impl Into<String>, offer: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            offer: offer.into(),
        }
    }

    pub fn publisher(&self) -> &str {
        &self.publisher
    }

    pub fn offer(&self) -> &str {
        &self.offer
    }
}

/// Location codes the service accepts, eg. `eastus`. Matching is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct KnownLocations(BTreeSet<String>);

impl KnownLocations {
    pub fn contains(&self, location: &str) -> bool {
        self.0.contains(location)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KnownLocations {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    pub(crate) locations: KnownLocations,
    #[serde(default)]
    pub(crate) image_offers: Vec<ImageOffer>,
}

impl CatalogSettings {
    /// The settings embedded at build time.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_json_str(DEFAULT_CATALOG)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let parsed: CatalogSettings = serde_json::from_str(json)?;
        if parsed.locations.is_empty() {
            return Err(ConfigError::Invalid("catalog lists no locations".to_string()));
        }
        Ok(parsed)
    }

    pub fn locations(&self) -> &KnownLocations {
        &self.locations
    }

    pub fn image_offers(&self) -> &[ImageOffer] {
        &self.image_offers
    }
}
