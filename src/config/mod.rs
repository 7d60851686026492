//! Process configuration, read once at startup.
//!
//! Everything comes from flags or their environment variables; the result is
//! an explicit [`Settings`] value that `main` hands to the Azure client and the
//! HTTP layer. Nothing here is consulted again after startup.

mod catalog;

pub use catalog::{CatalogSettings, ImageOffer, KnownLocations};

use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};
use url::Url;

use crate::cloud::Secret;
use crate::service::ProvisionerOptions;

#[derive(Debug, Parser)]
#[command(
    name = "azure-vm-provisioner",
    version,
    about = "HTTP API for listing and creating Azure virtual machines"
)]
pub struct Cli {
    /// Address the HTTP server binds to
    #[arg(long, env = "VMP_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription_id: String,

    /// Resource group new VMs are created in and names are checked against
    #[arg(long, env = "AZURE_RESOURCE_GROUP")]
    pub resource_group: String,

    /// Location used when a catalog query names none
    #[arg(long, env = "AZURE_LOCATION", default_value = "eastus")]
    pub location: String,

    /// Full resource id of the subnet new VM NICs attach to
    #[arg(long, env = "AZURE_SUBNET_ID")]
    pub subnet_id: String,

    #[arg(long, env = "AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_ID")]
    pub client_id: Option<String>,

    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Pre-acquired bearer token, used instead of the client credentials
    #[arg(long, env = "AZURE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Deadline for every call to the provider, in seconds
    #[arg(long, env = "VMP_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    #[arg(long, env = "AZURE_MANAGEMENT_ENDPOINT", default_value = "https://management.azure.com/")]
    pub management_endpoint: Url,

    #[arg(long, env = "AZURE_AUTHORITY_HOST", default_value = "https://login.microsoftonline.com/")]
    pub authority_host: Url,

    /// JSON file with recognized locations and listed image offers
    #[arg(long, env = "VMP_CATALOG_FILE")]
    pub catalog_file: Option<PathBuf>,
}

/// How the Azure client authenticates.
#[derive(Debug, Clone)]
pub enum CredentialSettings {
    AccessToken(Secret),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: Secret,
    },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub listen: SocketAddr,
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    pub subnet_id: String,
    pub credentials: CredentialSettings,
    pub request_timeout: Duration,
    pub management_endpoint: Url,
    pub authority_host: Url,
    pub catalog: CatalogSettings,
}

impl Settings {
    pub fn provisioner_options(&self) -> ProvisionerOptions {
        ProvisionerOptions {
            resource_group: self.resource_group.clone(),
            default_location: self.location.clone(),
            locations: self.catalog.locations().clone(),
            deadline: self.request_timeout,
        }
    }
}

impl TryFrom<Cli> for Settings {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let catalog = match &cli.catalog_file {
            Some(path) => CatalogSettings::from_file(path)?,
            None => CatalogSettings::builtin()?,
        };

        if !catalog.locations().contains(&cli.location) {
            return Err(ConfigError::Invalid(format!(
                "default location '{}' is not in the catalog's location list",
                cli.location
            )));
        }

        if cli.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        for (flag, value) in [
            ("subscription id", &cli.subscription_id),
            ("resource group", &cli.resource_group),
            ("subnet id", &cli.subnet_id),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Invalid(format!("{flag} must not be empty")));
            }
        }

        let credentials = match (
            cli.access_token,
            cli.tenant_id,
            cli.client_id,
            cli.client_secret,
        ) {
            (Some(token), ..) if !token.is_empty() => {
                CredentialSettings::AccessToken(Secret::new(token))
            }
            (_, Some(tenant_id), Some(client_id), Some(client_secret)) => {
                CredentialSettings::ClientSecret {
                    tenant_id,
                    client_id,
                    client_secret: Secret::new(client_secret),
                }
            }
            _ => return Err(ConfigError::MissingCredentials),
        };

        Ok(Settings {
            listen: cli.listen,
            subscription_id: cli.subscription_id,
            resource_group: cli.resource_group,
            location: cli.location,
            subnet_id: cli.subnet_id,
            credentials,
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            management_endpoint: with_trailing_slash(cli.management_endpoint),
            authority_host: with_trailing_slash(cli.authority_host),
            catalog,
        })
    }
}

/// `Url::join` treats the last segment as a file unless the base ends in `/`.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no Azure credentials: set AZURE_ACCESS_TOKEN or AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET")]
    MissingCredentials,
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(extra: &[&str]) -> Cli {
        let mut args = vec![
            "azure-vm-provisioner",
            "--subscription-id",
            "sub-1",
            "--resource-group",
            "rg-1",
            "--subnet-id",
            "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Network/virtualNetworks/vnet/subnets/default",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn static_token_wins() {
        let settings =
            Settings::try_from(cli(&["--access-token", "abc", "--tenant-id", "t"])).unwrap();
        assert!(matches!(
            settings.credentials,
            CredentialSettings::AccessToken(ref s) if s.expose() == "abc"
        ));
        assert_eq!(settings.location, "eastus");
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
        assert_eq!(settings.management_endpoint.as_str(), "https://management.azure.com/");
    }

    #[test]
    fn client_secret_needs_all_three() {
        let settings = Settings::try_from(cli(&[
            "--tenant-id",
            "t",
            "--client-id",
            "c",
            "--client-secret",
            "s",
        ]))
        .unwrap();
        assert!(matches!(settings.credentials, CredentialSettings::ClientSecret { .. }));

        let err = Settings::try_from(cli(&["--tenant-id", "t", "--client-id", "c"])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredentials));
    }

    #[test]
    fn default_location_must_be_known() {
        let err = Settings::try_from(cli(&["--access-token", "abc", "--location", "atlantis"]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = Settings::try_from(cli(&[
            "--access-token",
            "abc",
            "--request-timeout-secs",
            "0",
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn endpoint_gets_trailing_slash() {
        let settings = Settings::try_from(cli(&[
            "--access-token",
            "abc",
            "--management-endpoint",
            "http://127.0.0.1:8080/arm",
        ]))
        .unwrap();
        assert_eq!(settings.management_endpoint.as_str(), "http://127.0.0.1:8080/arm/");
    }

    #[test]
    fn options_carry_resource_group_and_deadline() {
        let settings = Settings::try_from(cli(&[
            "--access-token",
            "abc",
            "--request-timeout-secs",
            "5",
        ]))
        .unwrap();
        let options = settings.provisioner_options();
        assert_eq!(options.resource_group, "rg-1");
        assert_eq!(options.deadline, Duration::from_secs(5));
        assert!(options.locations.contains("westeurope"));
    }
}
