use anyhow::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

use crate::cloud::Secret;
use crate::config::CredentialSettings;

/// Tokens are refreshed this long before the authority says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(300);

/// Source of bearer tokens for the management API.
pub enum Credential {
    Static(Secret),
    ClientSecret(ClientSecretCredential),
}

impl Credential {
    pub fn from_settings(settings: &CredentialSettings, authority: &Url, management: &Url) -> Self {
        match settings {
            CredentialSettings::AccessToken(token) => Credential::Static(token.clone()),
            CredentialSettings::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            } => Credential::ClientSecret(ClientSecretCredential {
                authority: authority.clone(),
                tenant_id: tenant_id.clone(),
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
                scope: format!("{management}.default"),
                cached: Mutex::new(None),
            }),
        }
    }

    pub async fn bearer(&self, http: &Client) -> Result<String> {
        match self {
            Credential::Static(token) => Ok(token.expose().to_string()),
            Credential::ClientSecret(credential) => credential.token(http).await,
        }
    }
}

/// OAuth2 client-credentials flow against the Microsoft identity platform.
pub struct ClientSecretCredential {
    authority: Url,
    tenant_id: String,
    client_id: String,
    client_secret: Secret,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl ClientSecretCredential {
    async fn token(&self, http: &Client) -> Result<String> {
        // Held across the refresh so concurrent requests share one token fetch.
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.value.clone());
        }

        let url = self
            .authority
            .join(&format!("{}/oauth2/v2.0/token", self.tenant_id))
            .context("build token endpoint url")?;

        let res = http
            .post(url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("POST {url}"))?;

        let status = res.status();
        if !status.is_success() {
            bail!("HTTP {} from token endpoint {}", status, url);
        }

        let body: TokenResponse = res.json().await.context("parse token response")?;
        let lifetime = Duration::from_secs(body.expires_in);
        tracing::debug!(expires_in = body.expires_in, "acquired management token");

        *cached = Some(CachedToken {
            value: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });

        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential(server: &MockServer) -> Credential {
        let settings = CredentialSettings::ClientSecret {
            tenant_id: "tenant-1".to_string(),
            client_id: "client-1".to_string(),
            client_secret: Secret::new("s3cret"),
        };
        let authority = Url::parse(&format!("{}/", server.uri())).unwrap();
        let management = Url::parse("https://management.azure.com/").unwrap();
        Credential::from_settings(&settings, &authority, &management)
    }

    #[tokio::test]
    async fn client_secret_token_is_reused() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant-1/oauth2/v2.0/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("management.azure.com%2F.default"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": 3599,
                "access_token": "tok-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let http = Client::new();
        let credential = credential(&server);
        assert_eq!(credential.bearer(&http).await.unwrap(), "tok-1");
        assert_eq!(credential.bearer(&http).await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn token_endpoint_failure_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = credential(&server).bearer(&Client::new()).await.unwrap_err();
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn static_token_is_returned_as_is() {
        let credential = Credential::Static(Secret::new("fixed"));
        assert_eq!(credential.bearer(&Client::new()).await.unwrap(), "fixed");
    }
}
