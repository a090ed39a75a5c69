//! # Azure Authentication
//!
//! Azure Resource Manager tokens through `azure_identity` credentials.
//!
//! The credential is picked from the environment, first match wins:
//! - `AZURE_ACCESS_TOKEN`: a pre-acquired bearer token (CI pipelines, mock servers)
//! - `AZURE_TENANT_ID` + `AZURE_CLIENT_ID` + `AZURE_CLIENT_SECRET`: service principal
//! - `AZURE_FEDERATED_TOKEN_FILE` + `AZURE_CLIENT_ID`: Workload Identity
//! - `AZURE_USE_MANAGED_IDENTITY=true`: Managed Identity
//! - otherwise the Azure CLI login (`az login`)

use crate::config::{optional_env, ServiceConfig};
use crate::constants::ARM_TOKEN_SCOPE;
use crate::provider::azure::ApimClient;
use crate::provider::{Authenticator, RemoteRegistryClient};
use anyhow::{Context, Result};
use async_trait::async_trait;
use azure_core::credentials::{AccessToken, Secret, TokenCredential, TokenRequestOptions};
use azure_identity::{
    AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential,
    WorkloadIdentityCredential,
};
use std::sync::Arc;
use tracing::{debug, info};

/// Which credential authenticates the run
#[derive(Clone, PartialEq, Eq)]
pub enum AzureAuthConfig {
    StaticToken(String),
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
    },
    WorkloadIdentity {
        client_id: String,
    },
    ManagedIdentity,
    AzureCli,
}

impl std::fmt::Debug for AzureAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AzureAuthConfig::StaticToken(_) => f.write_str("StaticToken(<redacted>)"),
            AzureAuthConfig::ClientSecret {
                tenant_id,
                client_id,
                ..
            } => f
                .debug_struct("ClientSecret")
                .field("tenant_id", tenant_id)
                .field("client_id", client_id)
                .finish_non_exhaustive(),
            AzureAuthConfig::WorkloadIdentity { client_id } => f
                .debug_struct("WorkloadIdentity")
                .field("client_id", client_id)
                .finish(),
            AzureAuthConfig::ManagedIdentity => f.write_str("ManagedIdentity"),
            AzureAuthConfig::AzureCli => f.write_str("AzureCli"),
        }
    }
}

impl AzureAuthConfig {
    /// Read the credential choice from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(optional_env)
    }

    /// Pick a credential from `lookup`, which returns non-empty variable values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup("AZURE_ACCESS_TOKEN") {
            return AzureAuthConfig::StaticToken(token);
        }

        let client_id = lookup("AZURE_CLIENT_ID");
        if let (Some(tenant_id), Some(client_id), Some(client_secret)) = (
            lookup("AZURE_TENANT_ID"),
            client_id.clone(),
            lookup("AZURE_CLIENT_SECRET"),
        ) {
            return AzureAuthConfig::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
            };
        }

        if let (Some(_), Some(client_id)) = (lookup("AZURE_FEDERATED_TOKEN_FILE"), client_id) {
            return AzureAuthConfig::WorkloadIdentity { client_id };
        }

        if lookup("AZURE_USE_MANAGED_IDENTITY").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
            return AzureAuthConfig::ManagedIdentity;
        }

        AzureAuthConfig::AzureCli
    }
}

/// TokenCredential handing out a pre-acquired bearer token
pub struct StaticTokenCredential {
    token: Secret,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Secret::new(token.into()),
        }
    }
}

impl std::fmt::Debug for StaticTokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenCredential").finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    async fn get_token(
        &self,
        _scopes: &[&str],
        _options: Option<TokenRequestOptions<'_>>,
    ) -> azure_core::Result<AccessToken> {
        use typespec_client_core::time::{Duration, OffsetDateTime};

        // The real expiry is unknown; the token is used for a single run
        Ok(AccessToken::new(
            self.token.clone(),
            OffsetDateTime::now_utc() + Duration::seconds(3600),
        ))
    }
}

/// Create the Azure credential for `config`
///
/// # Errors
/// Returns an error if the selected `azure_identity` credential cannot be built.
pub fn create_credential(config: &AzureAuthConfig) -> Result<Arc<dyn TokenCredential>> {
    let credential: Arc<dyn TokenCredential> = match config {
        AzureAuthConfig::StaticToken(token) => {
            debug!("Using access token from AZURE_ACCESS_TOKEN");
            Arc::new(StaticTokenCredential::new(token.clone()))
        }
        AzureAuthConfig::ClientSecret {
            tenant_id,
            client_id,
            client_secret,
        } => {
            info!(
                "Using service principal authentication with client ID: {}",
                client_id
            );
            ClientSecretCredential::new(
                tenant_id,
                client_id.clone(),
                Secret::new(client_secret.clone()),
                None,
            )
            .context("Failed to create ClientSecretCredential")?
        }
        AzureAuthConfig::WorkloadIdentity { client_id } => {
            info!(
                "Using Azure Workload Identity authentication with client ID: {}",
                client_id
            );
            let options = azure_identity::WorkloadIdentityCredentialOptions {
                client_id: Some(client_id.clone()),
                ..Default::default()
            };
            WorkloadIdentityCredential::new(Some(options))
                .context("Failed to create WorkloadIdentityCredential")?
        }
        AzureAuthConfig::ManagedIdentity => {
            info!("Using Managed Identity authentication");
            ManagedIdentityCredential::new(None)
                .context("Failed to create ManagedIdentityCredential")?
        }
        AzureAuthConfig::AzureCli => {
            info!("Using Azure CLI authentication; run `az login` first");
            AzureCliCredential::new(None).context("Failed to create AzureCliCredential")?
        }
    };

    Ok(credential)
}

/// Get an access token for Azure Resource Manager
///
/// # Errors
/// Returns an error if the credential cannot produce a token.
pub async fn get_token(credential: &Arc<dyn TokenCredential>) -> Result<String> {
    let scope = &[ARM_TOKEN_SCOPE];
    let options = Some(TokenRequestOptions::default());
    let token_response = credential
        .get_token(scope, options)
        .await
        .context("Failed to get Azure Resource Manager access token")?;
    Ok(token_response.token.secret().to_string())
}

/// Authenticates once and hands out an [`ApimClient`] for the configured service
#[derive(Clone)]
pub struct AzureAuthenticator {
    service: ServiceConfig,
    credential: Arc<dyn TokenCredential>,
}

impl std::fmt::Debug for AzureAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureAuthenticator")
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl AzureAuthenticator {
    pub fn new(service: ServiceConfig, credential: Arc<dyn TokenCredential>) -> Self {
        Self {
            service,
            credential,
        }
    }

    /// Authenticator using the credential selected by the environment
    ///
    /// # Errors
    /// Returns an error if the credential cannot be built.
    pub fn from_env(service: ServiceConfig) -> Result<Self> {
        let config = AzureAuthConfig::from_env();
        debug!("Azure authentication: {:?}", config);
        Ok(Self::new(service, create_credential(&config)?))
    }
}

#[async_trait]
impl Authenticator for AzureAuthenticator {
    async fn authenticate(&self) -> Result<Arc<dyn RemoteRegistryClient>> {
        let token = get_token(&self.credential)
            .await
            .context("Failed to acquire Azure access token")?;
        info!(
            "Authenticated against Azure Resource Manager for service {}",
            self.service.service_name
        );
        let client = ApimClient::new(&self.service, token)?;
        Ok(Arc::new(client))
    }
}
