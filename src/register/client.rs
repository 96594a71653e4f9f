//! HTTP seam to the asset catalog.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use url::Url;

use crate::error::RegistrationError;

use super::request::AssetRequest;

/// Raw response of an asset creation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub body: Bytes,
}

impl AssetResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Creates assets in a remote catalog.
#[async_trait]
pub trait AssetClient: Send + Sync {
    /// Create asset `{collection}/{name}` from `request`.
    ///
    /// Non-2xx statuses are returned as responses; only transport failures
    /// are errors.
    async fn create_asset(
        &self,
        name: &str,
        request: &AssetRequest,
    ) -> Result<AssetResponse, RegistrationError>;
}

/// [`AssetClient`] posting JSON to `{endpoint}/projects/{project}/assets`.
#[derive(Debug, Clone)]
pub struct HttpAssetClient {
    client: Client,
    endpoint: Url,
    project: String,
    collection: String,
    token: String,
}

impl HttpAssetClient {
    pub fn new(
        endpoint: &str,
        project: impl Into<String>,
        collection: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, RegistrationError> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| RegistrationError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            client,
            endpoint,
            project: project.into(),
            collection: collection.into(),
            token: token.into(),
        })
    }

    /// Request URL for asset `name`.
    pub fn asset_url(&self, name: &str) -> Result<Url, RegistrationError> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| RegistrationError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .extend(["projects", self.project.as_str(), "assets"]);
        url.query_pairs_mut()
            .append_pair("assetId", &format!("{}/{}", self.collection, name));
        Ok(url)
    }
}

#[async_trait]
impl AssetClient for HttpAssetClient {
    async fn create_asset(
        &self,
        name: &str,
        request: &AssetRequest,
    ) -> Result<AssetResponse, RegistrationError> {
        let response = self
            .client
            .post(self.asset_url(name)?)
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(AssetResponse { status, body })
    }
}
