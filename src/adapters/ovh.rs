use std::fmt;

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::identity::BackendKind;
use crate::{Error, Result, StorageAdapter};

/// OVH object storage adapter (OpenStack Swift).
///
/// Authenticates against Keystone v2 with password credentials and caches
/// the issued token together with the region's object-store endpoint. The
/// token is only fetched on first use, so construction stays network-free;
/// objects are addressed as `{storage_url}/{container}/{key}`.
pub struct OvhSwiftStorage {
    client: Client,
    username: String,
    password: SecretString,
    tenant_id: String,
    container: String,
    region: String,
    auth_url: String,
    session: RwLock<Option<SwiftSession>>,
}

impl fmt::Debug for OvhSwiftStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OvhSwiftStorage")
            .field("username", &self.username)
            .field("tenant_id", &self.tenant_id)
            .field("container", &self.container)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Clone, Debug)]
struct SwiftSession {
    token: String,
    storage_url: String,
}

#[derive(Deserialize)]
struct AuthResponse {
    access: Access,
}

#[derive(Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog")]
    service_catalog: Vec<CatalogEntry>,
}

#[derive(Deserialize)]
struct Token {
    id: String,
}

#[derive(Deserialize)]
struct CatalogEntry {
    #[serde(rename = "type")]
    kind: String,
    endpoints: Vec<CatalogEndpoint>,
}

#[derive(Deserialize)]
struct CatalogEndpoint {
    region: String,
    #[serde(rename = "publicURL")]
    public_url: String,
}

impl OvhSwiftStorage {
    const AUTH_URL: &'static str = "https://auth.cloud.ovh.net/v2.0";

    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        tenant_id: impl Into<String>,
        container: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            username: username.into(),
            password: SecretString::from(password.into()),
            tenant_id: tenant_id.into(),
            container: container.into(),
            region: region.into(),
            auth_url: Self::AUTH_URL.to_string(),
            session: RwLock::new(None),
        }
    }

    /// Override the Keystone endpoint (for private clouds and tests).
    pub fn with_auth_url(mut self, auth_url: impl Into<String>) -> Self {
        self.auth_url = auth_url.into();
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn session(&self) -> Result<SwiftSession> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(session);
        }

        let mut guard = self.session.write().await;
        if let Some(session) = guard.clone() {
            return Ok(session);
        }

        let body = json!({
            "auth": {
                "passwordCredentials": {
                    "username": self.username,
                    "password": self.password.expose_secret(),
                },
                "tenantId": self.tenant_id,
            }
        });

        let response = self
            .client
            .post(format!("{}/tokens", self.auth_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(Error::PermissionDenied(format!(
                "Swift authentication failed: {}",
                response.status()
            )));
        }

        let auth: AuthResponse = response
            .json()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let storage_url = auth
            .access
            .service_catalog
            .iter()
            .filter(|entry| entry.kind == "object-store")
            .flat_map(|entry| entry.endpoints.iter())
            .find(|endpoint| endpoint.region.eq_ignore_ascii_case(&self.region))
            .map(|endpoint| endpoint.public_url.clone())
            .ok_or_else(|| {
                Error::Generic(format!(
                    "no object-store endpoint for region {}",
                    self.region
                ))
            })?;

        let session = SwiftSession {
            token: auth.access.token.id,
            storage_url,
        };
        *guard = Some(session.clone());
        Ok(session)
    }

    fn object_url(&self, session: &SwiftSession, key: &str) -> String {
        // Encode per segment so pseudo-folder separators survive.
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}/{}",
            session.storage_url.trim_end_matches('/'),
            self.container,
            encoded.join("/")
        )
    }

    fn map_status_error(&self, status: StatusCode, key: &str) -> Error {
        match status {
            StatusCode::NOT_FOUND => Error::NotFound(key.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::PermissionDenied("Swift authentication failed".to_string())
            }
            _ => Error::Generic(format!("Swift error: {status}")),
        }
    }
}

#[async_trait::async_trait]
impl StorageAdapter for OvhSwiftStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::OvhSwift
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<String> {
        let session = self.session().await?;
        let url = self.object_url(&session, key);

        let response = self
            .client
            .put(&url)
            .header("X-Auth-Token", &session.token)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        if !response.status().is_success() {
            return Err(self.map_status_error(response.status(), key));
        }

        Ok(url)
    }

    async fn retrieve(&self, key: &str) -> Result<Bytes> {
        let session = self.session().await?;
        let url = self.object_url(&session, key);

        let response = self
            .client
            .get(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        match response.status() {
            status if status.is_success() => response
                .bytes()
                .await
                .map_err(|e| Error::Connection(Box::new(e))),
            StatusCode::NOT_FOUND => Err(Error::NotFound(key.to_string())),
            status => Err(self.map_status_error(status, key)),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let session = self.session().await?;
        let url = self.object_url(&session, key);

        let response = self
            .client
            .delete(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        match response.status() {
            status if status.is_success() => Ok(()),
            // Delete is idempotent.
            StatusCode::NOT_FOUND => Ok(()),
            status => Err(self.map_status_error(status, key)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let session = self.session().await?;
        let url = self.object_url(&session, key);

        let response = self
            .client
            .head(&url)
            .header("X-Auth-Token", &session.token)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(self.map_status_error(status, key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_encodes_segments_but_keeps_separators() {
        let storage = OvhSwiftStorage::new("u", "p", "t", "files", "BHS1");
        let session = SwiftSession {
            token: "tok".to_string(),
            storage_url: "https://storage.bhs1.cloud.ovh.net/v1/AUTH_x/".to_string(),
        };

        assert_eq!(
            storage.object_url(&session, "2024/a b.png"),
            "https://storage.bhs1.cloud.ovh.net/v1/AUTH_x/files/2024/a%20b.png"
        );
    }

    #[test]
    fn debug_omits_credentials() {
        let storage = OvhSwiftStorage::new("user", "hunter2", "tenant", "files", "BHS1");
        let rendered = format!("{storage:?}");

        assert!(rendered.contains("user"));
        assert!(!rendered.contains("hunter2"));
    }
}
