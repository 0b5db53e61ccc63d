use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::identity::BackendKind;
use crate::{Error, Result, StorageAdapter};

/// Imgur image host adapter using `Client-ID` authorization.
///
/// Imgur assigns its own image ids, so the adapter keeps an in-process map
/// of object key → uploaded image to give the uniform key-addressed
/// surface. Objects uploaded by other processes are not visible here.
pub struct ImgurStorage {
    client: Client,
    client_id: SecretString,
    images: Arc<RwLock<HashMap<String, ImgurImage>>>,
}

#[derive(Clone, Debug)]
struct ImgurImage {
    link: String,
    delete_hash: String,
}

#[derive(Deserialize)]
struct UploadResponse {
    data: UploadData,
    success: bool,
}

#[derive(Deserialize)]
struct UploadData {
    link: String,
    #[serde(rename = "deletehash")]
    delete_hash: String,
}

impl ImgurStorage {
    const API_URL: &'static str = "https://api.imgur.com/3";

    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            client_id: SecretString::from(client_id.into()),
            images: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn auth_header(&self) -> String {
        format!("Client-ID {}", self.client_id.expose_secret())
    }

    fn image_for(&self, key: &str) -> Option<ImgurImage> {
        self.images
            .read()
            .expect("poisoned lock")
            .get(key)
            .cloned()
    }

    fn map_error(&self, status: StatusCode, key: &str, body: &str) -> Error {
        match status {
            StatusCode::NOT_FOUND => Error::NotFound(key.to_string()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::PermissionDenied(format!("Imgur auth failed: {body}"))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                Error::Generic("Imgur rate limit exceeded".to_string())
            }
            _ => Error::Generic(format!("Imgur error {status}: {body}")),
        }
    }
}

impl fmt::Debug for ImgurStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let len = self.images.read().expect("poisoned lock").len();
        f.debug_struct("ImgurStorage")
            .field("uploaded", &len)
            .finish()
    }
}

#[async_trait::async_trait]
impl StorageAdapter for ImgurStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Imgur
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<String> {
        let form = Form::new()
            .part("image", Part::bytes(data.to_vec()).file_name(key.to_string()))
            .text("name", key.to_string());

        let response = self
            .client
            .post(format!("{}/image", Self::API_URL))
            .header(AUTHORIZATION, self.auth_header())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_error(status, key, &body));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        if !upload.success {
            return Err(Error::Generic(format!("Imgur rejected upload of {key}")));
        }

        let link = upload.data.link.clone();
        self.images.write().expect("poisoned lock").insert(
            key.to_string(),
            ImgurImage {
                link: upload.data.link,
                delete_hash: upload.data.delete_hash,
            },
        );

        Ok(link)
    }

    async fn retrieve(&self, key: &str) -> Result<Bytes> {
        let image = self
            .image_for(key)
            .ok_or_else(|| Error::NotFound(key.to_string()))?;

        let response = self
            .client
            .get(&image.link)
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_error(status, key, &body));
        }

        response
            .bytes()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        // Idempotent: a key this process never uploaded is already gone.
        let Some(image) = self.image_for(key) else {
            return Ok(());
        };

        let response = self
            .client
            .delete(format!("{}/image/{}", Self::API_URL, image.delete_hash))
            .header(AUTHORIZATION, self.auth_header())
            .send()
            .await
            .map_err(|e| Error::Connection(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(self.map_error(status, key, &body));
        }

        self.images.write().expect("poisoned lock").remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.image_for(key).is_some())
    }
}
