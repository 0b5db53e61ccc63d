use std::fmt;

use aws_sdk_s3::{Client, primitives::ByteStream};
use bytes::Bytes;

use crate::identity::BackendKind;
use crate::{Error, Result, StorageAdapter};

/// Aliyun OSS storage adapter, driven through OSS's S3-compatible API.
///
/// The configured OSS endpoint (e.g. `https://oss-cn-hangzhou.aliyuncs.com`)
/// is set as a custom endpoint on the S3 client; objects are addressed
/// virtual-hosted style, `https://{bucket}.{endpoint-host}/{key}`.
#[derive(Clone)]
pub struct AliyunOssStorage {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl fmt::Debug for AliyunOssStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AliyunOssStorage")
            .field("bucket", &self.bucket)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl AliyunOssStorage {
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Derive the OSS region id from an endpoint,
    /// `https://oss-cn-hangzhou.aliyuncs.com` → `cn-hangzhou`.
    pub(crate) fn region_from_endpoint(endpoint: &str) -> Option<String> {
        let host = endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let first_label = host.split('.').next()?;
        first_label.strip_prefix("oss-").map(str::to_string)
    }

    fn object_url(&self, key: &str) -> String {
        let host = self
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{}.{}/{}", self.bucket, host, key)
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Generic("oss key cannot be empty".to_string()));
        }
        Ok(())
    }

    fn map_sdk_err<E>(e: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Connection(Box::new(e))
    }

    fn err_is_not_found<E: std::error::Error>(e: &E) -> bool {
        let msg = e.to_string();
        let meta = format!("{e:?}");
        msg.contains("NotFound")
            || msg.contains("NoSuchKey")
            || msg.contains("404")
            || meta.contains("NotFound")
            || meta.contains("NoSuchKey")
    }
}

#[async_trait::async_trait]
impl StorageAdapter for AliyunOssStorage {
    fn kind(&self) -> BackendKind {
        BackendKind::Aliyun
    }

    async fn store(&self, key: &str, data: Bytes) -> Result<String> {
        Self::validate_key(key)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(Self::map_sdk_err)?;

        Ok(self.object_url(key))
    }

    async fn retrieve(&self, key: &str) -> Result<Bytes> {
        Self::validate_key(key)?;

        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        let out = match resp {
            Ok(out) => out,
            Err(e) if Self::err_is_not_found(&e) => {
                return Err(Error::NotFound(key.to_string()));
            }
            Err(e) => return Err(Self::map_sdk_err(e)),
        };

        let data = out.body.collect().await.map_err(Self::map_sdk_err)?;
        Ok(data.into_bytes())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        Self::validate_key(key)?;

        let resp = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(_) => Ok(()),
            Err(e) if Self::err_is_not_found(&e) => Ok(()),
            Err(e) => Err(Self::map_sdk_err(e)),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Self::validate_key(key)?;

        let resp = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match resp {
            Ok(_) => Ok(true),
            Err(e) if Self::err_is_not_found(&e) => Ok(false),
            Err(e) => Err(Self::map_sdk_err(e)),
        }
    }
}
