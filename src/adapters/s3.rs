use std::fmt;

use aws_sdk_s3::{Client, primitives::ByteStream};
use bytes::Bytes;

use crate::identity::BackendKind;
use crate::{Error, Result, StorageAdapter};

/// AWS S3 storage adapter using object keys as identifiers.
#[derive(Clone)]
pub struct AwsS3Storage {
    client: Client,
    bucket: String,
    region: String,
}

impl fmt::Debug for AwsS3Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsS3Storage")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

impl AwsS3Storage {
    pub fn new(client: Client, bucket: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            region: region.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    fn object_url(&self, key: &str) -> String {
        format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            self.bucket, self.region, key
        )
    }

    fn validate_key(key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::Generic("s3 key cannot be empty".to_string()));
        }
        Ok(())
    }

    fn map_sdk_err<E>(e: E) -> Error
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Connection(Box::new(e))
    }

    // The SDK returns modeled service errors; treat 404/NoSuchKey shapes as
    // missing objects wherever the operation allows it.
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
impl StorageAdapter for AwsS3Storage {
    fn kind(&self) -> BackendKind {
        BackendKind::AwsS3
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
            // Delete is idempotent.
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
