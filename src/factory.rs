//! Adapter construction: one pure builder per backend identity.

use std::sync::Arc;

use crate::adapters::local::LocalStorage;
use crate::identity::BackendKind;
use crate::settings::Settings;
use crate::{Error, Result, StorageAdapter};

/// Builds a storage adapter for a backend identity from settings.
///
/// The seam is a trait so embedders can swap construction wholesale and
/// tests can observe invocations; the default implementation is a plain
/// dispatch table from identity to builder function.
pub trait AdapterFactory: Send + Sync {
    /// Construct the adapter for `kind`.
    ///
    /// Deterministic for identical settings and free of network I/O: only a
    /// client object is instantiated and wrapped, connectivity is validated
    /// lazily by first use. Fails with [`Error::Configuration`] when a
    /// required setting is missing or empty.
    fn build(
        &self,
        kind: BackendKind,
        settings: &dyn Settings,
    ) -> Result<Arc<dyn StorageAdapter>>;
}

/// The built-in identity → constructor table.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultFactory;

impl AdapterFactory for DefaultFactory {
    fn build(
        &self,
        kind: BackendKind,
        settings: &dyn Settings,
    ) -> Result<Arc<dyn StorageAdapter>> {
        match kind {
            BackendKind::Local => Ok(Arc::new(local(settings))),
            #[cfg(feature = "aws-s3")]
            BackendKind::AwsS3 => Ok(Arc::new(aws_s3(settings)?)),
            #[cfg(feature = "aliyun")]
            BackendKind::Aliyun => Ok(Arc::new(aliyun(settings)?)),
            #[cfg(feature = "ovh-svfs")]
            BackendKind::OvhSwift => Ok(Arc::new(ovh(settings)?)),
            #[cfg(feature = "imgur")]
            BackendKind::Imgur => Ok(Arc::new(imgur(settings)?)),
            // Reachable only when the matching feature is compiled out; the
            // capability probe filters these identities before dispatch.
            #[allow(unreachable_patterns)]
            other => Err(Error::Generic(format!(
                "{other} support is not compiled into this build"
            ))),
        }
    }
}

fn require(
    settings: &dyn Settings,
    backend: BackendKind,
    key: &'static str,
) -> Result<String> {
    settings
        .get_non_empty(key)
        .ok_or(Error::Configuration { backend, key })
}

// Settings keys below are the host application's, verbatim.

fn local(settings: &dyn Settings) -> LocalStorage {
    LocalStorage::new(settings.get_or("localPath", "assets/files"))
}

#[cfg(feature = "aws-s3")]
fn aws_s3(settings: &dyn Settings) -> Result<crate::adapters::s3::AwsS3Storage> {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    let access_key = require(settings, BackendKind::AwsS3, "awsS3Key")?;
    let secret = require(settings, BackendKind::AwsS3, "awsS3Secret")?;
    let bucket = require(settings, BackendKind::AwsS3, "awsS3Bucket")?;
    let region = settings.get_or("awsS3Region", "us-east-1");

    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region.clone()))
        .credentials_provider(Credentials::new(access_key, secret, None, None, "static"))
        .build();

    Ok(crate::adapters::s3::AwsS3Storage::new(
        aws_sdk_s3::Client::from_conf(config),
        bucket,
        region,
    ))
}

#[cfg(feature = "aliyun")]
fn aliyun(settings: &dyn Settings) -> Result<crate::adapters::aliyun::AliyunOssStorage> {
    use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};

    use crate::adapters::aliyun::AliyunOssStorage;

    let access_id = require(settings, BackendKind::Aliyun, "aliyunAppid")?;
    let access_key = require(settings, BackendKind::Aliyun, "aliyunKey")?;
    let endpoint = require(settings, BackendKind::Aliyun, "aliyunEndPoint")?;
    let bucket = require(settings, BackendKind::Aliyun, "aliyunBucket")?;

    let region = AliyunOssStorage::region_from_endpoint(&endpoint)
        .unwrap_or_else(|| "cn-hangzhou".to_string());

    let config = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(region))
        .endpoint_url(endpoint.clone())
        .credentials_provider(Credentials::new(access_id, access_key, None, None, "static"))
        .build();

    Ok(AliyunOssStorage::new(
        aws_sdk_s3::Client::from_conf(config),
        bucket,
        endpoint,
    ))
}

#[cfg(feature = "ovh-svfs")]
fn ovh(settings: &dyn Settings) -> Result<crate::adapters::ovh::OvhSwiftStorage> {
    let username = require(settings, BackendKind::OvhSwift, "ovhUsername")?;
    let password = require(settings, BackendKind::OvhSwift, "ovhPassword")?;
    let tenant_id = require(settings, BackendKind::OvhSwift, "ovhTenantId")?;
    let container = require(settings, BackendKind::OvhSwift, "ovhContainer")?;
    let region = settings.get_or("ovhRegion", "BHS1");

    Ok(crate::adapters::ovh::OvhSwiftStorage::new(
        username, password, tenant_id, container, region,
    ))
}

#[cfg(feature = "imgur")]
fn imgur(settings: &dyn Settings) -> Result<crate::adapters::imgur::ImgurStorage> {
    let client_id = require(settings, BackendKind::Imgur, "imgurClientId")?;

    Ok(crate::adapters::imgur::ImgurStorage::new(client_id))
}
