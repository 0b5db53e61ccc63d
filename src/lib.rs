//! Storage backend resolution and binding for file uploads.
//!
//! A file-upload feature usually supports several interchangeable storage
//! destinations (local disk, object-storage providers, image-hosting APIs),
//! selected globally or per content-type. This crate maps a configured
//! backend identity to a constructed, ready-to-use [`StorageAdapter`]:
//!
//! - [`Capabilities`] knows which backends this deployment can construct,
//! - [`AdapterResolver`] walks an ordered fallback chain until a capable
//!   candidate builds, so an absent optional provider degrades gracefully
//!   instead of failing the upload,
//! - [`AdapterRegistry`] caches each constructed adapter so an identity is
//!   built at most once per process.
//!
//! ```
//! use std::sync::Arc;
//! use berth::{AdapterRegistry, AdapterResolver, BackendKind, MemorySettings};
//!
//! let settings = Arc::new(
//!     MemorySettings::new()
//!         .with("uploadMethod", "local")
//!         .with("localPath", "assets/files"),
//! );
//! let resolver = AdapterResolver::new(settings, AdapterRegistry::new());
//!
//! let adapter = resolver.resolve(BackendKind::Local)?;
//! assert_eq!(adapter.kind(), BackendKind::Local);
//!
//! // Repeated resolutions return the same cached instance.
//! let again = resolver.resolve(BackendKind::Local)?;
//! assert!(Arc::ptr_eq(&adapter, &again));
//! # Ok::<(), berth::Error>(())
//! ```

use std::fmt::Debug;

use bytes::Bytes;

pub mod capability;
pub mod factory;
pub mod identity;
pub mod mime;
pub mod registry;
pub mod resolver;
pub mod settings;

/// Adapter modules, gated behind Cargo features.
pub mod adapters {
    #[cfg(feature = "aliyun")]
    pub mod aliyun;
    #[cfg(feature = "imgur")]
    pub mod imgur;
    pub mod local;
    #[cfg(feature = "ovh-svfs")]
    pub mod ovh;
    #[cfg(feature = "aws-s3")]
    pub mod s3;
}

#[cfg(feature = "aliyun")]
pub use adapters::aliyun::AliyunOssStorage;
#[cfg(feature = "imgur")]
pub use adapters::imgur::ImgurStorage;
pub use adapters::local::LocalStorage;
#[cfg(feature = "ovh-svfs")]
pub use adapters::ovh::OvhSwiftStorage;
#[cfg(feature = "aws-s3")]
pub use adapters::s3::AwsS3Storage;

pub use capability::Capabilities;
pub use factory::{AdapterFactory, DefaultFactory};
pub use identity::BackendKind;
pub use mime::{MimeBinding, MimeBindings};
pub use registry::AdapterRegistry;
pub use resolver::{AdapterResolver, MisconfigurationPolicy};
pub use settings::{MemorySettings, Settings};

/// A specialized Result type for storage operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A unified Error type for resolution and adapter operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// A required setting for a backend is missing or empty.
    ///
    /// During resolution this cascades or propagates according to the
    /// resolver's [`MisconfigurationPolicy`].
    #[error("Missing or empty setting `{key}` for `{backend}` storage")]
    Configuration {
        backend: BackendKind,
        key: &'static str,
    },

    /// No candidate in the fallback chain could be constructed.
    ///
    /// The terminal local candidate is expected to always succeed, so this
    /// surfacing means the upload cannot proceed at all.
    #[error("No capable storage backend for `{0}`")]
    NoCapableBackend(BackendKind),

    #[error("Storage backend connection error")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("IO Error")]
    Io(#[from] std::io::Error),

    #[error("Generic storage error: {0}")]
    Generic(String),
}

/// The uniform surface of a constructed storage backend.
///
/// One implementation per backend identity, interchangeable from the
/// caller's point of view: the upload layer receives an
/// `Arc<dyn StorageAdapter>` from the resolver and never needs to know which
/// destination it writes to.
#[async_trait::async_trait]
pub trait StorageAdapter: Send + Sync + Debug {
    /// The identity this adapter was constructed for.
    fn kind(&self) -> BackendKind;

    /// Store `data` under `key`, returning the object's public location
    /// (a URL for remote backends, the object key for local storage).
    async fn store(&self, key: &str, data: Bytes) -> Result<String>;

    /// Retrieve the bytes stored under `key`.
    async fn retrieve(&self, key: &str) -> Result<Bytes>;

    /// Delete the object under `key`. Idempotent (returns `Ok(())` if
    /// already deleted).
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if an object exists under `key`.
    async fn exists(&self, key: &str) -> Result<bool>;
}
