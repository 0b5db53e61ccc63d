//! Shared test doubles for resolver and registry tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use berth::{AdapterFactory, BackendKind, Error, Result, Settings, StorageAdapter};
use bytes::Bytes;

/// Minimal adapter standing in for a real backend.
#[derive(Debug)]
pub struct StubAdapter {
    kind: BackendKind,
}

impl StubAdapter {
    pub fn new(kind: BackendKind) -> Self {
        Self { kind }
    }
}

#[async_trait::async_trait]
impl StorageAdapter for StubAdapter {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    async fn store(&self, key: &str, _data: Bytes) -> Result<String> {
        Ok(key.to_string())
    }

    async fn retrieve(&self, key: &str) -> Result<Bytes> {
        Err(Error::NotFound(key.to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Ok(())
    }

    async fn exists(&self, _key: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Factory that counts constructions and remembers nothing else.
#[derive(Debug, Default)]
pub struct CountingFactory {
    builds: AtomicUsize,
}

impl CountingFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Total constructions across all identities.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

impl AdapterFactory for CountingFactory {
    fn build(
        &self,
        kind: BackendKind,
        _settings: &dyn Settings,
    ) -> Result<Arc<dyn StorageAdapter>> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubAdapter::new(kind)))
    }
}

/// Factory whose non-local builds always report missing configuration.
#[derive(Debug, Default)]
pub struct MisconfiguredFactory;

impl AdapterFactory for MisconfiguredFactory {
    fn build(
        &self,
        kind: BackendKind,
        _settings: &dyn Settings,
    ) -> Result<Arc<dyn StorageAdapter>> {
        if kind == BackendKind::Local {
            Ok(Arc::new(StubAdapter::new(kind)))
        } else {
            Err(Error::Configuration {
                backend: kind,
                key: "apiKey",
            })
        }
    }
}
