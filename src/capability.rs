//! Capability detection: which backends this deployment can construct.

use std::collections::HashSet;

use crate::identity::BackendKind;

/// The capability table consulted before building a backend.
///
/// Built once at startup: [`detect`](Self::detect) registers every backend
/// whose client support is compiled into this build, and the
/// [`builder`](Self::builder) form lets embedders and tests register an
/// arbitrary set. Probing is side-effect-free and idempotent; absence of a
/// capability is a normal outcome, not an error.
///
/// Local storage has no external client dependency and probes true whatever
/// the table holds.
#[derive(Clone, Debug)]
pub struct Capabilities {
    available: HashSet<BackendKind>,
}

impl Capabilities {
    /// Register the backends supported by this build.
    pub fn detect() -> Self {
        #[allow(unused_mut)]
        let mut builder = Self::builder();
        #[cfg(feature = "aws-s3")]
        {
            builder = builder.with(BackendKind::AwsS3);
        }
        #[cfg(feature = "aliyun")]
        {
            builder = builder.with(BackendKind::Aliyun);
        }
        #[cfg(feature = "ovh-svfs")]
        {
            builder = builder.with(BackendKind::OvhSwift);
        }
        #[cfg(feature = "imgur")]
        {
            builder = builder.with(BackendKind::Imgur);
        }
        builder.build()
    }

    /// Start from an empty table: only local storage probes true.
    pub fn builder() -> CapabilitiesBuilder {
        CapabilitiesBuilder {
            available: HashSet::new(),
        }
    }

    /// Whether `kind` can be constructed in this environment.
    pub fn probe(&self, kind: BackendKind) -> bool {
        kind == BackendKind::Local || self.available.contains(&kind)
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::detect()
    }
}

/// Builder for an explicit capability table.
#[derive(Clone, Debug)]
pub struct CapabilitiesBuilder {
    available: HashSet<BackendKind>,
}

impl CapabilitiesBuilder {
    /// Register `kind` as constructible.
    pub fn with(mut self, kind: BackendKind) -> Self {
        self.available.insert(kind);
        self
    }

    pub fn build(self) -> Capabilities {
        Capabilities {
            available: self.available,
        }
    }
}
