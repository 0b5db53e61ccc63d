//! Backend resolution: identity (or mime type) → ready-to-use adapter.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use crate::capability::Capabilities;
use crate::factory::{AdapterFactory, DefaultFactory};
use crate::identity::BackendKind;
use crate::mime::MimeBindings;
use crate::registry::AdapterRegistry;
use crate::settings::Settings;
use crate::{Error, Result, StorageAdapter};

/// Settings key naming the deployment's default backend identity.
pub const UPLOAD_METHOD_KEY: &str = "uploadMethod";

/// What to do when a candidate's capability probe passes but its factory
/// reports missing configuration.
///
/// The upload feature historically degraded in this case exactly as it does
/// for an absent client library, so [`Degrade`](Self::Degrade) is the
/// default. [`Fail`](Self::Fail) turns a misconfigured-but-capable candidate
/// into a hard error, for deployments that would rather surface the
/// misconfiguration than quietly store files locally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MisconfigurationPolicy {
    /// Continue to the next candidate in the chain.
    #[default]
    Degrade,
    /// Propagate [`Error::Configuration`] to the caller.
    Fail,
}

/// Resolves a requested backend identity (or a mime type) to a constructed
/// [`StorageAdapter`], walking an ordered fallback chain of candidates.
///
/// For each candidate the capability table is probed; the first capable
/// candidate is built and cached in the shared [`AdapterRegistry`] under
/// both the requested and the resolved identity, so resolution for a given
/// identity is idempotent: repeated calls return the same instance for the
/// life of the process.
///
/// The chain always ends at local storage, which has no external dependency,
/// so an optional provider's absence degrades gracefully instead of failing
/// the upload feature.
///
/// ```
/// use std::sync::Arc;
/// use berth::{AdapterRegistry, AdapterResolver, BackendKind, MemorySettings};
///
/// let settings = Arc::new(
///     MemorySettings::new().with("uploadMethod", "local"),
/// );
/// let resolver = AdapterResolver::new(settings, AdapterRegistry::new());
///
/// let adapter = resolver.resolve_for_mime_type("application/pdf")?;
/// assert_eq!(adapter.kind(), BackendKind::Local);
/// # Ok::<(), berth::Error>(())
/// ```
pub struct AdapterResolver {
    settings: Arc<dyn Settings>,
    registry: AdapterRegistry,
    capabilities: Capabilities,
    factory: Arc<dyn AdapterFactory>,
    policy: MisconfigurationPolicy,
    chains: HashMap<BackendKind, Vec<BackendKind>>,
    bindings: MimeBindings,
    default_kind: BackendKind,
}

impl AdapterResolver {
    /// Create a resolver over `settings`, sharing `registry`.
    ///
    /// Capabilities default to what this build supports, construction to the
    /// built-in factory, and each identity's cascade to the fixed priority
    /// order of [`BackendKind::ALL`]. Mime bindings and the default identity
    /// are read from settings once, here.
    pub fn new(settings: Arc<dyn Settings>, registry: AdapterRegistry) -> Self {
        let bindings = MimeBindings::from_settings(settings.as_ref());
        let default_kind = settings
            .get_non_empty(UPLOAD_METHOD_KEY)
            .and_then(|raw| BackendKind::from_str(&raw).ok())
            .unwrap_or(BackendKind::Local);

        Self {
            settings,
            registry,
            capabilities: Capabilities::detect(),
            factory: Arc::new(DefaultFactory),
            policy: MisconfigurationPolicy::default(),
            chains: HashMap::new(),
            bindings,
            default_kind,
        }
    }

    /// Replace the capability table.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Replace the adapter factory.
    pub fn with_factory(mut self, factory: Arc<dyn AdapterFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// Set the misconfiguration policy (default: degrade).
    pub fn with_policy(mut self, policy: MisconfigurationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the fallback candidates tried after `kind`.
    ///
    /// Local storage is appended as the terminal candidate if the given
    /// chain does not already include it.
    pub fn with_chain(mut self, kind: BackendKind, fallbacks: Vec<BackendKind>) -> Self {
        self.chains.insert(kind, fallbacks);
        self
    }

    /// The registry shared by this resolver.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// The identity used when no mime binding matches.
    pub fn default_kind(&self) -> BackendKind {
        self.default_kind
    }

    /// Resolve the adapter for `requested`.
    ///
    /// Cache hits return immediately with no probe and no rebuild.
    /// Otherwise candidates are tried in chain order: the capability probe
    /// filters out backends whose client is unavailable in this deployment,
    /// and a misconfigured candidate cascades or fails per the
    /// [`MisconfigurationPolicy`]. The built adapter is cached under both
    /// the requested and the resolved identity.
    pub fn resolve(&self, requested: BackendKind) -> Result<Arc<dyn StorageAdapter>> {
        if let Some(adapter) = self.registry.get(requested) {
            return Ok(adapter);
        }

        let _guard = self.registry.build_guard();

        // Lost the race: the entry appeared while waiting on the guard.
        if let Some(adapter) = self.registry.get(requested) {
            return Ok(adapter);
        }

        for candidate in self.chain_for(requested) {
            if !self.capabilities.probe(candidate) {
                tracing::debug!(%requested, %candidate, "client unavailable, cascading");
                continue;
            }

            // A candidate already bound for an earlier request is reused
            // without rebuilding.
            if let Some(adapter) = self.registry.get(candidate) {
                self.registry.insert(requested, adapter.clone());
                return Ok(adapter);
            }

            match self.factory.build(candidate, self.settings.as_ref()) {
                Ok(adapter) => {
                    if candidate != requested {
                        tracing::warn!(
                            %requested,
                            resolved = %candidate,
                            "requested backend unavailable, degraded"
                        );
                    }
                    self.registry.insert(candidate, adapter.clone());
                    self.registry.insert(requested, adapter.clone());
                    return Ok(adapter);
                }
                Err(error @ Error::Configuration { .. }) => match self.policy {
                    MisconfigurationPolicy::Degrade => {
                        tracing::warn!(%candidate, %error, "backend misconfigured, cascading");
                        continue;
                    }
                    MisconfigurationPolicy::Fail => return Err(error),
                },
                Err(error) => return Err(error),
            }
        }

        Err(Error::NoCapableBackend(requested))
    }

    /// Resolve the adapter bound to `mime`.
    ///
    /// The first matching configured binding names the identity; unmatched
    /// mime types use the deployment default. Distinct mime types bound to
    /// the same identity share one cached adapter.
    pub fn resolve_for_mime_type(&self, mime: &str) -> Result<Arc<dyn StorageAdapter>> {
        let kind = self.bindings.backend_for(mime).unwrap_or(self.default_kind);
        tracing::debug!(mime, backend = %kind, "mime type bound");
        self.resolve(kind)
    }

    fn chain_for(&self, requested: BackendKind) -> Vec<BackendKind> {
        let mut chain = match self.chains.get(&requested) {
            Some(fallbacks) => {
                let mut chain = vec![requested];
                chain.extend(fallbacks.iter().copied().filter(|kind| *kind != requested));
                chain
            }
            None => default_chain(requested),
        };

        if !chain.contains(&BackendKind::Local) {
            chain.push(BackendKind::Local);
        }

        chain
    }
}

impl std::fmt::Debug for AdapterResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterResolver")
            .field("default_kind", &self.default_kind)
            .field("policy", &self.policy)
            .field("registry", &self.registry)
            .finish()
    }
}

/// The fixed cascade priority order: each identity falls through to the
/// candidates after it in [`BackendKind::ALL`], ending at local.
fn default_chain(requested: BackendKind) -> Vec<BackendKind> {
    let start = BackendKind::ALL
        .iter()
        .position(|kind| *kind == requested)
        .unwrap_or(BackendKind::ALL.len() - 1);

    BackendKind::ALL[start..].to_vec()
}
