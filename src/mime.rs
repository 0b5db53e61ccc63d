//! Mime-type → backend bindings, sourced from configuration.

use std::str::FromStr;

use crate::identity::BackendKind;
use crate::settings::Settings;

/// Settings key holding the ordered mime-type bindings.
pub const MIME_TYPES_KEY: &str = "mimeTypes";

/// A single `pattern|backend` line from the mime-type configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MimeBinding {
    pattern: String,
    backend: BackendKind,
}

impl MimeBinding {
    pub fn new(pattern: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            pattern: pattern.into(),
            backend,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    /// Whether this binding's pattern covers `mime`.
    ///
    /// Patterns are an exact mime type (`image/png`), a prefix wildcard
    /// (`image/*`), or the catch-all `*`.
    fn matches(&self, mime: &str) -> bool {
        match self.pattern.strip_suffix('*') {
            Some(prefix) => mime.starts_with(prefix),
            None => self.pattern == mime,
        }
    }
}

/// The ordered mime-type bindings, read-only after parse.
#[derive(Clone, Debug, Default)]
pub struct MimeBindings {
    bindings: Vec<MimeBinding>,
}

impl MimeBindings {
    /// Parse bindings from the [`MIME_TYPES_KEY`] setting.
    pub fn from_settings(settings: &dyn Settings) -> Self {
        Self::parse(&settings.get_or(MIME_TYPES_KEY, ""))
    }

    /// Parse one binding per line, `pattern|backend`.
    ///
    /// Lines that do not parse are skipped with a warning; binding order is
    /// configuration order.
    pub fn parse(raw: &str) -> Self {
        let mut bindings = Vec::new();

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let Some((pattern, backend)) = line.split_once('|') else {
                tracing::warn!(line, "skipping mime binding without a backend");
                continue;
            };

            match BackendKind::from_str(backend.trim()) {
                Ok(kind) => bindings.push(MimeBinding::new(pattern.trim(), kind)),
                Err(_) => {
                    tracing::warn!(line, "skipping mime binding with unknown backend");
                }
            }
        }

        Self { bindings }
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MimeBinding> {
        self.bindings.iter()
    }

    /// The backend bound to `mime`: first matching binding, in
    /// configuration order.
    pub fn backend_for(&self, mime: &str) -> Option<BackendKind> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(mime))
            .map(|binding| binding.backend())
    }
}
