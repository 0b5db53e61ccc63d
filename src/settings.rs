use std::collections::HashMap;

/// Typed key lookups against the host application's settings store.
///
/// The crate never persists settings itself; embedders implement this over
/// whatever key-value source they have. An empty string counts as an absent
/// key throughout the crate, matching the settings stores this is bound
/// against.
pub trait Settings: Send + Sync {
    /// Raw lookup. `None` when the key is not present.
    fn get(&self, key: &str) -> Option<String>;

    /// Lookup with empty-is-unset semantics.
    fn get_non_empty(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty())
    }

    /// Lookup falling back to `default` when the key is absent or empty.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get_non_empty(key)
            .unwrap_or_else(|| default.to_string())
    }
}

/// An in-memory `Settings` source backed by a string map.
///
/// Intended for tests, local development, and embedders with static
/// configuration.
#[derive(Clone, Debug, Default)]
pub struct MemorySettings {
    entries: HashMap<String, String>,
}

impl MemorySettings {
    /// Create an empty settings source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemorySettings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Settings for MemorySettings {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_value_counts_as_unset() {
        let settings = MemorySettings::new().with("region", "");

        assert_eq!(settings.get("region").as_deref(), Some(""));
        assert_eq!(settings.get_non_empty("region"), None);
        assert_eq!(settings.get_or("region", "us-east-1"), "us-east-1");
    }

    #[test]
    fn present_value_wins_over_default() {
        let settings = MemorySettings::new().with("region", "eu-west-3");

        assert_eq!(settings.get_or("region", "us-east-1"), "eu-west-3");
    }

    #[test]
    fn missing_key_falls_back() {
        let settings = MemorySettings::new();

        assert_eq!(settings.get("bucket"), None);
        assert_eq!(settings.get_or("bucket", "uploads"), "uploads");
    }

    #[test]
    fn collects_from_pairs() {
        let settings: MemorySettings =
            [("a", "1"), ("b", "2")].into_iter().collect();

        assert_eq!(settings.get("a").as_deref(), Some("1"));
        assert_eq!(settings.get("b").as_deref(), Some("2"));
    }
}
