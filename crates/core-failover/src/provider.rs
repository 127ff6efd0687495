//! Provider identity

use std::fmt;
use std::sync::Arc;

/// Opaque identifier of one upstream provider (e.g. a geocoding service).
///
/// Identity only: two providers are the same provider when their names match.
/// Cloning is cheap, so the orchestrator hands owned copies to operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Provider(Arc<str>);

impl Provider {
    /// Create a provider identifier from its name
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// The provider name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Provider {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Provider {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

impl AsRef<str> for Provider {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_name() {
        let a = Provider::new("mapbox");
        let b: Provider = String::from("mapbox").into();
        assert_eq!(a, b);
        assert_ne!(a, Provider::from("google"));
        assert_eq!(a.to_string(), "mapbox");
        assert_eq!(b.name(), "mapbox");
    }
}
