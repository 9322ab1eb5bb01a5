//! Request environment access.
//!
//! CGI hands request metadata to the process as environment variables.
//! [`ServerVars`] looks each name up on demand with no caching, and an absent
//! variable is an explicit `None`.

use std::collections::HashMap;

/// Source of named request environment values.
pub trait EnvSource {
    /// Look up `name`, returning `None` when it is not set.
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the live process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var_os(name).map(|value| value.to_string_lossy().into_owned())
    }
}

/// In-memory environment, used when embedding the shim or in tests.
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    vars: HashMap<String, String>,
}

impl MapEnv {
    /// Construct an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, returning the environment for chaining.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// The `$_SERVER` superglobal.
pub struct ServerVars {
    source: Box<dyn EnvSource>,
}

impl ServerVars {
    /// Wrap an environment source.
    #[must_use]
    pub fn new(source: impl EnvSource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Fetch `name` from the underlying source.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.source.var(name)
    }

    /// Whether `name` is present at all, regardless of its value.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

impl std::fmt::Debug for ServerVars {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerVars").finish_non_exhaustive()
    }
}
