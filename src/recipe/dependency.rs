use serde::Serialize;
use std::fmt;

/// Reference to another recipe, e.g. `cmake-unit/master@smspillaz/cmake-unit`.
///
/// The string is opaque: it is passed to the orchestrator untouched.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct DependencyRef(String);

impl DependencyRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading recipe name (text before the first `/`), for display only
    pub fn name(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }
}

impl fmt::Display for DependencyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
