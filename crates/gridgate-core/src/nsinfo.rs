//! Namespace configuration snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The cluster configuration for one namespace, as served by the
/// conscience and reloaded periodically by the proxy.
///
/// Readers always get a whole snapshot: the proxy replaces the value
/// under a mutex, never mutates it in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub chunk_size: i64,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl NamespaceInfo {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            chunk_size: 1,
            options: BTreeMap::new(),
        }
    }
}
