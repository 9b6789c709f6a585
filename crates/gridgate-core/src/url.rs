//! Logical resource names.

use std::collections::BTreeMap;
use std::fmt;

/// The logical name a request addresses: `namespace/reference/path`,
/// an optional version, and a free-form options mapping.
///
/// Options carry everything that is not part of the hierarchy itself
/// (`stgpol`, `verpol`, `size`, `policy`, `stgcls`, `key`, `tagk`,
/// `tagv`, `action`), whether it arrived as a path token or a query
/// argument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubUrl {
    ns: Option<String>,
    reference: Option<String>,
    path: Option<String>,
    version: Option<String>,
    options: BTreeMap<String, String>,
}

impl HubUrl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for `(ns, reference)` pairs.
    pub fn with_ref(ns: &str, reference: &str) -> Self {
        let mut u = Self::new();
        u.set_ns(ns);
        u.set_reference(reference);
        u
    }

    fn non_empty(v: &str) -> Option<String> {
        if v.is_empty() {
            None
        } else {
            Some(v.to_string())
        }
    }

    pub fn set_ns(&mut self, v: &str) {
        self.ns = Self::non_empty(v);
    }

    pub fn set_reference(&mut self, v: &str) {
        self.reference = Self::non_empty(v);
    }

    pub fn set_path(&mut self, v: &str) {
        self.path = Self::non_empty(v);
    }

    pub fn set_version(&mut self, v: &str) {
        self.version = Self::non_empty(v);
    }

    /// Sets an option; an empty value removes the option.
    pub fn set_option(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.options.remove(key);
        } else {
            self.options.insert(key.to_string(), value.to_string());
        }
    }

    pub fn ns(&self) -> Option<&str> {
        self.ns.as_deref()
    }

    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn has_ns(&self) -> bool {
        self.ns.is_some()
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    pub fn has_path(&self) -> bool {
        self.path.is_some()
    }
}

impl fmt::Display for HubUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.ns.as_deref().unwrap_or(""),
            self.reference.as_deref().unwrap_or(""),
            self.path.as_deref().unwrap_or("")
        )
    }
}
