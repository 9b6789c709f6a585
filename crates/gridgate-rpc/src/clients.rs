//! Client traits over the three internal service classes.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use gridgate_core::{GridResult, HubUrl, NamespaceInfo, ServiceDescriptor, ServiceUrl};

use crate::beans::Bean;

/// How a service link request mutates the directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Link a service if none is linked yet.
    Link,
    /// Replace whatever is linked.
    Force,
    /// Renew the link (new sequence number).
    Renew,
}

impl LinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkMode::Link => "link",
            LinkMode::Force => "force",
            LinkMode::Renew => "renew",
        }
    }
}

/// The cluster registry.
#[async_trait]
pub trait ConscienceClient: Send + Sync {
    /// Every known service of one type, with scores and tags.
    async fn list_services(&self, ns: &str, srvtype: &str) -> GridResult<Vec<ServiceDescriptor>>;

    /// One bulk registration push, bounded by `timeout`.
    async fn push_services(
        &self,
        ns: &str,
        batch: &[ServiceDescriptor],
        timeout: Duration,
    ) -> GridResult<()>;

    /// Deregisters every service of one type.
    async fn clear_services(&self, ns: &str, srvtype: &str) -> GridResult<()>;

    async fn namespace_info(&self, ns: &str) -> GridResult<NamespaceInfo>;

    /// The service types the namespace manages.
    async fn service_types(&self, ns: &str) -> GridResult<Vec<String>>;
}

/// One directory (meta1) replica; the address is passed per call, the
/// resolver and handlers drive the replica walk.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn list_services(
        &self,
        dir: &str,
        url: &HubUrl,
        srvtype: &str,
    ) -> GridResult<Vec<ServiceUrl>>;

    async fn link_service(
        &self,
        dir: &str,
        url: &HubUrl,
        srvtype: &str,
        mode: LinkMode,
    ) -> GridResult<Vec<ServiceUrl>>;

    async fn create_reference(&self, dir: &str, url: &HubUrl) -> GridResult<()>;

    async fn destroy_reference(&self, dir: &str, url: &HubUrl) -> GridResult<()>;

    async fn get_properties(
        &self,
        dir: &str,
        url: &HubUrl,
        keys: &[String],
    ) -> GridResult<BTreeMap<String, String>>;

    async fn set_properties(
        &self,
        dir: &str,
        url: &HubUrl,
        pairs: &BTreeMap<String, String>,
    ) -> GridResult<()>;

    async fn delete_properties(&self, dir: &str, url: &HubUrl, keys: &[String]) -> GridResult<()>;
}

/// One container metadata (meta2) replica.
#[async_trait]
pub trait ContainerClient: Send + Sync {
    async fn create(
        &self,
        m2: &str,
        url: &HubUrl,
        stgpol: Option<&str>,
        verpol: Option<&str>,
    ) -> GridResult<()>;

    async fn list(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>>;

    async fn has(&self, m2: &str, url: &HubUrl) -> GridResult<()>;

    async fn destroy(&self, m2: &str, url: &HubUrl) -> GridResult<()>;

    async fn purge(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>>;

    /// Runs the deduplication and returns the backend's report, if any.
    async fn dedup(&self, m2: &str, url: &HubUrl) -> GridResult<Option<String>>;

    async fn set_storage_policy(&self, m2: &str, url: &HubUrl, policy: &str)
        -> GridResult<Vec<Bean>>;

    /// Touches the container, or the content when the URL has a path.
    async fn touch(&self, m2: &str, url: &HubUrl) -> GridResult<()>;

    async fn get_content(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>>;

    async fn put_content(&self, m2: &str, url: &HubUrl, beans: &[Bean]) -> GridResult<Vec<Bean>>;

    async fn append_content(&self, m2: &str, url: &HubUrl, beans: &[Bean])
        -> GridResult<Vec<Bean>>;

    async fn delete_content(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>>;

    /// Asks the backend to place `size` bytes under the given policy and
    /// answer the chunk beans to upload to.
    async fn generate_beans(
        &self,
        m2: &str,
        url: &HubUrl,
        size: i64,
        policy: Option<&str>,
    ) -> GridResult<Vec<Bean>>;

    /// Spare chunk selection: replacements for `broken`, avoiding `notin`.
    async fn spare_chunks(
        &self,
        m2: &str,
        url: &HubUrl,
        policy: Option<&str>,
        notin: &[Bean],
        broken: &[Bean],
    ) -> GridResult<Vec<Bean>>;

    async fn copy_content(&self, m2: &str, url: &HubUrl, target: &str) -> GridResult<()>;
}
