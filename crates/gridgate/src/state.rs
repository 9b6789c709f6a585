//! Process-wide state shared by handlers and background tasks.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use gridgate_core::{GridResult, HubUrl, NamespaceInfo};
use gridgate_lb::LbPool;
use gridgate_push::PushQueue;
use gridgate_resolver::{DirectoryBackend, Resolver};
use gridgate_rpc::{ConscienceClient, ContainerClient, DirectoryClient};

use crate::config::ProxyConfig;
use crate::counters::Counters;
use crate::SRVTYPE_META1;

/// Everything a request handler can reach.
///
/// The mutable pieces (`nsinfo`, `srvtypes`) are whole snapshots behind
/// a mutex, replaced by the admin queue; readers clone the `Arc` and
/// never observe a half-updated value.
pub struct AppState {
    pub config: ProxyConfig,
    pub resolver: Arc<Resolver>,
    pub lb: Arc<LbPool>,
    pub push: Arc<PushQueue>,
    pub conscience: Arc<dyn ConscienceClient>,
    pub directory: Arc<dyn DirectoryClient>,
    pub container: Arc<dyn ContainerClient>,
    pub counters: Counters,
    nsinfo: Mutex<Arc<NamespaceInfo>>,
    srvtypes: Mutex<Arc<Vec<String>>>,
    started: Instant,
}

impl AppState {
    pub fn new(
        config: ProxyConfig,
        conscience: Arc<dyn ConscienceClient>,
        directory: Arc<dyn DirectoryClient>,
        container: Arc<dyn ContainerClient>,
    ) -> Arc<Self> {
        let discovery = Arc::new(GridDiscovery {
            conscience: conscience.clone(),
            directory: directory.clone(),
        });
        let resolver = Arc::new(Resolver::new(discovery, config.resolver_config()));
        let nsinfo = NamespaceInfo::new(&config.namespace);
        Arc::new(Self {
            resolver,
            lb: Arc::new(LbPool::new()),
            push: Arc::new(PushQueue::new()),
            conscience,
            directory,
            container,
            counters: Counters::default(),
            nsinfo: Mutex::new(Arc::new(nsinfo)),
            srvtypes: Mutex::new(Arc::new(Vec::new())),
            started: Instant::now(),
            config,
        })
    }

    pub fn ns_name(&self) -> &str {
        &self.config.namespace
    }

    /// Whether a request namespace is the one this gateway serves.
    pub fn validate_namespace(&self, ns: &str) -> bool {
        ns == self.config.namespace
    }

    /// Whether a service type is part of the last reloaded type list.
    pub fn validate_srvtype(&self, srvtype: &str) -> bool {
        self.srvtypes().iter().any(|t| t == srvtype)
    }

    pub fn srvtypes(&self) -> Arc<Vec<String>> {
        self.srvtypes.lock().unwrap().clone()
    }

    pub fn set_srvtypes(&self, types: Vec<String>) {
        *self.srvtypes.lock().unwrap() = Arc::new(types);
    }

    pub fn nsinfo(&self) -> Arc<NamespaceInfo> {
        self.nsinfo.lock().unwrap().clone()
    }

    pub fn set_nsinfo(&self, info: NamespaceInfo) {
        *self.nsinfo.lock().unwrap() = Arc::new(info);
    }

    /// Seconds since the process started; the clock stamped on cache
    /// entries and registration heartbeats.
    pub fn monotonic_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn lb_enabled(&self) -> bool {
        self.config.lb_enabled()
    }
}

/// Resolver discovery over the real collaborators: the directory set of
/// a namespace comes from the conscience's meta1 listing (best scores
/// first), reference bindings from the directory replicas themselves.
pub struct GridDiscovery {
    conscience: Arc<dyn ConscienceClient>,
    directory: Arc<dyn DirectoryClient>,
}

#[async_trait]
impl DirectoryBackend for GridDiscovery {
    async fn directory_urls(&self, ns: &str) -> GridResult<Vec<String>> {
        let mut services = self.conscience.list_services(ns, SRVTYPE_META1).await?;
        services.sort_by(|a, b| b.score.cmp(&a.score));
        Ok(services.into_iter().map(|s| s.addr).collect())
    }

    async fn reference_services(
        &self,
        dir_addr: &str,
        url: &HubUrl,
        srvtype: &str,
    ) -> GridResult<Vec<String>> {
        let urls = self.directory.list_services(dir_addr, url, srvtype).await?;
        Ok(urls.iter().map(ToString::to_string).collect())
    }
}
