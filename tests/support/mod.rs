//! Scripted backends and a ready-made gateway state for integration
//! tests. Every mock records its calls so scenarios can assert on the
//! exact upstream traffic a request produced.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gridgate::route;
use gridgate::{AppState, ProxyConfig};
use gridgate_core::{
    GridError, GridResult, HubUrl, NamespaceInfo, ServiceDescriptor, ServiceUrl,
};
use gridgate_rpc::{Bean, ConscienceClient, ContainerClient, DirectoryClient, LinkMode};
use http::{HeaderMap, Method};
use serde_json::Value;

// Conscience -----------------------------------------------------------------

#[derive(Default)]
pub struct MockConscience {
    pub services: Mutex<HashMap<String, Vec<ServiceDescriptor>>>,
    pub types: Mutex<Vec<String>>,
    pub nsinfo: Mutex<NamespaceInfo>,
    pub list_calls: AtomicUsize,
    pub pushes: Mutex<Vec<Vec<ServiceDescriptor>>>,
    pub cleared: Mutex<Vec<String>>,
}

impl MockConscience {
    pub fn set_services(&self, srvtype: &str, services: Vec<ServiceDescriptor>) {
        self.services
            .lock()
            .unwrap()
            .insert(srvtype.to_string(), services);
    }
}

#[async_trait]
impl ConscienceClient for MockConscience {
    async fn list_services(&self, _ns: &str, srvtype: &str) -> GridResult<Vec<ServiceDescriptor>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .services
            .lock()
            .unwrap()
            .get(srvtype)
            .cloned()
            .unwrap_or_default())
    }

    async fn push_services(
        &self,
        _ns: &str,
        batch: &[ServiceDescriptor],
        _timeout: Duration,
    ) -> GridResult<()> {
        self.pushes.lock().unwrap().push(batch.to_vec());
        Ok(())
    }

    async fn clear_services(&self, _ns: &str, srvtype: &str) -> GridResult<()> {
        self.cleared.lock().unwrap().push(srvtype.to_string());
        Ok(())
    }

    async fn namespace_info(&self, _ns: &str) -> GridResult<NamespaceInfo> {
        Ok(self.nsinfo.lock().unwrap().clone())
    }

    async fn service_types(&self, _ns: &str) -> GridResult<Vec<String>> {
        Ok(self.types.lock().unwrap().clone())
    }
}

// Directory ------------------------------------------------------------------

#[derive(Default)]
pub struct MockDirectory {
    /// `"<ref>|<type>"` to linked service URLs.
    pub linked: Mutex<HashMap<String, Vec<ServiceUrl>>>,
    pub properties: Mutex<BTreeMap<String, String>>,
    pub references: Mutex<HashSet<String>>,
    pub list_calls: AtomicUsize,
    pub link_calls: Mutex<Vec<(String, String)>>,
}

impl MockDirectory {
    pub fn link(&self, reference: &str, srvtype: &str, urls: Vec<ServiceUrl>) {
        self.linked
            .lock()
            .unwrap()
            .insert(format!("{}|{}", reference, srvtype), urls);
    }
}

#[async_trait]
impl DirectoryClient for MockDirectory {
    async fn list_services(
        &self,
        _dir: &str,
        url: &HubUrl,
        srvtype: &str,
    ) -> GridResult<Vec<ServiceUrl>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}|{}", url.reference().unwrap_or(""), srvtype);
        Ok(self
            .linked
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }

    async fn link_service(
        &self,
        _dir: &str,
        url: &HubUrl,
        srvtype: &str,
        mode: LinkMode,
    ) -> GridResult<Vec<ServiceUrl>> {
        self.link_calls
            .lock()
            .unwrap()
            .push((srvtype.to_string(), mode.as_str().to_string()));
        let linked = ServiceUrl::new(1, "10.0.0.9:6010", "");
        self.link(url.reference().unwrap_or(""), srvtype, vec![linked.clone()]);
        Ok(vec![linked])
    }

    async fn create_reference(&self, _dir: &str, url: &HubUrl) -> GridResult<()> {
        let reference = url.reference().unwrap_or("").to_string();
        if !self.references.lock().unwrap().insert(reference) {
            return Err(GridError::new(433, "Reference already created"));
        }
        Ok(())
    }

    async fn destroy_reference(&self, _dir: &str, url: &HubUrl) -> GridResult<()> {
        let reference = url.reference().unwrap_or("");
        if !self.references.lock().unwrap().remove(reference) {
            return Err(GridError::not_found("Reference not found"));
        }
        Ok(())
    }

    async fn get_properties(
        &self,
        _dir: &str,
        _url: &HubUrl,
        keys: &[String],
    ) -> GridResult<BTreeMap<String, String>> {
        let all = self.properties.lock().unwrap();
        if keys.is_empty() {
            return Ok(all.clone());
        }
        Ok(keys
            .iter()
            .filter_map(|k| all.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }

    async fn set_properties(
        &self,
        _dir: &str,
        _url: &HubUrl,
        pairs: &BTreeMap<String, String>,
    ) -> GridResult<()> {
        self.properties.lock().unwrap().extend(pairs.clone());
        Ok(())
    }

    async fn delete_properties(
        &self,
        _dir: &str,
        _url: &HubUrl,
        keys: &[String],
    ) -> GridResult<()> {
        let mut all = self.properties.lock().unwrap();
        for k in keys {
            all.remove(k);
        }
        Ok(())
    }
}

// Container ------------------------------------------------------------------

#[derive(Default)]
pub struct MockContainer {
    /// Beans answered by list/get.
    pub beans: Mutex<Vec<Bean>>,
    /// Hosts that fail with a transport error.
    pub down_hosts: Mutex<HashSet<String>>,
    /// Application error answered by every host, when set.
    pub app_error: Mutex<Option<GridError>>,
    /// `(operation, host)` log.
    pub calls: Mutex<Vec<(String, String)>>,
    pub dedup_report: Mutex<Option<String>>,
}

impl MockContainer {
    fn gate(&self, op: &str, host: &str) -> GridResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((op.to_string(), host.to_string()));
        if self.down_hosts.lock().unwrap().contains(host) {
            return Err(GridError::network("connection refused"));
        }
        if let Some(e) = self.app_error.lock().unwrap().clone() {
            return Err(e);
        }
        Ok(())
    }

    fn answer_beans(&self, op: &str, host: &str) -> GridResult<Vec<Bean>> {
        self.gate(op, host)?;
        Ok(self.beans.lock().unwrap().clone())
    }

    pub fn calls_for(&self, op: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(o, _)| o == op)
            .map(|(_, h)| h.clone())
            .collect()
    }
}

#[async_trait]
impl ContainerClient for MockContainer {
    async fn create(
        &self,
        m2: &str,
        _url: &HubUrl,
        _stgpol: Option<&str>,
        _verpol: Option<&str>,
    ) -> GridResult<()> {
        self.gate("create", m2)
    }

    async fn list(&self, m2: &str, _url: &HubUrl) -> GridResult<Vec<Bean>> {
        self.answer_beans("list", m2)
    }

    async fn has(&self, m2: &str, _url: &HubUrl) -> GridResult<()> {
        self.gate("has", m2)
    }

    async fn destroy(&self, m2: &str, _url: &HubUrl) -> GridResult<()> {
        self.gate("destroy", m2)
    }

    async fn purge(&self, m2: &str, _url: &HubUrl) -> GridResult<Vec<Bean>> {
        self.answer_beans("purge", m2)
    }

    async fn dedup(&self, m2: &str, _url: &HubUrl) -> GridResult<Option<String>> {
        self.gate("dedup", m2)?;
        Ok(self.dedup_report.lock().unwrap().clone())
    }

    async fn set_storage_policy(
        &self,
        m2: &str,
        _url: &HubUrl,
        _policy: &str,
    ) -> GridResult<Vec<Bean>> {
        self.answer_beans("stgpol", m2)
    }

    async fn touch(&self, m2: &str, _url: &HubUrl) -> GridResult<()> {
        self.gate("touch", m2)
    }

    async fn get_content(&self, m2: &str, _url: &HubUrl) -> GridResult<Vec<Bean>> {
        self.answer_beans("get", m2)
    }

    async fn put_content(&self, m2: &str, _url: &HubUrl, beans: &[Bean]) -> GridResult<Vec<Bean>> {
        self.gate("put", m2)?;
        Ok(beans.to_vec())
    }

    async fn append_content(
        &self,
        m2: &str,
        _url: &HubUrl,
        beans: &[Bean],
    ) -> GridResult<Vec<Bean>> {
        self.gate("append", m2)?;
        Ok(beans.to_vec())
    }

    async fn delete_content(&self, m2: &str, _url: &HubUrl) -> GridResult<Vec<Bean>> {
        self.answer_beans("delete", m2)
    }

    async fn generate_beans(
        &self,
        m2: &str,
        _url: &HubUrl,
        _size: i64,
        _policy: Option<&str>,
    ) -> GridResult<Vec<Bean>> {
        self.answer_beans("beans", m2)
    }

    async fn spare_chunks(
        &self,
        m2: &str,
        _url: &HubUrl,
        _policy: Option<&str>,
        _notin: &[Bean],
        _broken: &[Bean],
    ) -> GridResult<Vec<Bean>> {
        self.answer_beans("spare", m2)
    }

    async fn copy_content(&self, m2: &str, _url: &HubUrl, _target: &str) -> GridResult<()> {
        self.gate("copy", m2)
    }
}

// Environment ----------------------------------------------------------------

pub struct TestEnv {
    pub state: Arc<AppState>,
    pub conscience: Arc<MockConscience>,
    pub directory: Arc<MockDirectory>,
    pub container: Arc<MockContainer>,
}

/// A gateway for namespace `NS1` with one directory replica and one
/// meta2 linked under reference `R1`.
pub fn env() -> TestEnv {
    let conscience = Arc::new(MockConscience::default());
    conscience.set_services(
        "meta1",
        vec![ServiceDescriptor::new("NS1", "meta1", "127.0.0.1:6001", 100)],
    );
    *conscience.types.lock().unwrap() =
        vec!["meta1".to_string(), "meta2".to_string(), "rawx".to_string()];
    *conscience.nsinfo.lock().unwrap() = NamespaceInfo::new("NS1");

    let directory = Arc::new(MockDirectory::default());
    directory.link("R1", "meta2", vec![ServiceUrl::new(1, "127.0.0.1:6010", "")]);

    let container = Arc::new(MockContainer::default());

    let config = ProxyConfig {
        namespace: "NS1".to_string(),
        ..ProxyConfig::default()
    };
    let state = AppState::new(
        config,
        conscience.clone(),
        directory.clone(),
        container.clone(),
    );
    state.set_srvtypes(vec![
        "meta1".to_string(),
        "meta2".to_string(),
        "rawx".to_string(),
    ]);

    TestEnv {
        state,
        conscience,
        directory,
        container,
    }
}

pub async fn call(env: &TestEnv, method: &str, uri: &str) -> gridgate::reply::Reply {
    call_full(env, method, uri, HeaderMap::new(), "").await
}

pub async fn call_body(
    env: &TestEnv,
    method: &str,
    uri: &str,
    body: &str,
) -> gridgate::reply::Reply {
    call_full(env, method, uri, HeaderMap::new(), body).await
}

pub async fn call_full(
    env: &TestEnv,
    method: &str,
    uri: &str,
    headers: HeaderMap,
    body: &str,
) -> gridgate::reply::Reply {
    let method = Method::from_bytes(method.as_bytes()).unwrap();
    route::dispatch(
        env.state.clone(),
        &method,
        uri,
        headers,
        Bytes::from(body.to_string()),
    )
    .await
}

pub fn body_json(reply: &gridgate::reply::Reply) -> Value {
    serde_json::from_slice(&reply.body).expect("JSON body")
}
