//! Concrete clients speaking the framed channel.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gridgate_core::{GridError, GridResult, HubUrl, NamespaceInfo, ServiceDescriptor, ServiceUrl};
use serde_json::{json, Value};

use crate::beans::{beans_to_sections, decode_sections, Bean};
use crate::channel::RpcChannel;
use crate::clients::{ConscienceClient, ContainerClient, DirectoryClient, LinkMode};

fn url_params(url: &HubUrl) -> Value {
    json!({
        "ns": url.ns(),
        "ref": url.reference(),
        "path": url.path(),
        "version": url.version(),
    })
}

fn result_beans(result: Value) -> GridResult<Vec<Bean>> {
    if result.is_null() {
        return Ok(Vec::new());
    }
    decode_sections(&result).map_err(|e| e.with_code(gridgate_core::CODE_INTERNAL))
}

fn decode<T: serde::de::DeserializeOwned>(result: Value, what: &str) -> GridResult<T> {
    serde_json::from_value(result)
        .map_err(|e| GridError::internal(format!("Malformed {} reply: {}", what, e)))
}

/// Conscience client bound to the registry address of one namespace.
pub struct GridConscience {
    addr: String,
    channel: Arc<RpcChannel>,
}

impl GridConscience {
    pub fn new(addr: &str, channel: Arc<RpcChannel>) -> Self {
        Self {
            addr: addr.to_string(),
            channel,
        }
    }
}

#[async_trait]
impl ConscienceClient for GridConscience {
    async fn list_services(&self, ns: &str, srvtype: &str) -> GridResult<Vec<ServiceDescriptor>> {
        let result = self
            .channel
            .call(&self.addr, "cs.list", json!({"ns": ns, "type": srvtype}))
            .await?;
        decode(result, "service list")
    }

    async fn push_services(
        &self,
        ns: &str,
        batch: &[ServiceDescriptor],
        timeout: Duration,
    ) -> GridResult<()> {
        let params = json!({"ns": ns, "services": batch});
        self.channel
            .call_deadline(&self.addr, "cs.push", params, timeout)
            .await
            .map(|_| ())
    }

    async fn clear_services(&self, ns: &str, srvtype: &str) -> GridResult<()> {
        self.channel
            .call(&self.addr, "cs.clear", json!({"ns": ns, "type": srvtype}))
            .await
            .map(|_| ())
    }

    async fn namespace_info(&self, ns: &str) -> GridResult<NamespaceInfo> {
        let result = self
            .channel
            .call(&self.addr, "cs.info", json!({"ns": ns}))
            .await?;
        decode(result, "namespace info")
    }

    async fn service_types(&self, ns: &str) -> GridResult<Vec<String>> {
        let result = self
            .channel
            .call(&self.addr, "cs.types", json!({"ns": ns}))
            .await?;
        decode(result, "service types")
    }
}

/// Directory client; the replica address comes with each call.
pub struct GridDirectory {
    channel: Arc<RpcChannel>,
}

impl GridDirectory {
    pub fn new(channel: Arc<RpcChannel>) -> Self {
        Self { channel }
    }

    fn unpack_urls(result: Value) -> GridResult<Vec<ServiceUrl>> {
        let packed: Vec<String> = decode(result, "directory entry list")?;
        packed
            .iter()
            .map(|s| s.parse::<ServiceUrl>())
            .collect::<Result<Vec<_>, _>>()
    }
}

#[async_trait]
impl DirectoryClient for GridDirectory {
    async fn list_services(
        &self,
        dir: &str,
        url: &HubUrl,
        srvtype: &str,
    ) -> GridResult<Vec<ServiceUrl>> {
        let params = json!({"url": url_params(url), "type": srvtype});
        Self::unpack_urls(self.channel.call(dir, "dir.services", params).await?)
    }

    async fn link_service(
        &self,
        dir: &str,
        url: &HubUrl,
        srvtype: &str,
        mode: LinkMode,
    ) -> GridResult<Vec<ServiceUrl>> {
        let params = json!({
            "url": url_params(url),
            "type": srvtype,
            "mode": mode.as_str(),
        });
        Self::unpack_urls(self.channel.call(dir, "dir.link", params).await?)
    }

    async fn create_reference(&self, dir: &str, url: &HubUrl) -> GridResult<()> {
        self.channel
            .call(dir, "dir.create", json!({"url": url_params(url)}))
            .await
            .map(|_| ())
    }

    async fn destroy_reference(&self, dir: &str, url: &HubUrl) -> GridResult<()> {
        self.channel
            .call(dir, "dir.destroy", json!({"url": url_params(url)}))
            .await
            .map(|_| ())
    }

    async fn get_properties(
        &self,
        dir: &str,
        url: &HubUrl,
        keys: &[String],
    ) -> GridResult<BTreeMap<String, String>> {
        let params = json!({"url": url_params(url), "keys": keys});
        decode(
            self.channel.call(dir, "dir.prop_get", params).await?,
            "property map",
        )
    }

    async fn set_properties(
        &self,
        dir: &str,
        url: &HubUrl,
        pairs: &BTreeMap<String, String>,
    ) -> GridResult<()> {
        let params = json!({"url": url_params(url), "pairs": pairs});
        self.channel
            .call(dir, "dir.prop_set", params)
            .await
            .map(|_| ())
    }

    async fn delete_properties(&self, dir: &str, url: &HubUrl, keys: &[String]) -> GridResult<()> {
        let params = json!({"url": url_params(url), "keys": keys});
        self.channel
            .call(dir, "dir.prop_del", params)
            .await
            .map(|_| ())
    }
}

/// Container metadata client; the replica address comes with each call.
pub struct GridContainer {
    channel: Arc<RpcChannel>,
}

impl GridContainer {
    pub fn new(channel: Arc<RpcChannel>) -> Self {
        Self { channel }
    }
}

#[async_trait]
impl ContainerClient for GridContainer {
    async fn create(
        &self,
        m2: &str,
        url: &HubUrl,
        stgpol: Option<&str>,
        verpol: Option<&str>,
    ) -> GridResult<()> {
        let params = json!({
            "url": url_params(url),
            "stgpol": stgpol,
            "verpol": verpol,
        });
        self.channel.call(m2, "m2.create", params).await.map(|_| ())
    }

    async fn list(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>> {
        result_beans(
            self.channel
                .call(m2, "m2.list", json!({"url": url_params(url)}))
                .await?,
        )
    }

    async fn has(&self, m2: &str, url: &HubUrl) -> GridResult<()> {
        self.channel
            .call(m2, "m2.has", json!({"url": url_params(url)}))
            .await
            .map(|_| ())
    }

    async fn destroy(&self, m2: &str, url: &HubUrl) -> GridResult<()> {
        self.channel
            .call(m2, "m2.destroy", json!({"url": url_params(url)}))
            .await
            .map(|_| ())
    }

    async fn purge(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>> {
        result_beans(
            self.channel
                .call(m2, "m2.purge", json!({"url": url_params(url)}))
                .await?,
        )
    }

    async fn dedup(&self, m2: &str, url: &HubUrl) -> GridResult<Option<String>> {
        let result = self
            .channel
            .call(m2, "m2.dedup", json!({"url": url_params(url)}))
            .await?;
        Ok(result
            .get("msg")
            .and_then(Value::as_str)
            .map(str::to_string))
    }

    async fn set_storage_policy(
        &self,
        m2: &str,
        url: &HubUrl,
        policy: &str,
    ) -> GridResult<Vec<Bean>> {
        let params = json!({"url": url_params(url), "stgpol": policy});
        result_beans(self.channel.call(m2, "m2.stgpol", params).await?)
    }

    async fn touch(&self, m2: &str, url: &HubUrl) -> GridResult<()> {
        self.channel
            .call(m2, "m2.touch", json!({"url": url_params(url)}))
            .await
            .map(|_| ())
    }

    async fn get_content(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>> {
        result_beans(
            self.channel
                .call(m2, "m2.get", json!({"url": url_params(url)}))
                .await?,
        )
    }

    async fn put_content(&self, m2: &str, url: &HubUrl, beans: &[Bean]) -> GridResult<Vec<Bean>> {
        let params = json!({"url": url_params(url), "beans": beans_to_sections(beans)});
        result_beans(self.channel.call(m2, "m2.put", params).await?)
    }

    async fn append_content(
        &self,
        m2: &str,
        url: &HubUrl,
        beans: &[Bean],
    ) -> GridResult<Vec<Bean>> {
        let params = json!({"url": url_params(url), "beans": beans_to_sections(beans)});
        result_beans(self.channel.call(m2, "m2.append", params).await?)
    }

    async fn delete_content(&self, m2: &str, url: &HubUrl) -> GridResult<Vec<Bean>> {
        result_beans(
            self.channel
                .call(m2, "m2.delete", json!({"url": url_params(url)}))
                .await?,
        )
    }

    async fn generate_beans(
        &self,
        m2: &str,
        url: &HubUrl,
        size: i64,
        policy: Option<&str>,
    ) -> GridResult<Vec<Bean>> {
        let params = json!({
            "url": url_params(url),
            "size": size,
            "policy": policy,
        });
        result_beans(self.channel.call(m2, "m2.beans", params).await?)
    }

    async fn spare_chunks(
        &self,
        m2: &str,
        url: &HubUrl,
        policy: Option<&str>,
        notin: &[Bean],
        broken: &[Bean],
    ) -> GridResult<Vec<Bean>> {
        let params = json!({
            "url": url_params(url),
            "stgpol": policy,
            "notin": beans_to_sections(notin),
            "broken": beans_to_sections(broken),
        });
        result_beans(self.channel.call(m2, "m2.spare", params).await?)
    }

    async fn copy_content(&self, m2: &str, url: &HubUrl, target: &str) -> GridResult<()> {
        let params = json!({"url": url_params(url), "target": target});
        self.channel.call(m2, "m2.copy", params).await.map(|_| ())
    }
}
