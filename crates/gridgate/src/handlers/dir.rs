//! Directory handlers (references, linked services, properties).

use std::collections::BTreeMap;
use std::future::Future;

use gridgate_core::{GridError, GridResult, HubUrl, ServiceUrl};
use gridgate_core::CODE_BAD_REQUEST;
use gridgate_rpc::LinkMode;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::reply::{self, Reply};
use crate::route::RequestContext;
use crate::state::AppState;

const HDR_DISALLOW_EMPTY: &str = "x-disallow-empty-service-list";

/// Resolves the directory replicas of the URL's namespace and invokes
/// the hook against each candidate until one answers. Same taxonomy as
/// the meta2 loop: transport errors walk on, application errors
/// surface.
async fn resolve_dir_and_do<T, F, Fut>(state: &AppState, url: &HubUrl, hook: F) -> GridResult<T>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = GridResult<T>>,
{
    let dirs = state
        .resolver
        .resolve_directory(url)
        .await
        .map_err(|e| e.prefixed("Resolution error: "))?;
    if dirs.is_empty() {
        return Err(GridError::container_not_found("No directory located"));
    }

    for dir in dirs {
        match hook(dir).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                tracing::info!(code = e.code(), message = e.message(), "meta1 call failed");
                if !e.is_transport() {
                    return Err(e.prefixed("meta1 error: "));
                }
            }
        }
    }
    Err(GridError::internal("No meta1 replied"))
}

fn reply_dir(result: GridResult<()>) -> Reply {
    match result {
        Ok(()) => reply::success_empty(),
        Err(e) if e.code() == CODE_BAD_REQUEST => reply::format_error(e),
        Err(e) => reply::soft_error(e),
    }
}

fn srv_payload(urls: &[ServiceUrl]) -> Map<String, Value> {
    let mut payload = Map::new();
    payload.insert(
        "srv".into(),
        Value::Array(
            urls.iter()
                .map(|u| serde_json::to_value(u).expect("service url serialization"))
                .collect(),
        ),
    );
    payload
}

fn disallow_empty(ctx: &RequestContext) -> bool {
    ctx.headers
        .get(HDR_DISALLOW_EMPTY)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

/// Services of one type linked to a reference, through the resolver.
pub async fn srv_list(ctx: RequestContext) -> Reply {
    let packed = match ctx.state.resolver.resolve_service(&ctx.url, ctx.srvtype()).await {
        Ok(packed) => packed,
        Err(e) => return reply::soft_error(e),
    };
    let urls: Vec<ServiceUrl> = packed.iter().filter_map(|p| p.parse().ok()).collect();
    if urls.is_empty() && disallow_empty(&ctx) {
        return reply::soft_error(GridError::not_found("No service linked"));
    }
    reply::success_json(srv_payload(&urls))
}

/// `action={link,force,renew}` on the service link of a reference.
pub async fn srv_link(ctx: RequestContext) -> Reply {
    let mode = match ctx.action() {
        Some("link") => LinkMode::Link,
        Some("force") => LinkMode::Force,
        Some("renew") => LinkMode::Renew,
        Some(other) => {
            return reply::format_error(GridError::bad_request(format!(
                "Invalid action [{}]",
                other
            )));
        }
        None => return reply::format_error(GridError::bad_request("Missing ACTION")),
    };

    let srvtype = ctx.srvtype().to_string();
    let result = resolve_dir_and_do(&ctx.state, &ctx.url, |dir| {
        let directory = ctx.state.directory.clone();
        let url = ctx.url.clone();
        let srvtype = srvtype.clone();
        async move { directory.link_service(&dir, &url, &srvtype, mode).await }
    })
    .await;

    match result {
        Err(e) if e.code() == CODE_BAD_REQUEST => reply::format_error(e),
        Err(e) => reply::soft_error(e),
        Ok(urls) => {
            // The binding changed; the cached one is no longer valid.
            ctx.state.resolver.decache_service(&ctx.url, &srvtype);
            reply::success_json(srv_payload(&urls))
        }
    }
}

pub async fn ref_create(ctx: RequestContext) -> Reply {
    let result = resolve_dir_and_do(&ctx.state, &ctx.url, |dir| {
        let directory = ctx.state.directory.clone();
        let url = ctx.url.clone();
        async move { directory.create_reference(&dir, &url).await }
    })
    .await;
    if result.is_ok() {
        ctx.state.resolver.decache_reference(&ctx.url);
    }
    reply_dir(result)
}

pub async fn ref_destroy(ctx: RequestContext) -> Reply {
    let result = resolve_dir_and_do(&ctx.state, &ctx.url, |dir| {
        let directory = ctx.state.directory.clone();
        let url = ctx.url.clone();
        async move { directory.destroy_reference(&dir, &url).await }
    })
    .await;
    if result.is_ok() {
        ctx.state.resolver.decache_reference(&ctx.url);
    }
    reply_dir(result)
}

#[derive(Deserialize, Default)]
struct KeysBody {
    #[serde(default)]
    keys: Vec<String>,
}

#[derive(Deserialize)]
struct PairsBody {
    pairs: BTreeMap<String, String>,
}

fn keys_from_body(ctx: &RequestContext) -> GridResult<Vec<String>> {
    if ctx.body.is_empty() {
        return Ok(Vec::new());
    }
    let body: KeysBody = serde_json::from_slice(&ctx.body)
        .map_err(|e| GridError::bad_request(format!("Invalid JSON body: {}", e)))?;
    Ok(body.keys)
}

/// Property lookup; an empty key set means every property.
pub async fn prop_get(ctx: RequestContext) -> Reply {
    let keys = match keys_from_body(&ctx) {
        Ok(keys) => keys,
        Err(e) => return reply::format_error(e),
    };
    let result = resolve_dir_and_do(&ctx.state, &ctx.url, |dir| {
        let directory = ctx.state.directory.clone();
        let url = ctx.url.clone();
        let keys = keys.clone();
        async move { directory.get_properties(&dir, &url, &keys).await }
    })
    .await;

    match result {
        Err(e) if e.code() == CODE_BAD_REQUEST => reply::format_error(e),
        Err(e) => reply::soft_error(e),
        Ok(pairs) => {
            let mut payload = Map::new();
            payload.insert(
                "pairs".into(),
                serde_json::to_value(pairs).expect("property serialization"),
            );
            reply::success_json(payload)
        }
    }
}

pub async fn prop_set(ctx: RequestContext) -> Reply {
    let pairs = match serde_json::from_slice::<PairsBody>(&ctx.body) {
        Ok(body) => body.pairs,
        Err(e) => {
            return reply::format_error(GridError::bad_request(format!(
                "Invalid JSON body: {}",
                e
            )));
        }
    };
    let result = resolve_dir_and_do(&ctx.state, &ctx.url, |dir| {
        let directory = ctx.state.directory.clone();
        let url = ctx.url.clone();
        let pairs = pairs.clone();
        async move { directory.set_properties(&dir, &url, &pairs).await }
    })
    .await;
    reply_dir(result)
}

pub async fn prop_del(ctx: RequestContext) -> Reply {
    let keys = match keys_from_body(&ctx) {
        Ok(keys) => keys,
        Err(e) => return reply::format_error(e),
    };
    let result = resolve_dir_and_do(&ctx.state, &ctx.url, |dir| {
        let directory = ctx.state.directory.clone();
        let url = ctx.url.clone();
        let keys = keys.clone();
        async move { directory.delete_properties(&dir, &url, &keys).await }
    })
    .await;
    reply_dir(result)
}
