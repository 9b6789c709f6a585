//! Container and object handlers (meta2 backends).

use std::future::Future;
use std::sync::Mutex;

use gridgate_core::{GridError, GridResult, HubUrl, ServiceUrl};
use gridgate_core::{CODE_BAD_REQUEST, CODE_CONTAINER_NOT_FOUND};
use gridgate_rpc::{dump_sections, section_from_body, Bean};
use serde_json::{Map, Value};

use crate::reply::{self, Reply};
use crate::route::RequestContext;
use crate::state::AppState;
use crate::SRVTYPE_META2;

/// Resolves the meta2 replicas of the URL's reference and invokes the
/// hook against each candidate until one answers.
///
/// Transport failures (code < 100) fall through to the next candidate.
/// Any completed exchange, successful or failing with an application
/// error, invalidates the cached `(reference, meta2)` binding so a
/// stale binding cannot outlive a container move or destroy. Errors of
/// 400 and above are terminal; lower application codes retry the next
/// replica too.
pub(crate) async fn resolve_and_do<T, F, Fut>(
    state: &AppState,
    url: &HubUrl,
    hook: F,
) -> GridResult<T>
where
    F: Fn(ServiceUrl) -> Fut,
    Fut: Future<Output = GridResult<T>>,
{
    let packed = state
        .resolver
        .resolve_service(url, SRVTYPE_META2)
        .await
        .map_err(|e| e.prefixed("Resolution error: "))?;
    if packed.is_empty() {
        return Err(GridError::container_not_found("No meta2 located"));
    }

    for entry in &packed {
        let m2: ServiceUrl = match entry.parse() {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(entry = %entry, error = %e, "invalid directory entry");
                continue;
            }
        };
        match hook(m2).await {
            Ok(v) => {
                state.resolver.decache_service(url, SRVTYPE_META2);
                return Ok(v);
            }
            Err(e) => {
                tracing::info!(code = e.code(), message = e.message(), "meta2 call failed");
                if !e.is_transport() {
                    state.resolver.decache_service(url, SRVTYPE_META2);
                }
                if e.code() >= 400 {
                    return Err(e.prefixed("meta2 error: "));
                }
            }
        }
    }
    Err(GridError::internal("No meta2 replied"))
}

/// Bean payload or error, with the 400/soft split.
fn reply_beans(url: &HubUrl, result: GridResult<Vec<Bean>>) -> Reply {
    match result {
        Err(e) if e.code() == CODE_BAD_REQUEST => reply::format_error(e),
        Err(e) => reply::soft_error(e),
        Ok(beans) => {
            let mut payload = Map::new();
            payload.insert("URL".into(), reply::url_json(url));
            payload.extend(dump_sections(&beans));
            reply::success_json(payload)
        }
    }
}

/// Empty-success or error, with the 400/soft split.
fn reply_m2(result: GridResult<()>) -> Reply {
    match result {
        Ok(()) => reply::success_empty(),
        Err(e) if e.code() == CODE_BAD_REQUEST => reply::format_error(e),
        Err(e) => reply::soft_error(e),
    }
}

// Container scope ------------------------------------------------------------

pub async fn container_create(ctx: RequestContext) -> Reply {
    let stgpol = ctx.url.option("stgpol").map(str::to_string);
    let verpol = ctx.url.option("verpol").map(str::to_string);
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let stgpol = stgpol.clone();
        let verpol = verpol.clone();
        async move {
            container
                .create(&m2.host, &url, stgpol.as_deref(), verpol.as_deref())
                .await
        }
    })
    .await
    // A missing reference surfaces as container-not-found from the
    // backend; for a create that is a refusal, not a lookup miss.
    .map_err(|e| {
        if e.code() == CODE_CONTAINER_NOT_FOUND {
            e.with_code(gridgate_core::CODE_FORBIDDEN)
        } else {
            e
        }
    });
    reply_m2(result)
}

pub async fn container_list(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.list(&m2.host, &url).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}

pub async fn container_check(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.has(&m2.host, &url).await }
    })
    .await;
    reply_m2(result)
}

pub async fn container_destroy(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.destroy(&m2.host, &url).await }
    })
    .await;
    reply_m2(result)
}

pub async fn container_action(ctx: RequestContext) -> Reply {
    match ctx.action() {
        Some("purge") => container_purge(ctx).await,
        Some("dedup") => container_dedup(ctx).await,
        Some("stgpol") => container_stgpol(ctx).await,
        Some("touch") => touch(ctx).await,
        Some(other) => {
            reply::format_error(GridError::bad_request(format!("Invalid action [{}]", other)))
        }
        None => reply::format_error(GridError::bad_request("Missing ACTION")),
    }
}

async fn container_purge(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.purge(&m2.host, &url).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}

async fn container_dedup(ctx: RequestContext) -> Reply {
    let reports: Mutex<Vec<String>> = Mutex::new(Vec::new());
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let reports = &reports;
        async move {
            let msg = container.dedup(&m2.host, &url).await?;
            if let Some(msg) = msg {
                reports.lock().unwrap().push(msg);
            }
            Ok(())
        }
    })
    .await;

    match result {
        Err(e) => reply::soft_error(e),
        Ok(()) => {
            let mut payload = Map::new();
            payload.insert(
                "msg".into(),
                Value::Array(
                    reports
                        .into_inner()
                        .unwrap()
                        .into_iter()
                        .map(Value::from)
                        .collect(),
                ),
            );
            reply::success_json(payload)
        }
    }
}

async fn container_stgpol(ctx: RequestContext) -> Reply {
    let Some(stgpol) = ctx.url.option("stgpol").map(str::to_string) else {
        return reply::format_error(GridError::bad_request("Missing STGPOL"));
    };
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let stgpol = stgpol.clone();
        async move { container.set_storage_policy(&m2.host, &url, &stgpol).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}

/// Touches the container, or the content when the URL carries a path.
async fn touch(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.touch(&m2.host, &url).await }
    })
    .await;
    reply_m2(result)
}

// Content scope --------------------------------------------------------------

pub async fn content_put(ctx: RequestContext) -> Reply {
    let beans = match ctx.body_json().and_then(|body| parse_put_beans(&ctx.url, &body)) {
        Ok(beans) => beans,
        Err(e) => return reply::format_error(e),
    };
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let beans = beans.clone();
        async move { container.put_content(&m2.host, &url, &beans).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}

fn parse_put_beans(url: &HubUrl, body: &Value) -> GridResult<Vec<Bean>> {
    let beans = section_from_body(body, "beans")?;
    let path = url.path().unwrap_or("");
    for bean in &beans {
        if let Bean::Alias(alias) = bean {
            if alias.name != path {
                return Err(GridError::bad_request(format!(
                    "Path mismatch, ({}) vs ({})",
                    path, alias.name
                )));
            }
        }
    }
    Ok(beans)
}

pub async fn content_get(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.get_content(&m2.host, &url).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}

pub async fn content_check(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.get_content(&m2.host, &url).await.map(|_| ()) }
    })
    .await;
    reply_m2(result)
}

pub async fn content_delete(ctx: RequestContext) -> Reply {
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        async move { container.delete_content(&m2.host, &url).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}

pub async fn content_action(ctx: RequestContext) -> Reply {
    match ctx.action() {
        Some("beans") => content_beans(ctx).await,
        Some("copy") => content_copy(ctx).await,
        Some("spare") => content_spare(ctx).await,
        Some("touch") => touch(ctx).await,
        Some("stgpol") => content_stgpol(ctx).await,
        Some("append") => content_append(ctx).await,
        Some("force") => {
            reply::soft_error(GridError::not_implemented("Overwrite not implemented"))
        }
        Some(other) => {
            reply::format_error(GridError::bad_request(format!("Invalid action [{}]", other)))
        }
        None => reply::format_error(GridError::bad_request("Missing ACTION")),
    }
}

async fn content_beans(ctx: RequestContext) -> Reply {
    let Some(size_str) = ctx.url.option("size") else {
        return reply::format_error(GridError::bad_request("Missing size estimation"));
    };
    let Ok(size) = size_str.parse::<i64>() else {
        return reply::format_error(GridError::bad_request("Invalid size format"));
    };
    let policy = ctx.url.option("policy").map(str::to_string);
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let policy = policy.clone();
        async move {
            container
                .generate_beans(&m2.host, &url, size, policy.as_deref())
                .await
        }
    })
    .await;
    reply_beans(&ctx.url, result)
}

async fn content_copy(ctx: RequestContext) -> Reply {
    // Target semantics belong to the backend protocol.
    let target = ctx.url.option("target").unwrap_or("").to_string();
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let target = target.clone();
        async move { container.copy_content(&m2.host, &url, &target).await }
    })
    .await;
    reply_m2(result)
}

async fn content_spare(ctx: RequestContext) -> Reply {
    let body = match ctx.body_json() {
        Ok(body) => body,
        Err(e) => return reply::format_error(e),
    };
    let (notin, broken) = match section_from_body(&body, "notin")
        .and_then(|notin| section_from_body(&body, "broken").map(|broken| (notin, broken)))
    {
        Ok(pair) => pair,
        Err(e) => return reply::format_error(e),
    };
    let policy = ctx.url.option("stgpol").map(str::to_string);
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let policy = policy.clone();
        let notin = notin.clone();
        let broken = broken.clone();
        async move {
            container
                .spare_chunks(&m2.host, &url, policy.as_deref(), &notin, &broken)
                .await
        }
    })
    .await;
    reply_beans(&ctx.url, result)
}

async fn content_stgpol(ctx: RequestContext) -> Reply {
    let Some(stgpol) = ctx.url.option("stgpol").map(str::to_string) else {
        return reply::format_error(GridError::bad_request("Missing policy"));
    };
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let stgpol = stgpol.clone();
        async move {
            container
                .set_storage_policy(&m2.host, &url, &stgpol)
                .await
                .map(|_| ())
        }
    })
    .await;
    reply_m2(result)
}

async fn content_append(ctx: RequestContext) -> Reply {
    let beans = match ctx.body_json().and_then(|body| section_from_body(&body, "beans")) {
        Ok(beans) => beans,
        Err(e) => return reply::format_error(e),
    };
    let result = resolve_and_do(&ctx.state, &ctx.url, |m2| {
        let container = ctx.state.container.clone();
        let url = ctx.url.clone();
        let beans = beans.clone();
        async move { container.append_content(&m2.host, &url, &beans).await }
    })
    .await;
    reply_beans(&ctx.url, result)
}
