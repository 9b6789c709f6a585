//! Conscience handlers: listings, namespace info, registration.

use gridgate_core::{GridError, ServiceDescriptor};
use serde_json::{Map, Value};

use crate::reply::{self, Reply};
use crate::route::RequestContext;

/// How a registration normalizes the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegMode {
    /// Plain heartbeat: the score is reset to 0.
    Push,
    /// Lock at the score the body supplies (default 0).
    Lock,
    /// Unlock: score forced to -1.
    Unlock,
}

/// `GET /cs/srv`: every service of one type, from the conscience.
pub async fn list(ctx: RequestContext) -> Reply {
    match ctx
        .state
        .conscience
        .list_services(ctx.state.ns_name(), ctx.srvtype())
        .await
    {
        Err(e) => reply::soft_error(e.prefixed("Agent error: ")),
        Ok(services) => {
            let mut payload = Map::new();
            payload.insert(
                "srv".into(),
                serde_json::to_value(services).expect("service serialization"),
            );
            reply::success_json(payload)
        }
    }
}

/// `GET /cs/info`: the namespace configuration snapshot.
pub async fn info(ctx: RequestContext) -> Reply {
    let info = ctx.state.nsinfo();
    let mut payload = Map::new();
    payload.insert(
        "ns_info".into(),
        serde_json::to_value(info.as_ref()).expect("nsinfo serialization"),
    );
    reply::success_json(payload)
}

/// `GET /cs/types`: the service types the namespace manages.
pub async fn types(ctx: RequestContext) -> Reply {
    let types = ctx.state.srvtypes();
    let mut payload = Map::new();
    payload.insert(
        "srvtypes".into(),
        Value::Array(types.iter().map(|t| Value::from(t.clone())).collect()),
    );
    reply::success_json(payload)
}

/// `HEAD /cs/srv`: is the type managed at all.
pub async fn check(ctx: RequestContext) -> Reply {
    if ctx.state.validate_srvtype(ctx.srvtype()) {
        reply::success_empty()
    } else {
        reply::soft_error(GridError::type_not_managed("Type not managed"))
    }
}

/// `DELETE /cs/srv`: deregister every service of the type.
pub async fn clear(ctx: RequestContext) -> Reply {
    match ctx
        .state
        .conscience
        .clear_services(ctx.state.ns_name(), ctx.srvtype())
        .await
    {
        Err(e) => reply::soft_error(e.prefixed("Agent error: ")),
        Ok(()) => reply::success_json(Map::new()),
    }
}

/// `PUT /cs/srv`: plain registration heartbeat.
pub async fn register_push(ctx: RequestContext) -> Reply {
    register(ctx, RegMode::Push).await
}

/// `POST /cs/srv?action={lock,unlock}`.
pub async fn register_action(ctx: RequestContext) -> Reply {
    let mode = match ctx.action() {
        Some("lock") => RegMode::Lock,
        Some("unlock") => RegMode::Unlock,
        Some(other) => {
            return reply::format_error(GridError::bad_request(format!(
                "Invalid action [{}]",
                other
            )));
        }
        None => return reply::format_error(GridError::bad_request("Missing ACTION")),
    };
    register(ctx, mode).await
}

async fn register(ctx: RequestContext, mode: RegMode) -> Reply {
    let mut si: ServiceDescriptor = match serde_json::from_slice(&ctx.body) {
        Ok(si) => si,
        Err(e) => {
            return reply::format_error(GridError::bad_request(format!(
                "Invalid JSON body: {}",
                e
            )));
        }
    };

    if !ctx.state.validate_namespace(&si.ns_name) {
        return reply::soft_error(GridError::namespace_not_managed("Unexpected NS"));
    }
    if si.srv_type.is_empty() {
        si.srv_type = ctx.srvtype().to_string();
    }

    si.timestamp = ctx.state.monotonic_secs() as i64;
    match mode {
        RegMode::Push => si.score = 0,
        RegMode::Lock => {}
        RegMode::Unlock => si.score = -1,
    }

    ctx.state.push.insert(si.clone());

    let mut payload = Map::new();
    payload.insert(
        "srv".into(),
        serde_json::to_value(&si).expect("service serialization"),
    );
    reply::success_json(payload)
}
