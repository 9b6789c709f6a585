//! Declarative route table and request dispatch.
//!
//! A route declares its HTTP method, path prefix, required path tokens,
//! and the query arguments it requires or tolerates. Dispatch scans the
//! table in order: the first entry whose method and prefix both match
//! wins; a prefix that matches under the wrong method yields a bare 405
//! once the scan is over, no match at all a bare 404.
//!
//! The remainder of the path (after the prefix) is a token walk of
//! alternating `key/value` segments (`ns/NS1/ref/R1/path/obj`),
//! percent-decoded, case-insensitive on keys. Unknown or duplicate
//! tokens, a dangling key, a violated token mask or a missing required
//! query argument are all 400s naming the offender. Routes flagged
//! `raw` skip the walk and receive the remainder verbatim (the `/cache`
//! tuning family puts a number there).

use std::collections::HashSet;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;
use gridgate_core::{GridError, HubUrl};
use gridgate_lb::Policy;
use http::{HeaderMap, Method};
use serde_json::Value;

use crate::counters::Family;
use crate::handlers;
use crate::reply::{self, Reply};
use crate::state::AppState;
use crate::uri;

pub const TOK_NS: u8 = 1 << 0;
pub const TOK_REF: u8 = 1 << 1;
pub const TOK_PATH: u8 = 1 << 2;
pub const TOK_TYPE: u8 = 1 << 3;

/// Path tokens that feed the URL options instead of the hierarchy.
const OPTION_TOKENS: &[&str] = &[
    "size", "stgpol", "verpol", "policy", "stgcls", "key", "tagk", "tagv",
];

const LB_ARGS: &[&str] = &["size", "stgcls", "tagk", "tagv", "strict"];

/// A parsed request, handed to the route handler.
pub struct RequestContext {
    pub state: Arc<AppState>,
    pub url: HubUrl,
    pub srvtype: Option<String>,
    /// Path remainder after the prefix; only meaningful on raw routes.
    pub remainder: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestContext {
    /// The `type` token; guarded by the route mask wherever it is used.
    pub fn srvtype(&self) -> &str {
        self.srvtype.as_deref().unwrap_or("")
    }

    pub fn action(&self) -> Option<&str> {
        self.url.option("action")
    }

    pub fn body_json(&self) -> Result<Value, GridError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| GridError::bad_request(format!("Invalid JSON body: {}", e)))
    }
}

pub type HandlerFuture = BoxFuture<'static, Reply>;
type Handler = fn(RequestContext) -> HandlerFuture;

pub struct Route {
    method: &'static str,
    prefix: &'static str,
    family: Family,
    tokens: u8,
    required_args: &'static [&'static str],
    optional_args: &'static [&'static str],
    raw: bool,
    handler: Handler,
}

macro_rules! route {
    ($method:literal, $prefix:literal, $family:ident, $tokens:expr, $req:expr, $opt:expr, $handler:expr) => {
        Route {
            method: $method,
            prefix: $prefix,
            family: Family::$family,
            tokens: $tokens,
            required_args: $req,
            optional_args: $opt,
            raw: false,
            handler: $handler,
        }
    };
}

macro_rules! raw_route {
    ($method:literal, $prefix:literal, $family:ident, $handler:expr) => {
        Route {
            method: $method,
            prefix: $prefix,
            family: Family::$family,
            tokens: 0,
            required_args: &[],
            optional_args: &[],
            raw: true,
            handler: $handler,
        }
    };
}

static ROUTES: &[Route] = &[
    // Load-balancing
    route!("GET", "lb/sl/", Lb, TOK_NS | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::lb::pick(ctx, Policy::Default))),
    route!("GET", "lb/rr/", Lb, TOK_NS | TOK_TYPE, &[], LB_ARGS,
        |ctx| Box::pin(handlers::lb::pick(ctx, Policy::RoundRobin))),
    route!("GET", "lb/wrr/", Lb, TOK_NS | TOK_TYPE, &[], LB_ARGS,
        |ctx| Box::pin(handlers::lb::pick(ctx, Policy::WeightedRoundRobin))),
    route!("GET", "lb/rand/", Lb, TOK_NS | TOK_TYPE, &[], LB_ARGS,
        |ctx| Box::pin(handlers::lb::pick(ctx, Policy::Random))),
    route!("GET", "lb/wrand/", Lb, TOK_NS | TOK_TYPE, &[], LB_ARGS,
        |ctx| Box::pin(handlers::lb::pick(ctx, Policy::WeightedRandom))),
    // Container metadata, legacy object fetch first
    route!("GET", "m2/get/", M2, TOK_NS | TOK_REF | TOK_PATH, &[], &[],
        |ctx| Box::pin(handlers::m2::content_get(ctx))),
    route!("PUT", "m2/container/", M2, TOK_NS | TOK_REF, &[], &["stgpol", "verpol"],
        |ctx| Box::pin(handlers::m2::container_create(ctx))),
    route!("GET", "m2/container/", M2, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::m2::container_list(ctx))),
    route!("HEAD", "m2/container/", M2, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::m2::container_check(ctx))),
    route!("DELETE", "m2/container/", M2, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::m2::container_destroy(ctx))),
    route!("POST", "m2/container/", M2, TOK_NS | TOK_REF, &["action"], &["stgpol"],
        |ctx| Box::pin(handlers::m2::container_action(ctx))),
    route!("PUT", "m2/content/", M2, TOK_NS | TOK_REF | TOK_PATH, &[], &[],
        |ctx| Box::pin(handlers::m2::content_put(ctx))),
    route!("GET", "m2/content/", M2, TOK_NS | TOK_REF | TOK_PATH, &[], &[],
        |ctx| Box::pin(handlers::m2::content_get(ctx))),
    route!("HEAD", "m2/content/", M2, TOK_NS | TOK_REF | TOK_PATH, &[], &[],
        |ctx| Box::pin(handlers::m2::content_check(ctx))),
    route!("DELETE", "m2/content/", M2, TOK_NS | TOK_REF | TOK_PATH, &[], &[],
        |ctx| Box::pin(handlers::m2::content_delete(ctx))),
    route!("POST", "m2/content/", M2, TOK_NS | TOK_REF | TOK_PATH,
        &["action"], &["size", "stgpol", "policy", "target"],
        |ctx| Box::pin(handlers::m2::content_action(ctx))),
    // Directory
    route!("GET", "dir/list/", Dir, TOK_NS | TOK_REF | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::dir::srv_list(ctx))),
    route!("GET", "dir/srv/", Dir, TOK_NS | TOK_REF | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::dir::srv_list(ctx))),
    route!("POST", "dir/srv/", Dir, TOK_NS | TOK_REF | TOK_TYPE, &["action"], &[],
        |ctx| Box::pin(handlers::dir::srv_link(ctx))),
    route!("PUT", "dir/ref/", Dir, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::dir::ref_create(ctx))),
    route!("DELETE", "dir/ref/", Dir, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::dir::ref_destroy(ctx))),
    route!("GET", "dir/prop/", Dir, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::dir::prop_get(ctx))),
    route!("PUT", "dir/prop/", Dir, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::dir::prop_set(ctx))),
    route!("DELETE", "dir/prop/", Dir, TOK_NS | TOK_REF, &[], &[],
        |ctx| Box::pin(handlers::dir::prop_del(ctx))),
    // Conscience
    route!("GET", "cs/info/", Cs, TOK_NS, &[], &[],
        |ctx| Box::pin(handlers::cs::info(ctx))),
    route!("GET", "cs/types/", Cs, TOK_NS, &[], &[],
        |ctx| Box::pin(handlers::cs::types(ctx))),
    route!("GET", "cs/srv/", Cs, TOK_NS | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::cs::list(ctx))),
    route!("PUT", "cs/srv/", Cs, TOK_NS | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::cs::register_push(ctx))),
    route!("POST", "cs/srv/", Cs, TOK_NS | TOK_TYPE, &["action"], &[],
        |ctx| Box::pin(handlers::cs::register_action(ctx))),
    route!("DELETE", "cs/srv/", Cs, TOK_NS | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::cs::clear(ctx))),
    route!("HEAD", "cs/srv/", Cs, TOK_NS | TOK_TYPE, &[], &[],
        |ctx| Box::pin(handlers::cs::check(ctx))),
    // Cache tuning, raw remainders
    raw_route!("GET", "cache/status", Cache, |ctx| Box::pin(handlers::cache::status(ctx))),
    raw_route!("POST", "cache/flush/high", Cache, |ctx| Box::pin(handlers::cache::flush_high(ctx))),
    raw_route!("POST", "cache/flush/low", Cache, |ctx| Box::pin(handlers::cache::flush_low(ctx))),
    raw_route!("POST", "cache/set/ttl/high", Cache, |ctx| Box::pin(handlers::cache::set_ttl_high(ctx))),
    raw_route!("POST", "cache/set/ttl/low", Cache, |ctx| Box::pin(handlers::cache::set_ttl_low(ctx))),
    raw_route!("POST", "cache/set/max/high", Cache, |ctx| Box::pin(handlers::cache::set_max_high(ctx))),
    raw_route!("POST", "cache/set/max/low", Cache, |ctx| Box::pin(handlers::cache::set_max_low(ctx))),
    // Process status
    raw_route!("GET", "status", Status, |ctx| Box::pin(handlers::status::page(ctx))),
    raw_route!("HEAD", "status", Status, |ctx| Box::pin(handlers::status::head(ctx))),
];

/// Routes a request and runs its handler.
pub async fn dispatch(
    state: Arc<AppState>,
    method: &Method,
    uri_str: &str,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    let parts = uri::split_uri(uri_str);
    let path = parts.path.strip_prefix('/').unwrap_or(&parts.path);

    let mut prefix_matched = false;
    let mut chosen: Option<&Route> = None;
    for route in ROUTES {
        if !path.starts_with(route.prefix) {
            continue;
        }
        prefix_matched = true;
        if method.as_str() == route.method {
            chosen = Some(route);
            break;
        }
    }

    let Some(route) = chosen else {
        state.counters.hit(Family::Unmatched);
        return if prefix_matched {
            reply::method_error()
        } else {
            reply::no_handler()
        };
    };

    state.counters.hit(route.family);
    let remainder = &path[route.prefix.len()..];
    let mut ctx = RequestContext {
        state,
        url: HubUrl::new(),
        srvtype: None,
        remainder: remainder.to_string(),
        headers,
        body,
    };

    if !route.raw {
        if let Err(e) = walk_tokens(remainder, &mut ctx) {
            return reply::format_error(e);
        }
    }
    if let Err(e) = apply_query(&parts.query, route, &mut ctx) {
        return reply::format_error(e);
    }
    if let Err(e) = check_contract(route, &ctx) {
        return reply::format_error(e);
    }
    if (route.tokens & TOK_NS) != 0 {
        let ns = ctx.url.ns().unwrap_or("");
        if !ctx.state.validate_namespace(ns) {
            return reply::soft_error(GridError::namespace_not_managed("Invalid NS"));
        }
    }

    (route.handler)(ctx).await
}

fn walk_tokens(rest: &str, ctx: &mut RequestContext) -> Result<(), GridError> {
    let mut segments: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('/').collect()
    };
    while segments.last() == Some(&"") {
        segments.pop();
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut i = 0;
    while i < segments.len() {
        let token = segments[i].to_ascii_lowercase();
        let Some(&raw) = segments.get(i + 1) else {
            return Err(GridError::bad_request("Invalid URI"));
        };
        let value = uri::unescape(raw);
        if !seen.insert(token.clone()) {
            return Err(GridError::bad_request(format!(
                "Duplicate URI token [{}]",
                token
            )));
        }
        match token.as_str() {
            "ns" => ctx.url.set_ns(&value),
            "ref" => ctx.url.set_reference(&value),
            "path" => ctx.url.set_path(&value),
            "version" => ctx.url.set_version(&value),
            "type" => {
                if value.is_empty() {
                    return Err(GridError::bad_request("Empty TYPE"));
                }
                ctx.srvtype = Some(value);
            }
            t if OPTION_TOKENS.contains(&t) => ctx.url.set_option(t, &value),
            _ => {
                return Err(GridError::bad_request(format!(
                    "Unexpected URI token [{}]",
                    token
                )));
            }
        }
        i += 2;
    }
    Ok(())
}

fn apply_query(query: &str, route: &Route, ctx: &mut RequestContext) -> Result<(), GridError> {
    for (key, value) in uri::parse_query(query) {
        let key = key.to_ascii_lowercase();
        if !route.required_args.contains(&key.as_str())
            && !route.optional_args.contains(&key.as_str())
        {
            return Err(GridError::bad_request(format!(
                "Unexpected query argument [{}]",
                key
            )));
        }
        ctx.url.set_option(&key, &value);
    }
    Ok(())
}

fn check_contract(route: &Route, ctx: &RequestContext) -> Result<(), GridError> {
    if (route.tokens & TOK_NS) != 0 && !ctx.url.has_ns() {
        return Err(GridError::bad_request("Missing NS"));
    }
    if (route.tokens & TOK_REF) != 0 && !ctx.url.has_reference() {
        return Err(GridError::bad_request("Missing REF"));
    }
    if (route.tokens & TOK_PATH) != 0 && !ctx.url.has_path() {
        return Err(GridError::bad_request("Missing PATH"));
    }
    if (route.tokens & TOK_TYPE) != 0 && ctx.srvtype.is_none() {
        return Err(GridError::bad_request("Missing TYPE"));
    }
    for arg in route.required_args {
        if ctx.url.option(arg).is_none() {
            return Err(GridError::bad_request(format!(
                "Missing {}",
                arg.to_uppercase()
            )));
        }
    }
    Ok(())
}
