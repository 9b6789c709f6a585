//! Load-balancing handlers.

use gridgate_core::GridError;
use gridgate_lb::{Policy, SelectOptions};
use serde_json::{Map, Value};

use crate::reply::{self, Reply};
use crate::route::RequestContext;

fn select_options(ctx: &RequestContext) -> Result<SelectOptions, GridError> {
    let count = match ctx.url.option("size") {
        None => 1,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| GridError::bad_request(format!("Invalid size [{}]", raw)))?,
    };

    let tagk = ctx.url.option("tagk");
    let tagv = ctx.url.option("tagv");
    let tag_filter = match (tagk, tagv) {
        (None, None) => None,
        (Some(k), Some(v)) => Some((k.to_string(), v.to_string())),
        (Some(_), None) => return Err(GridError::bad_request("Missing TAGV")),
        (None, Some(_)) => return Err(GridError::bad_request("Missing TAGK")),
    };

    let strict = ctx
        .url
        .option("strict")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    Ok(SelectOptions {
        count,
        storage_class: ctx.url.option("stgcls").map(str::to_string),
        strict_class: strict,
        tag_filter,
    })
}

/// One `/lb/{sl,rr,wrr,rand,wrand}` request.
pub async fn pick(ctx: RequestContext, policy: Policy) -> Reply {
    if !ctx.state.lb_enabled() {
        return reply::unavailable_error(GridError::unavailable(
            "Load-balancer disabled by configuration",
        ));
    }

    let opts = match select_options(&ctx) {
        Ok(opts) => opts,
        Err(e) => return reply::format_error(e),
    };

    match ctx.state.lb.next_set(ctx.srvtype(), policy, &opts) {
        Err(e) => reply::soft_error(e),
        Ok(services) => {
            let mut payload = Map::new();
            payload.insert("ns".into(), Value::from(ctx.url.ns().unwrap_or("")));
            payload.insert("type".into(), Value::from(ctx.srvtype()));
            payload.insert(
                "srv".into(),
                Value::Array(
                    services
                        .iter()
                        .map(|s| serde_json::json!({"addr": s.addr}))
                        .collect(),
                ),
            );
            reply::success_json(payload)
        }
    }
}
