//! Runtime cache tuning.
//!
//! The `set` routes carry their value as the trailing path segment
//! (`POST /cache/set/ttl/low/3600`), parsed strictly.

use gridgate_core::GridError;
use serde_json::{json, Map};

use crate::reply::{self, Reply};
use crate::route::RequestContext;

fn parse_count<T: std::str::FromStr>(ctx: &RequestContext) -> Result<T, GridError> {
    let raw = ctx.remainder.trim_matches('/');
    raw.parse::<T>()
        .map_err(|_| GridError::bad_request(format!("Invalid count [{}]", raw)))
}

/// `GET /cache/status`: both tiers plus the shared clock.
pub async fn status(ctx: RequestContext) -> Reply {
    let s = ctx.state.resolver.stats();
    let mut payload = Map::new();
    payload.insert("clock".into(), json!(s.clock));
    payload.insert(
        "csm0".into(),
        json!({"count": s.high.count, "max": s.high.max, "ttl": s.high.ttl}),
    );
    payload.insert(
        "meta1".into(),
        json!({"count": s.low.count, "max": s.low.max, "ttl": s.low.ttl}),
    );
    reply::success_json(payload)
}

pub async fn flush_high(ctx: RequestContext) -> Reply {
    ctx.state.resolver.flush_high();
    reply::success_empty()
}

pub async fn flush_low(ctx: RequestContext) -> Reply {
    ctx.state.resolver.flush_low();
    reply::success_empty()
}

pub async fn set_ttl_high(ctx: RequestContext) -> Reply {
    match parse_count::<u64>(&ctx) {
        Err(e) => reply::format_error(e),
        Ok(ttl) => {
            ctx.state.resolver.set_ttl_high(ttl);
            reply::success_empty()
        }
    }
}

pub async fn set_ttl_low(ctx: RequestContext) -> Reply {
    match parse_count::<u64>(&ctx) {
        Err(e) => reply::format_error(e),
        Ok(ttl) => {
            ctx.state.resolver.set_ttl_low(ttl);
            reply::success_empty()
        }
    }
}

pub async fn set_max_high(ctx: RequestContext) -> Reply {
    match parse_count::<u32>(&ctx) {
        Err(e) => reply::format_error(e),
        Ok(max) => {
            ctx.state.resolver.set_max_high(max);
            reply::success_empty()
        }
    }
}

pub async fn set_max_low(ctx: RequestContext) -> Reply {
    match parse_count::<u32>(&ctx) {
        Err(e) => reply::format_error(e),
        Ok(max) => {
            ctx.state.resolver.set_max_low(max);
            reply::success_empty()
        }
    }
}
