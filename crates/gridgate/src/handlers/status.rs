//! In-process counters as `text/x-java-properties`.

use std::fmt::Write;

use http::StatusCode;

use crate::reply::{Reply, CONTENT_TYPE_PROPERTIES};
use crate::route::RequestContext;

pub async fn page(ctx: RequestContext) -> Reply {
    let mut out = String::with_capacity(256);
    for (name, value) in ctx.state.counters.snapshot() {
        let _ = writeln!(out, "{} = {}", name, value);
    }

    let s = ctx.state.resolver.stats();
    let _ = writeln!(out, "cache.dir.count = {}", s.high.count);
    let _ = writeln!(out, "cache.dir.max = {}", s.high.max);
    let _ = writeln!(out, "cache.dir.ttl = {}", s.high.ttl);
    let _ = writeln!(out, "cache.dir.clock = {}", s.clock);
    let _ = writeln!(out, "cache.srv.count = {}", s.low.count);
    let _ = writeln!(out, "cache.srv.max = {}", s.low.max);
    let _ = writeln!(out, "cache.srv.ttl = {}", s.low.ttl);
    let _ = writeln!(out, "cache.srv.clock = {}", s.clock);

    Reply::text(StatusCode::OK, CONTENT_TYPE_PROPERTIES, out)
}

pub async fn head(_ctx: RequestContext) -> Reply {
    crate::reply::success_empty()
}
