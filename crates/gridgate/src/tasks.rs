//! Background queue wiring.
//!
//! Three queues, mirroring the responsibilities of the process:
//!
//! - **admin**: resolver clock/expiry every second, namespace-info and
//!   service-type reloads,
//! - **upstream**: the coalesced registration push,
//! - **downstream**: the load-balancer snapshot refresh (absent when
//!   load-balancing is disabled).

use std::sync::Arc;

use gridgate_sched::{QueueHandle, TaskQueue};

use crate::state::AppState;

pub struct BackgroundQueues {
    pub admin: TaskQueue,
    pub upstream: TaskQueue,
    pub downstream: TaskQueue,
}

impl BackgroundQueues {
    /// Runs every task of every queue once, in queue order.
    pub async fn fire(&self) {
        self.admin.fire().await;
        self.upstream.fire().await;
        self.downstream.fire().await;
    }

    pub fn run(self) -> Vec<QueueHandle> {
        vec![self.admin.run(), self.upstream.run(), self.downstream.run()]
    }
}

pub fn build(state: &Arc<AppState>) -> BackgroundQueues {
    let mut admin = TaskQueue::new("admin");
    {
        let st = state.clone();
        admin.register(1, move || {
            let st = st.clone();
            async move { expire_resolver(&st) }
        });
    }
    {
        let st = state.clone();
        admin.register(st.config.nsinfo_refresh_secs, move || {
            let st = st.clone();
            async move { reload_nsinfo(&st).await }
        });
    }
    {
        let st = state.clone();
        admin.register(st.config.nsinfo_refresh_secs, move || {
            let st = st.clone();
            async move { reload_srvtypes(&st).await }
        });
    }

    let mut upstream = TaskQueue::new("upstream");
    {
        let st = state.clone();
        upstream.register(st.config.push_period_secs, move || {
            let st = st.clone();
            async move { push_registrations(&st).await }
        });
    }

    let mut downstream = TaskQueue::new("downstream");
    if state.lb_enabled() {
        let st = state.clone();
        downstream.register(state.config.lb_refresh_secs as u64, move || {
            let st = st.clone();
            async move { reload_lb_pool(&st).await }
        });
    }

    BackgroundQueues {
        admin,
        upstream,
        downstream,
    }
}

fn expire_resolver(state: &AppState) {
    state.resolver.set_now(state.monotonic_secs());
    let count = state.resolver.expire();
    if count > 0 {
        tracing::debug!(count, "expired resolver entries");
    }
    let count = state.resolver.purge();
    if count > 0 {
        tracing::debug!(count, "purged resolver entries");
    }
}

async fn reload_nsinfo(state: &AppState) {
    match state.conscience.namespace_info(state.ns_name()).await {
        Ok(info) => state.set_nsinfo(info),
        Err(e) => {
            tracing::warn!(ns = state.ns_name(), error = %e, "nsinfo reload failed");
        }
    }
}

async fn reload_srvtypes(state: &AppState) {
    match state.conscience.service_types(state.ns_name()).await {
        Ok(types) => state.set_srvtypes(types),
        Err(e) => {
            tracing::warn!(ns = state.ns_name(), error = %e, "srvtypes reload failed");
        }
    }
}

/// Drains the push queue and issues one bulk registration. A failed
/// push drops the batch: services re-heartbeat on their own schedule.
async fn push_registrations(state: &AppState) {
    let batch = state.push.drain();
    if batch.is_empty() {
        return;
    }
    let timeout = state.config.push_timeout();
    if let Err(e) = state
        .conscience
        .push_services(state.ns_name(), &batch, timeout)
        .await
    {
        tracing::warn!(count = batch.len(), error = %e, "push error");
    }
}

/// Replaces the per-type snapshots from the conscience view.
async fn reload_lb_pool(state: &AppState) {
    for srvtype in state.srvtypes().iter() {
        match state.conscience.list_services(state.ns_name(), srvtype).await {
            Ok(services) => state.lb.replace(srvtype, services),
            Err(e) => {
                tracing::warn!(srvtype = %srvtype, error = %e, "lb reload failed");
            }
        }
    }
}
