//! In-process request counters, exposed by `GET /status`.

use std::sync::atomic::{AtomicU64, Ordering};

/// Which handler family served a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Lb,
    M2,
    Dir,
    Cs,
    Cache,
    Status,
    Unmatched,
}

impl Family {
    fn name(self) -> &'static str {
        match self {
            Family::Lb => "lb",
            Family::M2 => "m2",
            Family::Dir => "dir",
            Family::Cs => "cs",
            Family::Cache => "cache",
            Family::Status => "status",
            Family::Unmatched => "unmatched",
        }
    }
}

#[derive(Default)]
pub struct Counters {
    total: AtomicU64,
    lb: AtomicU64,
    m2: AtomicU64,
    dir: AtomicU64,
    cs: AtomicU64,
    cache: AtomicU64,
    status: AtomicU64,
    unmatched: AtomicU64,
}

impl Counters {
    pub fn hit(&self, family: Family) {
        self.total.fetch_add(1, Ordering::Relaxed);
        let slot = match family {
            Family::Lb => &self.lb,
            Family::M2 => &self.m2,
            Family::Dir => &self.dir,
            Family::Cs => &self.cs,
            Family::Cache => &self.cache,
            Family::Status => &self.status,
            Family::Unmatched => &self.unmatched,
        };
        slot.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "metrics")]
        metrics::counter!("gridgate_requests_total", "family" => family.name()).increment(1);

        #[cfg(not(feature = "metrics"))]
        let _ = family.name();
    }

    /// Name/value pairs in `/status` order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        vec![
            ("proxy.req.total", self.total.load(Ordering::Relaxed)),
            ("proxy.req.lb", self.lb.load(Ordering::Relaxed)),
            ("proxy.req.m2", self.m2.load(Ordering::Relaxed)),
            ("proxy.req.dir", self.dir.load(Ordering::Relaxed)),
            ("proxy.req.cs", self.cs.load(Ordering::Relaxed)),
            ("proxy.req.cache", self.cache.load(Ordering::Relaxed)),
            ("proxy.req.status", self.status.load(Ordering::Relaxed)),
            ("proxy.req.unmatched", self.unmatched.load(Ordering::Relaxed)),
        ]
    }
}
