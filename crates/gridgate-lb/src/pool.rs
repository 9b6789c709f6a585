//! Per-type service snapshots and the selection engine.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use gridgate_core::{GridError, GridResult, ServiceDescriptor};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::select::{Policy, SelectOptions, TAG_STORAGE_CLASS};

struct Slot {
    services: Vec<ServiceDescriptor>,
    cursor: AtomicUsize,
    /// Current weights of the smooth weighted round-robin, one per
    /// service, reset whenever the snapshot is replaced.
    wrr_state: Mutex<Vec<i64>>,
}

impl Slot {
    fn new(services: Vec<ServiceDescriptor>) -> Self {
        let n = services.len();
        Self {
            services,
            cursor: AtomicUsize::new(0),
            wrr_state: Mutex::new(vec![0; n]),
        }
    }
}

/// Reader-heavy pool of live-service snapshots, one per service type.
///
/// `replace` swaps a whole snapshot in under the write lock; selections
/// clone the `Arc` under the read lock and work lock-free afterwards.
#[derive(Default)]
pub struct LbPool {
    slots: RwLock<HashMap<String, Arc<Slot>>>,
}

impl LbPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the snapshot of one service type.
    pub fn replace(&self, srvtype: &str, services: Vec<ServiceDescriptor>) {
        let slot = Arc::new(Slot::new(services));
        self.slots.write().unwrap().insert(srvtype.to_string(), slot);
    }

    /// Drops every snapshot (used when the namespace view is reset).
    pub fn clear(&self) {
        self.slots.write().unwrap().clear();
    }

    pub fn has_type(&self, srvtype: &str) -> bool {
        self.slots.read().unwrap().contains_key(srvtype)
    }

    pub fn known_types(&self) -> Vec<String> {
        self.slots.read().unwrap().keys().cloned().collect()
    }

    fn slot(&self, srvtype: &str) -> Option<Arc<Slot>> {
        self.slots.read().unwrap().get(srvtype).cloned()
    }

    /// Draws one service of the type with the given policy.
    pub fn next(&self, srvtype: &str, policy: Policy) -> GridResult<ServiceDescriptor> {
        self.next_set(srvtype, policy, &SelectOptions::one())
            .map(|mut v| v.remove(0))
    }

    /// Draws `opts.wanted()` services of the type: distinct hosts, no
    /// duplicates, storage class and tag constraints honored.
    ///
    /// Fails with `TypeNotManaged` when the type has no snapshot and
    /// `PolicyNotSatisfiable` when the constraints cannot be met.
    pub fn next_set(
        &self,
        srvtype: &str,
        policy: Policy,
        opts: &SelectOptions,
    ) -> GridResult<Vec<ServiceDescriptor>> {
        let slot = self
            .slot(srvtype)
            .ok_or_else(|| GridError::type_not_managed("Type not managed"))?;

        let candidates = Self::filter(&slot.services, opts);
        if candidates.is_empty() {
            return Err(GridError::policy_not_satisfiable("Type not available"));
        }

        let ordered = match policy {
            Policy::Default | Policy::RoundRobin => Self::order_rr(&slot, &candidates),
            Policy::Random => Self::order_random(&candidates),
            Policy::WeightedRoundRobin => Self::order_wrr(&slot, &candidates)?,
            Policy::WeightedRandom => Self::order_wrand(&slot, &candidates)?,
        };

        let wanted = opts.wanted();
        let mut picked = Vec::with_capacity(wanted);
        let mut hosts = HashSet::new();
        for idx in ordered {
            let si = &slot.services[idx];
            if !hosts.insert(si.host().to_string()) {
                continue;
            }
            picked.push(si.clone());
            if picked.len() == wanted {
                return Ok(picked);
            }
        }
        Err(GridError::policy_not_satisfiable(format!(
            "Too few matching services ({}/{})",
            picked.len(),
            wanted
        )))
    }

    fn filter(services: &[ServiceDescriptor], opts: &SelectOptions) -> Vec<usize> {
        services
            .iter()
            .enumerate()
            .filter(|(_, si)| {
                if let Some((k, v)) = &opts.tag_filter {
                    if si.tag_str(k) != Some(v.as_str()) {
                        return false;
                    }
                }
                if let Some(class) = &opts.storage_class {
                    match si.tag_str(TAG_STORAGE_CLASS) {
                        Some(c) => {
                            if c != class {
                                return false;
                            }
                        }
                        None => {
                            if opts.strict_class {
                                return false;
                            }
                        }
                    }
                }
                true
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Candidates rotated by the slot cursor, wrapping.
    fn order_rr(slot: &Slot, candidates: &[usize]) -> Vec<usize> {
        let offset = slot.cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        let mut out = Vec::with_capacity(candidates.len());
        out.extend_from_slice(&candidates[offset..]);
        out.extend_from_slice(&candidates[..offset]);
        out
    }

    fn order_random(candidates: &[usize]) -> Vec<usize> {
        let mut out = candidates.to_vec();
        out.shuffle(&mut rand::rng());
        out
    }

    fn positive_weights(slot: &Slot, candidates: &[usize]) -> GridResult<Vec<(usize, i64)>> {
        let weighted: Vec<(usize, i64)> = candidates
            .iter()
            .filter(|&&i| slot.services[i].score > 0)
            .map(|&i| (i, i64::from(slot.services[i].score)))
            .collect();
        if weighted.is_empty() {
            return Err(GridError::policy_not_satisfiable("No scored service"));
        }
        Ok(weighted)
    }

    fn smooth_draw(
        state: &mut [i64],
        weighted: &[(usize, i64)],
        total: i64,
        taken: &HashSet<usize>,
    ) -> usize {
        let mut best: Option<usize> = None;
        for &(i, w) in weighted {
            state[i] += w;
            if !taken.contains(&i) && best.map_or(true, |b| state[i] > state[b]) {
                best = Some(i);
            }
        }
        let b = best.expect("non-empty weighted set");
        state[b] -= total;
        b
    }

    /// Smooth weighted round-robin over the candidates with a score
    /// above zero. Only the head draw is committed to the per-slot
    /// state (that is the pick consumed by single-service requests);
    /// the rest of the ordering runs on a local copy.
    fn order_wrr(slot: &Slot, candidates: &[usize]) -> GridResult<Vec<usize>> {
        let weighted = Self::positive_weights(slot, candidates)?;
        let total: i64 = weighted.iter().map(|(_, w)| w).sum();

        let mut taken = HashSet::new();
        let mut local;
        {
            let mut state = slot.wrr_state.lock().unwrap();
            let first = Self::smooth_draw(&mut *state, &weighted, total, &taken);
            taken.insert(first);
            local = state.clone();
        }
        let mut out: Vec<usize> = taken.iter().copied().collect();
        for _ in 1..weighted.len() {
            let next = Self::smooth_draw(&mut local, &weighted, total, &taken);
            taken.insert(next);
            out.push(next);
        }
        Ok(out)
    }

    /// Weighted random draw without replacement.
    fn order_wrand(slot: &Slot, candidates: &[usize]) -> GridResult<Vec<usize>> {
        let mut weighted = Self::positive_weights(slot, candidates)?;
        let mut rng = rand::rng();
        let mut out = Vec::with_capacity(weighted.len());
        while !weighted.is_empty() {
            let total: i64 = weighted.iter().map(|(_, w)| w).sum();
            let mut roll = rng.random_range(0..total);
            let mut chosen = weighted.len() - 1;
            for (pos, &(_, w)) in weighted.iter().enumerate() {
                if roll < w {
                    chosen = pos;
                    break;
                }
                roll -= w;
            }
            out.push(weighted.remove(chosen).0);
        }
        Ok(out)
    }
}
