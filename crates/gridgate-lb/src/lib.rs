//! Load-balanced selection over the locally cached cluster view.
//!
//! The [`LbPool`] keeps one immutable snapshot of live services per
//! service type, replaced atomically by the periodic downstream refresh.
//! Requests draw from a snapshot through one of five policies
//! ([`Policy`]) and a constraint set ([`SelectOptions`]): number of
//! services wanted, distinct hosts, optional storage-class match and
//! optional tag pre-filter.

mod pool;
mod select;

pub use pool::LbPool;
pub use select::{Policy, SelectOptions, TAG_STORAGE_CLASS};
