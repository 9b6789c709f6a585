//! Two-tier cached name resolution.
//!
//! The resolver maps logical names to backend addresses through two
//! independently bounded TTL caches:
//!
//! - the **high tier** (`csm0`) maps a namespace to its directory
//!   (meta0/meta1) server set,
//! - the **low tier** (`services`) maps `(namespace, reference,
//!   service-type)` to the packed service URLs linked to the reference.
//!
//! A low-tier miss first resolves the directory through the high tier,
//! then asks one directory replica after the other for the services of
//! the requested type. Transport failures move on to the next replica;
//! application errors surface with the failing tier named in the
//! message.
//!
//! Cache upkeep (the periodic [`Resolver::expire`]/[`Resolver::purge`]
//! passes) and runtime tuning (TTL/max setters, flushes) are driven from
//! the outside; the resolver only shares one monotonic clock reading
//! between the tiers, advanced with [`Resolver::set_now`].

mod backend;
mod resolver;

pub use backend::DirectoryBackend;
pub use resolver::{Resolver, ResolverConfig, ResolverStats};
