//! End-to-end scenarios against scripted backends.
//!
//! Test organization:
//! - scenarios.rs: the REST surface end to end (listing, resolution,
//!   cache tuning, soft errors)
//! - retry.rs: the replica retry loop and its decache policy
//! - registration.rs: the registration flow and the push queue

mod registration;
mod scenarios;
