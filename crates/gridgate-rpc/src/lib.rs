//! Backend seam of the proxy.
//!
//! The three internal service classes are reached through object-safe
//! client traits so tests can swap scripted backends in:
//!
//! - [`ConscienceClient`]: cluster registry (service listings, bulk
//!   registration push, namespace configuration),
//! - [`DirectoryClient`]: the reference directory (meta1),
//! - [`ContainerClient`]: the container/object metadata service (meta2).
//!
//! The wire transport is [`RpcChannel`]: length-prefixed JSON frames
//! carrying a request id, with separate connect and overall deadlines.
//! Everything a backend answers is mapped onto the shared
//! `(code, message)` taxonomy: transport failures get codes below 100
//! and stay retryable, reply statuses above 100 surface as application
//! errors.
//!
//! The [`Bean`] model is the opaque record set of the container service
//! (alias / header / content / chunk), serialized with the fixed field
//! names of the wire schema.

mod beans;
mod channel;
mod clients;
mod grid;

pub use beans::{
    beans_to_sections, decode_sections, dump_sections, section_from_body, AliasBean, Bean,
    ChunkBean, ContentBean, HeaderBean,
};
pub use channel::{RpcChannel, RpcTimeouts};
pub use clients::{ConscienceClient, ContainerClient, DirectoryClient, LinkMode};
pub use grid::{GridConscience, GridContainer, GridDirectory};
