//! Shared vocabulary of the gridgate proxy.
//!
//! This crate holds the types every other gridgate crate speaks:
//!
//! - [`HubUrl`]: the logical name of a resource
//!   (`namespace/reference/path` plus free-form options),
//! - [`ServiceDescriptor`] and [`TagValue`]: a registered service with its
//!   score and typed tag set,
//! - [`ServiceUrl`]: one directory entry (`seq|host|args`),
//! - [`NamespaceInfo`]: the cluster configuration snapshot,
//! - [`GridError`]: the `(code, message)` error taxonomy shared by the
//!   HTTP envelope and the backend RPC protocol.

mod error;
mod nsinfo;
mod service;
mod url;

pub use error::{GridError, GridResult};
pub use error::{
    CODE_BAD_REQUEST, CODE_CONTAINER_EXISTS, CODE_CONTAINER_NOT_FOUND, CODE_CONTENT_NOT_FOUND,
    CODE_FORBIDDEN, CODE_INTERNAL, CODE_NAMESPACE_NOT_MANAGED, CODE_NETWORK_ERROR,
    CODE_NOT_FOUND, CODE_NOT_IMPLEMENTED, CODE_POLICY_NOT_SATISFIABLE, CODE_TIMEOUT,
    CODE_TYPE_NOT_MANAGED, CODE_UNAVAILABLE,
};
pub use nsinfo::NamespaceInfo;
pub use service::{ServiceDescriptor, ServiceUrl, TagValue};
pub use url::HubUrl;
