//! Discovery seam used to fill cache misses.

use async_trait::async_trait;
use gridgate_core::{GridResult, HubUrl};

/// The upstream lookups the resolver performs on a cache miss.
///
/// Implementations talk to the conscience and the directory servers; the
/// resolver itself never opens a connection.
#[async_trait]
pub trait DirectoryBackend: Send + Sync {
    /// Addresses of the directory (meta1) servers of a namespace.
    async fn directory_urls(&self, ns: &str) -> GridResult<Vec<String>>;

    /// Packed service URLs (`seq|host|args`) of the given type linked to
    /// the URL's reference, as known by one directory replica.
    async fn reference_services(
        &self,
        dir_addr: &str,
        url: &HubUrl,
        srvtype: &str,
    ) -> GridResult<Vec<String>>;
}
