//! Refreshers own the ongoing subscription for a bucket once bootstrap has
//! handed it a winning `LoaderType` (spec.md §4.3). Where a `Loader` answers
//! one request, a `Refresher` keeps pushing new configs until the bucket is
//! closed.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::loader::LoaderType;

/// A config as it arrives off the wire, before the acceptance engine has
/// parsed or accepted it.
///
/// `origin` is the address the payload was received from, carried through to
/// `ParserFacade::parse` for `$HOST`/loopback substitution (spec.md §4.1).
#[derive(Debug, Clone)]
pub struct ProposedBucketConfig {
    pub bucket: String,
    pub raw: String,
    pub origin: String,
}

/// Keeps one bucket's configuration current after bootstrap.
///
/// A single `Refresher` instance is shared across every bucket registered
/// against it. `register_bucket` is how the provider tells it to start
/// watching a given name (spec.md §4.3: "refreshers are long-lived, buckets
/// come and go").
#[async_trait]
pub trait Refresher: Send + Sync {
    fn loader_type(&self) -> LoaderType;

    /// Start pushing updates for `bucket` into the stream returned by
    /// `configs`. Calling this more than once for the same bucket is a no-op.
    async fn register_bucket(&self, bucket: &str, username: Option<&str>, password: &str) -> Result<()>;

    /// Stop pushing updates for `bucket`. Used when the embedding client
    /// closes a bucket it previously opened.
    async fn deregister_bucket(&self, bucket: &str) -> Result<()>;

    /// A stream of every config this refresher observes, across every bucket
    /// registered on it. The acceptance engine is responsible for filtering
    /// and applying them; a `Refresher` never decides what's "current".
    fn configs(&self) -> BoxStream<'static, ProposedBucketConfig>;
}
