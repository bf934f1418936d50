//! Loaders are responsible for fetching a bucket's *first* configuration
//! during bootstrap (spec.md §4.2). Ongoing updates are the `Refresher`'s job.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::environment::Environment;
use crate::error::{ProviderError, Result};
use crate::model::BucketConfig;
use crate::parser::ParserFacade;

/// Identifies which transport produced a config, so the provider can look up
/// the matching `Refresher` to hand ongoing updates to (spec.md §4.2: "the
/// refresher for the winning loader's transport takes over").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoaderType {
    /// The binary memcached-protocol "carrier" channel.
    Carrier,
    /// Plain HTTP GET/streaming against the cluster manager.
    Http,
}

/// Fetches one bucket configuration from one seed node.
///
/// Implementations are expected to be cheap to construct and safe to call
/// concurrently. The bootstrap pipeline races every registered loader
/// against every seed at once (spec.md §4.2).
#[async_trait]
pub trait Loader: Send + Sync {
    fn loader_type(&self) -> LoaderType;

    async fn load_config(
        &self,
        seed: &str,
        bucket: &str,
        username: Option<&str>,
        password: &str,
    ) -> Result<BucketConfig>;
}

/// Collaborator that speaks the binary memcached wire protocol well enough to
/// ask a node for its current config. The wire protocol itself is out of
/// scope for this crate (spec.md §1 names it as an external collaborator);
/// `CarrierLoader` only owns the retry/parse glue around it.
#[async_trait]
pub trait CarrierTransport: Send + Sync {
    /// Returns the raw JSON config payload as reported by `seed`.
    async fn fetch_config(
        &self,
        seed: &str,
        bucket: &str,
        username: Option<&str>,
        password: &str,
    ) -> anyhow::Result<String>;
}

pub struct CarrierLoader<T: CarrierTransport> {
    transport: T,
}

impl<T: CarrierTransport> CarrierLoader<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl<T: CarrierTransport> Loader for CarrierLoader<T> {
    fn loader_type(&self) -> LoaderType {
        LoaderType::Carrier
    }

    async fn load_config(
        &self,
        seed: &str,
        bucket: &str,
        username: Option<&str>,
        password: &str,
    ) -> Result<BucketConfig> {
        debug!(seed, bucket, "fetching config over carrier channel");
        let raw = self
            .transport
            .fetch_config(seed, bucket, username, password)
            .await
            .map_err(ProviderError::Other)?;
        ParserFacade::parse(&raw, &Environment::default(), origin_of(seed))
    }
}

/// Fetches a bucket config over plain HTTP. This is the one transport this
/// crate terminates itself, since a client embedding it can reasonably be
/// expected to carry an HTTP stack (spec.md §4.2, "HTTP streaming loader").
pub struct HttpLoader {
    client: reqwest::Client,
    cluster_manager_port: u16,
}

impl HttpLoader {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            cluster_manager_port: 8091,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.cluster_manager_port = port;
        self
    }
}

#[async_trait]
impl Loader for HttpLoader {
    fn loader_type(&self) -> LoaderType {
        LoaderType::Http
    }

    async fn load_config(
        &self,
        seed: &str,
        bucket: &str,
        username: Option<&str>,
        password: &str,
    ) -> Result<BucketConfig> {
        let host = origin_of(seed);
        let url = format!(
            "http://{}:{}/pools/default/b/{}",
            host, self.cluster_manager_port, bucket
        );
        debug!(url, "fetching config over http");

        let mut request = self.client.get(&url);
        if let Some(username) = username {
            request = request.basic_auth(username, Some(password));
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            warn!(url, status = %response.status(), "loader request failed");
            return Err(ProviderError::InvalidConfig {
                reason: format!("unexpected status {} from {url}", response.status()),
            });
        }

        let body = response.text().await?;
        ParserFacade::parse(&body, &Environment::default(), host)
    }
}

/// Strips a trailing `:port` from a seed address, leaving the bare host the
/// parser should substitute for `$HOST`/loopback placeholders.
fn origin_of(seed: &str) -> &str {
    if seed.starts_with('[') {
        return seed
            .rsplit_once("]:")
            .map(|(host, _)| host.trim_start_matches('['))
            .unwrap_or(seed.trim_start_matches('[').trim_end_matches(']'));
    }
    match seed.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => seed,
    }
}
