//! The `ConfigurationProvider`: bootstraps buckets, runs the acceptance
//! engine, and publishes accepted snapshots to subscribers (spec.md §4-5).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex, RwLock};

use arc_swap::ArcSwap;
use futures::future::{Shared, FutureExt};
use futures::StreamExt;
use tokio::sync::{broadcast, Mutex as AsyncMutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::environment::Environment;
use crate::error::{ProviderError, Result};
use crate::loader::{Loader, LoaderType};
use crate::model::{BucketConfig, ClusterConfig};
use crate::network::NetworkResolver;
use crate::refresher::{ProposedBucketConfig, Refresher};

type BootstrapFuture = Pin<Box<dyn Future<Output = std::result::Result<(), Arc<ProviderError>>> + Send>>;

/// Builds a `ConfigurationProvider` with its registered loaders and
/// refreshers (spec.md §4: "assembled once at client construction time").
pub struct ConfigurationProviderBuilder {
    environment: Environment,
    loaders: Vec<Arc<dyn Loader>>,
    refreshers: Vec<Arc<dyn Refresher>>,
}

impl ConfigurationProviderBuilder {
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            loaders: Vec::new(),
            refreshers: Vec::new(),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn Refresher>) -> Self {
        self.refreshers.push(refresher);
        self
    }

    /// Assembles the provider and starts one background task per refresher
    /// that feeds its `configs()` stream into the acceptance engine.
    pub fn build(self) -> Arc<ConfigurationProvider> {
        let (publisher, _) = broadcast::channel(64);
        let refreshers: HashMap<LoaderType, Arc<dyn Refresher>> = self
            .refreshers
            .into_iter()
            .map(|r| (r.loader_type(), r))
            .collect();

        let provider = Arc::new(ConfigurationProvider {
            environment: self.environment,
            seeds: RwLock::new(Vec::new()),
            directly_connected: std::sync::atomic::AtomicBool::new(false),
            loaders: self.loaders,
            refreshers: refreshers.clone(),
            current: ArcSwap::from_pointee(ClusterConfig::empty()),
            accept_lock: StdMutex::new(()),
            publisher,
            in_flight: AsyncMutex::new(HashMap::new()),
        });

        for refresher in refreshers.values() {
            ConfigurationProvider::spawn_refresher_pump(provider.clone(), refresher.clone());
        }

        provider
    }
}

/// The authoritative in-process source of bucket/cluster topology for a
/// running client (spec.md §1).
pub struct ConfigurationProvider {
    environment: Environment,
    seeds: RwLock<Vec<String>>,
    /// Whether the current seed set was supplied directly by the caller
    /// (`true`) rather than resolved from a DNS SRV record by a collaborator
    /// upstream of this crate (spec.md §6, `seedHosts`'s `directlyConnected`
    /// flag). `ccp-core` doesn't perform SRV resolution itself (spec.md §1
    /// names "name/address resolution primitives" as an external
    /// collaborator); this flag is carried through so such a collaborator
    /// can tell, after a bootstrap failure, whether falling back to SRV
    /// re-resolution is meaningful.
    directly_connected: std::sync::atomic::AtomicBool,
    loaders: Vec<Arc<dyn Loader>>,
    refreshers: HashMap<LoaderType, Arc<dyn Refresher>>,
    current: ArcSwap<ClusterConfig>,
    /// Serializes the parse-compare-swap critical section; released before
    /// broadcasting so slow subscribers never hold up acceptance (spec.md
    /// §5).
    accept_lock: StdMutex<()>,
    publisher: broadcast::Sender<ClusterConfig>,
    /// In-flight bootstraps, keyed by bucket name, so concurrent
    /// `open_bucket` calls for the same bucket share one pipeline run
    /// (spec.md §9, resolved Open Question).
    in_flight: AsyncMutex<HashMap<String, Shared<BootstrapFuture>>>,
}

impl ConfigurationProvider {
    pub fn builder(environment: Environment) -> ConfigurationProviderBuilder {
        ConfigurationProviderBuilder::new(environment)
    }

    /// Replaces the seed set used for subsequent bootstraps and `Auto`
    /// network resolution. Does not affect buckets already open.
    ///
    /// `directly_connected` records whether `seeds` were supplied literally
    /// by the caller rather than resolved from a DNS SRV record (spec.md
    /// §6); see `directly_connected()`.
    pub fn seed_hosts(&self, seeds: Vec<String>, directly_connected: bool) {
        *self.seeds.write().unwrap() = seeds;
        self.directly_connected
            .store(directly_connected, std::sync::atomic::Ordering::SeqCst);
    }

    /// Whether the current seed set was supplied directly, per the most
    /// recent `seed_hosts` call.
    pub fn directly_connected(&self) -> bool {
        self.directly_connected.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn current_seeds(&self) -> Vec<String> {
        self.seeds.read().unwrap().clone()
    }

    /// The current cluster-wide snapshot.
    pub fn config(&self) -> Arc<ClusterConfig> {
        self.current.load_full()
    }

    /// Subscribes to every accepted snapshot from this point forward. No
    /// replay: a late subscriber must call `config()` first for the current
    /// state (spec.md §5, "no-replay publication stream").
    pub fn configs(&self) -> broadcast::Receiver<ClusterConfig> {
        self.publisher.subscribe()
    }

    /// Bootstraps `bucket` if it isn't already open, racing every registered
    /// loader against every configured seed and keeping the first success
    /// (spec.md §4.2). Concurrent calls for the same bucket name share one
    /// underlying bootstrap.
    pub async fn open_bucket(
        self: &Arc<Self>,
        bucket: &str,
        username: Option<&str>,
        password: &str,
    ) -> Result<Arc<ClusterConfig>> {
        if self.current.load().has_bucket(bucket) {
            return Ok(self.config());
        }

        let seeds = self.current_seeds();
        if seeds.is_empty() {
            return Err(ProviderError::BootstrapFailed);
        }

        let shared = {
            let mut in_flight = self.in_flight.lock().await;
            if let Some(existing) = in_flight.get(bucket) {
                existing.clone()
            } else {
                let provider = self.clone();
                let bucket = bucket.to_string();
                let username = username.map(str::to_string);
                let password = password.to_string();
                let fut: BootstrapFuture = Box::pin(async move {
                    provider
                        .bootstrap(&bucket, seeds, username.as_deref(), &password)
                        .await
                        .map_err(Arc::new)
                });
                let shared = fut.shared();
                in_flight.insert(bucket.clone(), shared.clone());
                shared
            }
        };

        let result = shared.await;
        self.in_flight.lock().await.remove(bucket);
        result.map_err(unwrap_shared_error)?;
        Ok(self.config())
    }

    async fn bootstrap(
        self: &Arc<Self>,
        bucket: &str,
        seeds: Vec<String>,
        username: Option<&str>,
        password: &str,
    ) -> Result<()> {
        // Loader order is strict: a loader is only tried once every seed has
        // been raced against the previous one and lost (spec.md §4.2). Within
        // one loader, every seed races concurrently and a non-responding
        // seed must not hold up a winning one.
        let mut winner: Option<(LoaderType, BucketConfig)> = None;
        'loaders: for loader in &self.loaders {
            let mut tasks = JoinSet::new();
            for seed in &seeds {
                let loader = loader.clone();
                let seed = seed.clone();
                let bucket = bucket.to_string();
                let username = username.map(str::to_string);
                let password = password.to_string();
                tasks.spawn(async move {
                    let config = loader
                        .load_config(&seed, &bucket, username.as_deref(), &password)
                        .await;
                    (seed, config)
                });
            }

            while let Some(joined) = tasks.join_next().await {
                let (seed, outcome) = match joined {
                    Ok(v) => v,
                    Err(_) => continue, // task panicked or was aborted
                };
                match outcome {
                    Ok(config) => {
                        info!(bucket, seed, loader_type = ?loader.loader_type(), "loader produced a config");
                        winner = Some((loader.loader_type(), config));
                        break;
                    }
                    Err(err) => {
                        debug!(bucket, seed, loader_type = ?loader.loader_type(), error = %err, "loader failed");
                    }
                }
            }
            tasks.abort_all();

            if winner.is_some() {
                break 'loaders;
            }
        }

        let (loader_type, config) = winner.ok_or(ProviderError::BootstrapFailed)?;

        let refresher = self
            .refreshers
            .get(&loader_type)
            .ok_or(ProviderError::MissingRefresher(loader_type))?;
        refresher
            .register_bucket(bucket, username, password)
            .await
            .map_err(|e| ProviderError::RefresherRegistrationFailed {
                reason: e.to_string(),
            })?;

        let config = self.apply_network_resolution(config, &seeds);

        if !self.accept(config) {
            return Err(ProviderError::BootstrapFailed);
        }

        Ok(())
    }

    /// Feeds a config observed by a refresher (or any other collaborator)
    /// through the acceptance engine. A malformed payload or a stale/missing
    /// revision is ignored silently, exactly as for any other rejected
    /// proposal. `proposeBucketConfig` is fire-and-forget and never reports
    /// "ignored" as an error (spec.md §4.3, §7).
    pub async fn propose_bucket_config(&self, proposal: ProposedBucketConfig) -> Result<()> {
        let parsed = match crate::parser::ParserFacade::parse(
            &proposal.raw,
            &self.environment,
            &proposal.origin,
        ) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(bucket = %proposal.bucket, error = %err, "ignoring unparseable proposed config");
                return Ok(());
            }
        };

        let seeds = self.current_seeds();
        let resolved = self.apply_network_resolution(parsed, &seeds);

        if !self.accept(resolved) {
            debug!(bucket = %proposal.bucket, "ignoring proposed config: missing or non-increasing revision");
        }
        Ok(())
    }

    fn apply_network_resolution(&self, config: BucketConfig, seeds: &[String]) -> BucketConfig {
        let network = NetworkResolver::resolve(&config, &self.environment.network_resolution, seeds);
        config.with_resolved_network(network)
    }

    /// The acceptance engine's critical section: parse is already done by the
    /// caller, this just compares revisions and swaps the snapshot in. Held
    /// only for the compare-and-swap, never across the broadcast send
    /// (spec.md §5).
    fn accept(&self, config: BucketConfig) -> bool {
        let _guard = self.accept_lock.lock().unwrap();

        let current = self.current.load();
        let accepted = match (config.rev(), current.bucket_config(config.name())) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(new_rev), Some(existing)) => match existing.rev() {
                Some(existing_rev) => new_rev > existing_rev,
                None => true,
            },
        };

        if !accepted {
            return false;
        }

        let next = current.with_bucket(Arc::new(config));
        drop(current);
        self.current.store(Arc::new(next.clone()));
        drop(_guard);

        // Broadcasting can't fail in a way the acceptance engine cares about;
        // `Err` here just means nobody's listening right now.
        let _ = self.publisher.send(next);
        true
    }

    fn spawn_refresher_pump(provider: Arc<ConfigurationProvider>, refresher: Arc<dyn Refresher>) {
        tokio::spawn(async move {
            let mut stream = refresher.configs();
            while let Some(proposal) = stream.next().await {
                if let Err(err) = provider.propose_bucket_config(proposal).await {
                    warn!(error = %err, "rejected proposed bucket config");
                }
            }
        });
    }
}

/// `Shared` requires a `Clone` output, but `ProviderError` isn't `Clone`
/// (it carries `reqwest::Error`/`anyhow::Error`), so the dedup path stores
/// `Arc<ProviderError>` and reconstructs a fresh owned error for each
/// concurrent caller on the way out.
fn unwrap_shared_error(err: Arc<ProviderError>) -> ProviderError {
    match &*err {
        ProviderError::BootstrapFailed => ProviderError::BootstrapFailed,
        ProviderError::MissingRefresher(loader_type) => ProviderError::MissingRefresher(*loader_type),
        ProviderError::RefresherRegistrationFailed { reason } => {
            ProviderError::RefresherRegistrationFailed { reason: reason.clone() }
        }
        ProviderError::InvalidConfig { reason } => ProviderError::InvalidConfig { reason: reason.clone() },
        other => ProviderError::Other(anyhow::anyhow!(other.to_string())),
    }
}
