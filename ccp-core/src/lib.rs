//! The authoritative in-process source of bucket/cluster topology
//! configuration for a distributed key-value/document database client.
//!
//! A `ConfigurationProvider` bootstraps buckets from a set of seed hosts,
//! runs every incoming config through an acceptance engine that enforces
//! revision monotonicity, and publishes accepted snapshots to subscribers.
//! Everything else in this crate exists to support that: the parsed
//! `model`, the `ketama` consistent-hash ring for memcached-style buckets,
//! the `network` resolution policy, and the `loader`/`refresher`
//! abstraction boundary that keeps wire protocols pluggable.

pub mod environment;
pub mod error;
pub mod ketama;
pub mod loader;
pub mod model;
pub mod network;
pub mod parser;
pub mod provider;
pub mod refresher;

pub use environment::{Environment, NetworkResolution};
pub use error::{ProviderError, Result};
pub use loader::{CarrierLoader, CarrierTransport, HttpLoader, Loader, LoaderType};
pub use model::{AlternateAddress, BucketConfig, ClusterConfig, NodeInfo, Port, ServiceType};
pub use network::NetworkResolver;
pub use parser::ParserFacade;
pub use provider::{ConfigurationProvider, ConfigurationProviderBuilder};
pub use refresher::{ProposedBucketConfig, Refresher};
