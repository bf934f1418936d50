//! The immutable, parsed view of cluster topology: nodes, buckets, and the
//! cluster-wide snapshot the provider publishes.

pub mod bucket;
pub mod cluster_config;
pub mod node;

pub use bucket::{BucketConfig, CouchbaseBucketConfig, EphemeralBucketConfig, MemcachedBucketConfig};
pub use cluster_config::ClusterConfig;
pub use node::{AlternateAddress, NodeInfo, Port, ResolvedHostname, ServiceType};
