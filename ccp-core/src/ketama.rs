//! Ketama consistent-hash ring construction for memcached-style buckets.
//!
//! Standard libketama: for each node, for `i` in `[0, 40)`, hash
//! `MD5("<host>-<i>")` and read the digest as four little-endian u32 "points",
//! 160 points per node in total. Each point maps to the node on the ring.

use std::collections::BTreeMap;

use md5::{Digest, Md5};

use crate::model::NodeInfo;

/// `hash -> node` mapping derived from a memcached bucket's data nodes.
///
/// Only nodes carrying the key-value binary service are placed on the ring;
/// every entry is backed by a node present in the owning bucket's `nodes`
/// list (spec.md §3 invariant on `MemcachedBucketConfig::ketamaNodes`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KetamaRing {
    points: BTreeMap<u64, NodeInfo>,
}

const REPLICAS: usize = 40;
const POINTS_PER_REPLICA: usize = 4;

impl KetamaRing {
    /// Build a ring from the subset of `nodes` that advertise the key-value
    /// binary service. Nodes without that service are simply excluded, though
    /// they still appear in the bucket's `nodes` list, just not on the ring.
    pub fn build(nodes: &[NodeInfo]) -> Self {
        let mut points = BTreeMap::new();
        for node in nodes {
            if !node.has_key_value_service() {
                continue;
            }
            for point in ketama_points(&ketama_key(node)) {
                points.insert(point, node.clone());
            }
        }
        Self { points }
    }

    /// Look up the node owning a given 64-bit hash, i.e. the first ring point
    /// at or after `hash`, wrapping around to the smallest point.
    pub fn node_for_hash(&self, hash: u64) -> Option<&NodeInfo> {
        self.points
            .range(hash..)
            .next()
            .or_else(|| self.points.iter().next())
            .map(|(_, node)| node)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &NodeInfo> {
        self.points.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &NodeInfo)> {
        self.points.iter()
    }
}

/// The host identifier ketama hashes. Real servers key the ring off
/// `host:port` of the plaintext key-value service.
fn ketama_key(node: &NodeInfo) -> String {
    let port = node
        .services
        .get(&crate::model::ServiceType::KeyValue)
        .map(|p| p.get())
        .unwrap_or(0);
    format!("{}:{}", node.hostname.address(), port)
}

fn ketama_points(key: &str) -> impl Iterator<Item = u64> {
    (0..REPLICAS).flat_map(move |i| {
        let digest = Md5::digest(format!("{key}-{i}").as_bytes());
        (0..POINTS_PER_REPLICA).map(move |p| point_from_digest(&digest, p))
    })
}

fn point_from_digest(digest: &[u8], index: usize) -> u64 {
    let base = index * 4;
    (u32::from(digest[base])
        | (u32::from(digest[base + 1]) << 8)
        | (u32::from(digest[base + 2]) << 16)
        | (u32::from(digest[base + 3]) << 24)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Port, ServiceType};
    use std::collections::BTreeMap;

    fn data_node(host: &str, kv_port: u16) -> NodeInfo {
        let mut services = BTreeMap::new();
        services.insert(ServiceType::KeyValue, Port::new(kv_port).unwrap());
        NodeInfo {
            hostname: crate::model::ResolvedHostname::new(host),
            raw_hostname: host.to_string(),
            services,
            ssl_services: BTreeMap::new(),
            alternate_addresses: BTreeMap::new(),
        }
    }

    fn non_data_node(host: &str) -> NodeInfo {
        let mut services = BTreeMap::new();
        services.insert(ServiceType::Management, Port::new(8091).unwrap());
        NodeInfo {
            hostname: crate::model::ResolvedHostname::new(host),
            raw_hostname: host.to_string(),
            services,
            ssl_services: BTreeMap::new(),
            alternate_addresses: BTreeMap::new(),
        }
    }

    #[test]
    fn places_160_points_per_data_node() {
        let nodes = vec![data_node("192.168.56.101", 11210)];
        let ring = KetamaRing::build(&nodes);
        assert_eq!(ring.len(), 160);
    }

    #[test]
    fn excludes_nodes_without_key_value_service() {
        let nodes = vec![
            data_node("192.168.56.101", 11210),
            non_data_node("192.168.56.103"),
        ];
        let ring = KetamaRing::build(&nodes);
        assert_eq!(ring.len(), 160);
        assert!(ring
            .values()
            .all(|n| n.hostname.address() == "192.168.56.101"));
    }

    #[test]
    fn lookup_wraps_around() {
        let nodes = vec![data_node("a", 11210), data_node("b", 11210)];
        let ring = KetamaRing::build(&nodes);
        assert!(ring.node_for_hash(u64::MAX).is_some());
        assert!(ring.node_for_hash(0).is_some());
    }
}
