use std::collections::BTreeMap;

use super::NodeInfo;
use crate::ketama::KetamaRing;

/// Fields shared by every bucket config variant (spec.md §3 "BucketConfig
/// (common)").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonBucketConfig {
    pub name: String,
    pub uuid: Option<String>,
    pub rev: Option<u64>,
    pub nodes: Vec<NodeInfo>,
    /// Assigned by the `NetworkResolver`, never by the parser. `None` means
    /// "use default addresses"; `Some(name)` names the alternate network.
    pub use_alternate_network: Option<String>,
}

/// Opaque partition/replica map payload for a Couchbase (vBucket) bucket.
/// The core only reads identity/name/rev/nodes/alternates; the partition map
/// itself is read by the (out-of-scope) vbucket router.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VbucketMapPayload(pub serde_json::Value);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouchbaseBucketConfig {
    pub common: CommonBucketConfig,
    pub vbucket_map: VbucketMapPayload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemcachedBucketConfig {
    pub common: CommonBucketConfig,
    pub ketama_ring: KetamaRing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EphemeralBucketConfig {
    pub common: CommonBucketConfig,
    pub vbucket_map: VbucketMapPayload,
}

/// Tagged union over the three bucket topology kinds a cluster config can
/// describe. Consumers branch on the variant rather than on a deep
/// inheritance hierarchy (Design Notes, spec.md §9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketConfig {
    Couchbase(CouchbaseBucketConfig),
    Memcached(MemcachedBucketConfig),
    Ephemeral(EphemeralBucketConfig),
}

impl BucketConfig {
    pub fn common(&self) -> &CommonBucketConfig {
        match self {
            BucketConfig::Couchbase(c) => &c.common,
            BucketConfig::Memcached(c) => &c.common,
            BucketConfig::Ephemeral(c) => &c.common,
        }
    }

    fn common_mut(&mut self) -> &mut CommonBucketConfig {
        match self {
            BucketConfig::Couchbase(c) => &mut c.common,
            BucketConfig::Memcached(c) => &mut c.common,
            BucketConfig::Ephemeral(c) => &mut c.common,
        }
    }

    pub fn name(&self) -> &str {
        &self.common().name
    }

    pub fn uuid(&self) -> Option<&str> {
        self.common().uuid.as_deref()
    }

    pub fn rev(&self) -> Option<u64> {
        self.common().rev
    }

    pub fn nodes(&self) -> &[NodeInfo] {
        &self.common().nodes
    }

    pub fn use_alternate_network(&self) -> Option<&str> {
        self.common().use_alternate_network.as_deref()
    }

    /// Returns a clone of this config with `use_alternate_network` set to the
    /// resolver's decision. `BucketConfig` values are otherwise immutable
    /// once parsed (spec.md §3 "Lifecycle").
    pub fn with_resolved_network(&self, network: Option<String>) -> Self {
        let mut clone = self.clone();
        clone.common_mut().use_alternate_network = network;
        clone
    }

    pub fn ketama_ring(&self) -> Option<&KetamaRing> {
        match self {
            BucketConfig::Memcached(c) => Some(&c.ketama_ring),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketKind {
    Couchbase,
    Memcached,
    Ephemeral,
}

impl BucketConfig {
    pub fn kind(&self) -> BucketKind {
        match self {
            BucketConfig::Couchbase(_) => BucketKind::Couchbase,
            BucketConfig::Memcached(_) => BucketKind::Memcached,
            BucketConfig::Ephemeral(_) => BucketKind::Ephemeral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn common(rev: Option<u64>) -> CommonBucketConfig {
        CommonBucketConfig {
            name: "default".to_string(),
            uuid: None,
            rev,
            nodes: vec![],
            use_alternate_network: None,
        }
    }

    #[test]
    fn missing_uuid_is_none() {
        let bucket = BucketConfig::Ephemeral(EphemeralBucketConfig {
            common: common(Some(1)),
            vbucket_map: VbucketMapPayload::default(),
        });
        assert_eq!(bucket.uuid(), None);
    }

    #[test]
    fn with_resolved_network_does_not_mutate_original() {
        let bucket = BucketConfig::Ephemeral(EphemeralBucketConfig {
            common: common(Some(1)),
            vbucket_map: VbucketMapPayload::default(),
        });
        let resolved = bucket.with_resolved_network(Some("external".to_string()));
        assert_eq!(bucket.use_alternate_network(), None);
        assert_eq!(resolved.use_alternate_network(), Some("external"));
    }
}
