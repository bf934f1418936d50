use std::collections::BTreeMap;
use std::sync::Arc;

use super::BucketConfig;

/// An immutable snapshot mapping bucket name to its current configuration.
///
/// A new `ClusterConfig` is produced on every accepted change (spec.md §3);
/// existing snapshots are never mutated. Buckets unaffected by a change share
/// their `Arc<BucketConfig>` with the previous snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClusterConfig {
    buckets: BTreeMap<String, Arc<BucketConfig>>,
}

impl ClusterConfig {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn has_bucket(&self, name: &str) -> bool {
        self.buckets.contains_key(name)
    }

    pub fn bucket_config(&self, name: &str) -> Option<&Arc<BucketConfig>> {
        self.buckets.get(name)
    }

    pub fn bucket_configs(&self) -> impl Iterator<Item = &Arc<BucketConfig>> {
        self.buckets.values()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Returns a new snapshot with `bucket` inserted/replaced under its own
    /// name. The receiver is left untouched; snapshots are values.
    pub fn with_bucket(&self, bucket: Arc<BucketConfig>) -> Self {
        let mut buckets = self.buckets.clone();
        buckets.insert(bucket.name().to_string(), bucket);
        Self { buckets }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::bucket::{CommonBucketConfig, EphemeralBucketConfig, VbucketMapPayload};

    fn bucket(name: &str, rev: u64) -> Arc<BucketConfig> {
        Arc::new(BucketConfig::Ephemeral(EphemeralBucketConfig {
            common: CommonBucketConfig {
                name: name.to_string(),
                uuid: None,
                rev: Some(rev),
                nodes: vec![],
                use_alternate_network: None,
            },
            vbucket_map: VbucketMapPayload::default(),
        }))
    }

    #[test]
    fn with_bucket_is_immutable() {
        let empty = ClusterConfig::empty();
        let updated = empty.with_bucket(bucket("default", 1));

        assert!(!empty.has_bucket("default"));
        assert!(updated.has_bucket("default"));
        assert_eq!(updated.bucket_config("default").unwrap().rev(), Some(1));
    }

    #[test]
    fn unrelated_buckets_survive_an_update() {
        let one = ClusterConfig::empty().with_bucket(bucket("a", 1));
        let two = one.with_bucket(bucket("b", 1));

        assert!(two.has_bucket("a"));
        assert!(two.has_bucket("b"));
        assert_eq!(two.len(), 2);
    }
}
