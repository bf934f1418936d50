//! Decides, per bucket configuration, whether clients should address nodes
//! by their default addresses or by an alternate ("external") set.

use crate::environment::NetworkResolution;
use crate::model::BucketConfig;

/// Stateless policy evaluator. Takes the environment's configured policy plus
/// (for `Auto`) the seed set active at resolution time, and returns the
/// network name to select. `None` means "use default addresses".
pub struct NetworkResolver;

impl NetworkResolver {
    /// Resolve the network to use for `bucket`, given the `policy` in effect
    /// and the `seeds` currently configured on the provider.
    pub fn resolve(
        bucket: &BucketConfig,
        policy: &NetworkResolution,
        seeds: &[String],
    ) -> Option<String> {
        match policy {
            NetworkResolution::Default => None,
            NetworkResolution::External => Self::resolve_named(bucket, "external"),
            NetworkResolution::Custom(name) => Self::resolve_named(bucket, name),
            NetworkResolution::Auto => Self::resolve_auto(bucket, seeds),
        }
    }

    fn resolve_named(bucket: &BucketConfig, network: &str) -> Option<String> {
        let any_node_has_it = bucket
            .nodes()
            .iter()
            .any(|node| node.alternate(network).is_some());
        any_node_has_it.then(|| network.to_string())
    }

    fn resolve_auto(bucket: &BucketConfig, seeds: &[String]) -> Option<String> {
        for seed in seeds {
            let seed_host = strip_port(seed);
            for node in bucket.nodes() {
                if node.hostname.address() == seed_host {
                    return None;
                }
                for (network_name, alt) in &node.alternate_addresses {
                    if alt.hostname.address() == seed_host {
                        return Some(network_name.clone());
                    }
                }
            }
        }
        None
    }
}

/// Seeds are commonly supplied as `host:port`; the hostname comparison in
/// `spec.md` §4.4 is against the bare host.
fn strip_port(seed: &str) -> &str {
    if seed.starts_with('[') {
        // IPv6 literal with brackets, e.g. "[::1]:11210".
        return seed
            .rsplit_once("]:")
            .map(|(host, _)| host.trim_start_matches('['))
            .unwrap_or(seed);
    }
    seed.rsplit_once(':')
        .map(|(host, port)| {
            if port.chars().all(|c| c.is_ascii_digit()) {
                host
            } else {
                seed
            }
        })
        .unwrap_or(seed)
}
