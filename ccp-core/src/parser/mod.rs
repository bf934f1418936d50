//! Turns a raw JSON config payload plus an `Environment` into a `BucketConfig`
//! (spec.md §4.1).

mod raw;

use std::collections::BTreeMap;

use raw::{RawAlternateAddress, RawConfig, RawNode};

use crate::error::{ProviderError, Result};
use crate::environment::Environment;
use crate::ketama::KetamaRing;
use crate::model::bucket::{
    CommonBucketConfig, CouchbaseBucketConfig, EphemeralBucketConfig, MemcachedBucketConfig,
    VbucketMapPayload,
};
use crate::model::{AlternateAddress, BucketConfig, NodeInfo, Port, ResolvedHostname, ServiceType};

/// Stateless translator from wire JSON to the immutable `BucketConfig` model.
pub struct ParserFacade;

impl ParserFacade {
    /// Parse `raw` (a JSON payload) as seen from `origin` (the address the
    /// payload was fetched from, used to substitute `$HOST`/loopback
    /// placeholders). `environment` is accepted for symmetry with the rest of
    /// the pipeline but network resolution is applied later by the
    /// `NetworkResolver` (spec.md §3: "assigned by the resolver, not by the
    /// parser").
    pub fn parse(raw: &str, _environment: &Environment, origin: &str) -> Result<BucketConfig> {
        let parsed: RawConfig = serde_json::from_str(raw).map_err(|e| ProviderError::InvalidConfig {
            reason: format!("malformed JSON: {e}"),
        })?;

        if parsed.name.is_empty() {
            return Err(ProviderError::InvalidConfig {
                reason: "missing or empty bucket name".to_string(),
            });
        }

        let nodes: Vec<NodeInfo> = parsed
            .nodes
            .iter()
            .map(|n| build_node(n, origin))
            .collect::<Result<_>>()?;

        if nodes.is_empty() {
            return Err(ProviderError::InvalidConfig {
                reason: format!("bucket '{}' has no nodes", parsed.name),
            });
        }

        let rev = raw::parse_rev(&parsed.rev);
        let common = CommonBucketConfig {
            name: parsed.name.clone(),
            uuid: parsed.uuid.clone(),
            rev,
            nodes,
            use_alternate_network: None,
        };

        let is_ketama = parsed.node_locator.as_deref() == Some("ketama");
        let is_ephemeral = parsed.bucket_type.as_deref() == Some("ephemeral");

        let bucket = if is_ketama {
            let ketama_ring = KetamaRing::build(&common.nodes);
            BucketConfig::Memcached(MemcachedBucketConfig { common, ketama_ring })
        } else if is_ephemeral {
            BucketConfig::Ephemeral(EphemeralBucketConfig {
                common,
                vbucket_map: VbucketMapPayload::default(),
            })
        } else {
            BucketConfig::Couchbase(CouchbaseBucketConfig {
                common,
                vbucket_map: VbucketMapPayload::default(),
            })
        };

        Ok(bucket)
    }
}

fn build_node(raw: &RawNode, origin: &str) -> Result<NodeInfo> {
    let hostname = substitute_origin(strip_port_suffix(&raw.hostname), origin);

    let (services, ssl_services) = split_service_map(&raw.services, &raw.ports)?;

    let mut alternate_addresses = BTreeMap::new();
    for (network, alt) in &raw.alternate_addresses {
        alternate_addresses.insert(network.clone(), build_alternate(alt, origin)?);
    }

    Ok(NodeInfo {
        hostname: ResolvedHostname::new(&hostname),
        raw_hostname: raw.hostname.clone(),
        services,
        ssl_services,
        alternate_addresses,
    })
}

fn build_alternate(raw: &RawAlternateAddress, origin: &str) -> Result<AlternateAddress> {
    let hostname = substitute_origin(strip_port_suffix(&raw.hostname), origin);
    let empty = BTreeMap::new();
    let (services, ssl_services) = split_service_map(&raw.ports, &empty)?;
    Ok(AlternateAddress {
        hostname: ResolvedHostname::new(&hostname),
        raw_hostname: raw.hostname.clone(),
        services,
        ssl_services,
    })
}

/// Splits a flat `{"kv": 11210, "kvSSL": 11207, ...}` style map (the current
/// "services" field) into plaintext/SSL `ServiceType` maps, falling back to
/// the legacy `ports` map (`{"direct": 11210}`) for the key-value service
/// when `services` is empty. Older ketama-only payloads only ever carry
/// `ports`.
fn split_service_map(
    services: &BTreeMap<String, u32>,
    legacy_ports: &BTreeMap<String, u32>,
) -> Result<(BTreeMap<ServiceType, Port>, BTreeMap<ServiceType, Port>)> {
    let mut plain = BTreeMap::new();
    let mut ssl = BTreeMap::new();

    for (key, port) in services {
        if let Some((service, is_ssl)) = map_service_key(key) {
            let port = to_port(*port)?;
            if is_ssl {
                ssl.insert(service, port);
            } else {
                plain.insert(service, port);
            }
        }
    }

    if plain.is_empty() && ssl.is_empty() {
        if let Some(direct) = legacy_ports.get("direct") {
            plain.insert(ServiceType::KeyValue, to_port(*direct)?);
        }
    }

    Ok((plain, ssl))
}

fn to_port(value: u32) -> Result<Port> {
    let value = u16::try_from(value).map_err(|_| ProviderError::InvalidConfig {
        reason: format!("port {value} out of range"),
    })?;
    Port::new(value).ok_or_else(|| ProviderError::InvalidConfig {
        reason: "port must be greater than zero".to_string(),
    })
}

fn map_service_key(key: &str) -> Option<(ServiceType, bool)> {
    Some(match key {
        "kv" => (ServiceType::KeyValue, false),
        "kvSSL" => (ServiceType::KeyValue, true),
        "mgmt" => (ServiceType::Management, false),
        "mgmtSSL" => (ServiceType::Management, true),
        "capi" => (ServiceType::Views, false),
        "capiSSL" => (ServiceType::Views, true),
        "n1ql" => (ServiceType::Query, false),
        "n1qlSSL" => (ServiceType::Query, true),
        "fts" => (ServiceType::Search, false),
        "ftsSSL" => (ServiceType::Search, true),
        "cbas" => (ServiceType::Analytics, false),
        "cbasSSL" => (ServiceType::Analytics, true),
        "eventingAdminPort" => (ServiceType::Eventing, false),
        "eventingSSL" => (ServiceType::Eventing, true),
        _ => return None,
    })
}

/// Servers sometimes encode "this host" as `$HOST` or the loopback address;
/// substitute the address the payload was actually fetched from.
fn substitute_origin(hostname: &str, origin: &str) -> String {
    if hostname == "$HOST" || hostname == "127.0.0.1" || hostname == "::1" {
        origin.to_string()
    } else {
        hostname.to_string()
    }
}

/// Strips a `:port` suffix some server versions still append to `hostname`;
/// port numbers belong in the `services`/`ports` maps. Leaves IPv6 literals
/// (bracketed or not) untouched when there's no unambiguous numeric suffix.
fn strip_port_suffix(hostname: &str) -> &str {
    if hostname.starts_with('[') {
        return hostname
            .rsplit_once("]:")
            .map(|(host, _)| host.trim_start_matches('['))
            .unwrap_or(hostname.trim_start_matches('[').trim_end_matches(']'));
    }
    match hostname.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) => host,
        _ => hostname,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    const MEMCACHED_MIXED: &str = include_str!("../../tests/fixtures/memcached_mixed_sherlock.json");
    const WITH_EXTERNAL: &str = include_str!("../../tests/fixtures/config_with_external.json");

    #[test]
    fn ketama_ring_filters_to_data_nodes() {
        let env = Environment::default();
        let config = ParserFacade::parse(MEMCACHED_MIXED, &env, "10.0.0.1").unwrap();

        assert_eq!(config.nodes().len(), 4);
        let ring = config.ketama_ring().expect("memcached bucket has a ring");
        assert!(!ring.is_empty());
        for node in ring.values() {
            assert!(["192.168.56.101", "192.168.56.102"].contains(&node.hostname.address()));
            assert!(node.has_key_value_service());
        }
    }

    #[test]
    fn missing_uuid_parses_as_none() {
        let env = Environment::default();
        let config = ParserFacade::parse(MEMCACHED_MIXED, &env, "10.0.0.1").unwrap();
        assert_eq!(config.uuid(), None);
    }

    #[test]
    fn rev_round_trips_from_json() {
        let env = Environment::default();
        let config = ParserFacade::parse(WITH_EXTERNAL, &env, "10.0.0.1").unwrap();
        assert_eq!(config.rev(), Some(42));
    }

    #[test]
    fn malformed_json_is_invalid_config() {
        let env = Environment::default();
        let err = ParserFacade::parse("{not json", &env, "10.0.0.1").unwrap_err();
        assert!(matches!(err, ProviderError::InvalidConfig { .. }));
    }

    #[test]
    fn host_placeholder_is_substituted_with_origin() {
        let raw = r#"{
            "name": "default",
            "rev": 1,
            "nodeLocator": "vbucket",
            "nodes": [
                {"hostname": "$HOST", "services": {"mgmt": 8091, "kv": 11210}}
            ]
        }"#;
        let env = Environment::default();
        let config = ParserFacade::parse(raw, &env, "203.0.113.9").unwrap();
        assert_eq!(config.nodes()[0].hostname.address(), "203.0.113.9");
    }

    #[test]
    fn ipv6_literal_is_preserved_verbatim() {
        let raw = r#"{
            "name": "default",
            "rev": 1,
            "nodeLocator": "vbucket",
            "nodes": [
                {"hostname": "[fe80::1]", "services": {"mgmt": 8091}}
            ]
        }"#;
        let env = Environment::default();
        let config = ParserFacade::parse(raw, &env, "10.0.0.1").unwrap();
        assert_eq!(config.nodes()[0].hostname.address(), "fe80::1");
    }
}
