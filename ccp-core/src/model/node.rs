use std::collections::BTreeMap;
use std::net::IpAddr;
use std::num::NonZeroU16;

/// A service port. Guaranteed non-zero by construction, so "every port value
/// is > 0" (spec.md §3) is a type invariant rather than something every
/// reader has to re-check.
pub type Port = NonZeroU16;

/// The set of services a node (or an alternate address) can advertise.
///
/// This mirrors the service-type enumeration named as an external
/// collaborator in spec.md §1/§6; we carry just the variants the core needs
/// to read (the key-value binary service drives ketama ring membership, the
/// others are opaque routing targets the rest of the client resolves).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[non_exhaustive]
pub enum ServiceType {
    /// Binary key-value service (memcached protocol). Presence of this
    /// service is what makes a node eligible for the ketama ring.
    KeyValue,
    Management,
    Views,
    Query,
    Search,
    Analytics,
    Eventing,
}

/// A hostname as carried on the wire, plus a best-effort resolved numeric
/// form. `raw` always preserves the literal string exactly as received
/// (including IPv6 literals). Matching is done against `raw`; `addr` is a
/// convenience for callers that need a `SocketAddr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHostname {
    raw: String,
    addr: Option<IpAddr>,
}

impl ResolvedHostname {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let addr = raw.parse::<IpAddr>().ok();
        Self { raw, addr }
    }

    /// The literal hostname/IP string as received from the server.
    pub fn address(&self) -> &str {
        &self.raw
    }

    /// The resolved numeric address, if `address()` was already an IP
    /// literal. A real client would additionally perform DNS resolution here;
    /// that is outside this crate's scope (spec.md §1 names "name/address
    /// resolution primitives" as an external collaborator).
    pub fn numeric(&self) -> Option<IpAddr> {
        self.addr
    }
}

impl std::fmt::Display for ResolvedHostname {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

/// An alternate ("external") address set advertised by a node for clients
/// that reach the cluster through a NAT/ingress boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateAddress {
    pub hostname: ResolvedHostname,
    pub raw_hostname: String,
    pub services: BTreeMap<ServiceType, Port>,
    pub ssl_services: BTreeMap<ServiceType, Port>,
}

/// One cluster node as described by a bucket configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub hostname: ResolvedHostname,
    pub raw_hostname: String,
    pub services: BTreeMap<ServiceType, Port>,
    pub ssl_services: BTreeMap<ServiceType, Port>,
    pub alternate_addresses: BTreeMap<String, AlternateAddress>,
}

impl NodeInfo {
    /// Whether this node carries the key-value binary service and is
    /// therefore eligible to appear on a memcached bucket's ketama ring.
    pub fn has_key_value_service(&self) -> bool {
        self.services.contains_key(&ServiceType::KeyValue)
    }

    pub fn alternate(&self, network: &str) -> Option<&AlternateAddress> {
        self.alternate_addresses.get(network)
    }
}
