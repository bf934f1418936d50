/// The network-resolution policy a caller wants applied to incoming bucket
/// configs (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkResolution {
    /// Always address nodes by their default (internal) addresses.
    Default,
    /// Address nodes by the `"external"` alternate set when any node
    /// advertises one.
    External,
    /// Pick default vs. a named alternate by matching the current seed
    /// addresses against each node's advertised hostnames.
    Auto,
    /// Like `External`, but keyed by a caller-chosen network name.
    Custom(String),
}

impl Default for NetworkResolution {
    fn default() -> Self {
        NetworkResolution::Auto
    }
}

/// Caller-owned configuration for a `ConfigurationProvider`.
///
/// Never loaded from a file or a process-wide static. The embedding client
/// constructs one explicitly and passes it in (Design Notes, spec.md §9:
/// "no module-level singleton").
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub network_resolution: NetworkResolution,
}

impl Environment {
    pub fn new(network_resolution: NetworkResolution) -> Self {
        Self { network_resolution }
    }
}
