use thiserror::Error;

/// Errors surfaced by the cluster configuration provider.
///
/// This is the only public error type: every internal failure (parse errors,
/// loader/refresher failures, transport errors) is folded into one of these
/// variants before crossing the provider's public API.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// A raw config payload failed to parse, or was missing a field required
    /// for the requested use (e.g. `rev` for acceptance).
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// `openBucket` could not produce a config: every loader failed against
    /// every seed, or `seedHosts` was never called (or was called with an
    /// empty set), or a loader succeeded but its result couldn't be accepted.
    ///
    /// The message intentionally matches the literal text promised by
    /// `spec.md` §6 so callers pattern-matching on `to_string()` keep
    /// working; §6 promises no other public exception type for bootstrap
    /// failure, so an empty seed list folds into this variant rather than
    /// getting one of its own.
    #[error("Could not open bucket.")]
    BootstrapFailed,

    /// A loader produced a config, but no refresher is registered for its
    /// `LoaderType`. A configuration bug in the embedding client.
    #[error("no refresher registered for loader type {0:?}")]
    MissingRefresher(crate::loader::LoaderType),

    /// The refresher returned by a successful loader failed to register the
    /// bucket for ongoing updates.
    #[error("refresher registration failed: {reason}")]
    RefresherRegistrationFailed { reason: String },

    /// Transport-level failure from a concrete `Loader` implementation.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Catch-all for collaborator failures that don't map to a more specific
    /// variant above (e.g. a custom `Loader`/`Refresher` implementation).
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;
