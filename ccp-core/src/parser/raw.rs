//! Serde mirror of the raw JSON config payload described in spec.md §6.
//! Kept deliberately close to the wire shape; translation into the
//! `model` types happens in `parser::mod`.

use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RawConfig {
    pub name: String,
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub rev: Option<serde_json::Value>,
    #[serde(rename = "nodeLocator", default)]
    pub node_locator: Option<String>,
    #[serde(rename = "bucketType", default)]
    pub bucket_type: Option<String>,
    #[serde(default)]
    pub nodes: Vec<RawNode>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawNode {
    pub hostname: String,
    #[serde(default)]
    pub ports: BTreeMap<String, u32>,
    #[serde(default)]
    pub services: BTreeMap<String, u32>,
    #[serde(rename = "alternateAddresses", default)]
    pub alternate_addresses: BTreeMap<String, RawAlternateAddress>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAlternateAddress {
    pub hostname: String,
    #[serde(default)]
    pub ports: BTreeMap<String, u32>,
}

/// Interprets `rev` as a u64 if it is present and holds a non-negative
/// integer. Any other shape (string, float, absent) is "unparseable" per
/// spec.md §8 and becomes `None`.
pub(crate) fn parse_rev(value: &Option<serde_json::Value>) -> Option<u64> {
    value.as_ref().and_then(|v| v.as_u64())
}
