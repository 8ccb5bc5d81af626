use std::collections::BTreeMap;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawConfig {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub controller: Option<RawController>,
    #[serde(default)]
    pub services: BTreeMap<String, RawService>,
}

fn default_version() -> u32 {
    crate::CONFIG_VERSION
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawController {
    pub name: Option<String>,
    pub grace_period_secs: Option<u64>,
    pub stop_policy: Option<RawStopPolicy>,
    pub stop_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum RawStopPolicy {
    Kill,
    Graceful,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct RawService {
    pub start_command: Option<String>,
    pub stop_command: Option<String>,
    pub working_dir: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
}
