use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryOptionsDoc {
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub retry_timeout: Option<u64>,
    #[serde(default)]
    pub verbose: bool,
    /// Every remaining key, expected to be a `status_*` selector.
    #[serde(flatten)]
    pub overrides: HashMap<String, RetryPolicyDoc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicyDoc {
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub retry_timeout: Option<u64>,
}
