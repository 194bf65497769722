//! Global aggregation configuration.

use serde::{Deserialize, Serialize};

use crate::constants;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AggregationConfig {
    /// Compare-and-swap attempts per aggregation upsert. Default: 8.
    pub cas_max_attempts: Option<u32>,
    /// Languages listed in the portfolio view. Default: 5.
    pub top_languages: Option<usize>,
    /// Result limit when a query does not specify one. Default: 100.
    pub default_limit: Option<usize>,
}

impl AggregationConfig {
    pub fn effective_cas_max_attempts(&self) -> u32 {
        self.cas_max_attempts
            .unwrap_or(constants::DEFAULT_CAS_MAX_ATTEMPTS)
    }

    pub fn effective_top_languages(&self) -> usize {
        self.top_languages.unwrap_or(constants::DEFAULT_TOP_LANGUAGES)
    }

    pub fn effective_default_limit(&self) -> usize {
        self.default_limit
            .unwrap_or(constants::DEFAULT_AGGREGATION_LIMIT)
    }
}
