//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Whether sequences built by the dispatch layer cache pulled items.
    pub default_store: bool,

    /// Whether a disabled store is passed on to derived sequences.
    pub pass_store: bool,

    /// Optional seed for deterministic shuffles.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_store: true,
            pass_store: false,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `RINQ_DEFAULT_STORE`: cache pulled items ("true"/"false")
    /// - `RINQ_PASS_STORE`: inherit a disabled store
    /// - `RINQ_SEED`: shuffle seed
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("RINQ_DEFAULT_STORE") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.default_store = v;
            }
        }

        if let Ok(s) = std::env::var("RINQ_PASS_STORE") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.pass_store = v;
            }
        }

        if let Ok(s) = std::env::var("RINQ_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = Some(v);
            }
        }

        cfg
    }
}
