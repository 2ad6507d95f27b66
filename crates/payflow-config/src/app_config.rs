use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::layered::{apply_env_overrides, load_layered_yaml};

/// Typed application configuration, produced from layered YAML plus
/// `PAYFLOW_*` environment overrides (§6 "Environment configuration").
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub object_store_root: String,
    pub policy_evaluator_url: String,
    pub agent_timeouts_ms: AgentTimeouts,
    pub line_parallelism: usize,
    pub batch_parallelism: usize,
    pub rail_success_rates: BTreeMap<String, f64>,
    /// When `Some(seed)`, every component requiring randomness (the mock
    /// rail executor) must derive its RNG from this seed instead of OS
    /// entropy, so test runs are reproducible.
    pub deterministic_seed: Option<u64>,
    /// Actors permitted to submit a `HandleEvent::Override` (§9 open
    /// question #3).
    pub override_actors: Vec<String>,
    /// SHA-256 over the canonicalized merged config, carried into the audit
    /// trail as provenance for which config produced a given decision.
    pub config_hash: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentTimeouts {
    pub acc_ms: u64,
    pub pdr_ms: u64,
    pub arl_ms: u64,
    pub rca_ms: u64,
    pub crrak_ms: u64,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            acc_ms: 10_000,
            pdr_ms: 15_000,
            arl_ms: 5_000,
            rca_ms: 5_000,
            crrak_ms: 5_000,
        }
    }
}

impl AppConfig {
    /// Load `base.yaml`, optionally overlay `{env}.yaml`, then apply
    /// `PAYFLOW_*` environment variable overrides, and parse the result into
    /// the typed shape.
    pub fn load(base_path: &str, env_overlay_path: Option<&str>) -> Result<Self> {
        let mut paths = vec![base_path];
        if let Some(p) = env_overlay_path {
            paths.push(p);
        }
        let mut loaded = load_layered_yaml(&paths)?;
        apply_env_overrides(&mut loaded.config_json, std::env::vars());

        let mut cfg: AppConfig = serde_json::from_value(loaded.config_json)
            .context("config does not match AppConfig shape")?;
        cfg.config_hash = loaded.config_hash;
        Ok(cfg)
    }
}
