//! Engine configuration types.

use serde::{Deserialize, Serialize};

use crate::engine::{DEFAULT_BATCH_SIZE, DEFAULT_BUDGET_MS, DEFAULT_MAX_PERIODS};

/// Policy cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheConfig {
    /// Seconds a company's policies stay cached before a reload.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 300 }
    }
}

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SimulationConfig {
    /// Employees evaluated concurrently per batch.
    pub batch_size: usize,
    /// Wall-clock budget for one run, in milliseconds.
    pub budget_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            budget_ms: DEFAULT_BUDGET_MS,
        }
    }
}

/// Retroactive application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetroConfig {
    /// Maximum historical periods one application may span.
    pub max_periods: usize,
}

impl Default for RetroConfig {
    fn default() -> Self {
        Self {
            max_periods: DEFAULT_MAX_PERIODS,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Policy cache settings.
    pub cache: CacheConfig,
    /// Simulation settings.
    pub simulation: SimulationConfig,
    /// Retroactive application settings.
    pub retro: RetroConfig,
}
