//! Configuration loading for the policy engine.
//!
//! Engine tunables (cache TTL, simulation batching and budget, retro
//! range limits) load from a single YAML file. Every field has a
//! default, so a deployment with no configuration file still runs.
//!
//! # Example
//!
//! ```no_run
//! use policy_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/engine.yaml").unwrap();
//! println!("simulation batch size: {}", config.simulation.batch_size);
//! ```

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::{CacheConfig, EngineConfig, RetroConfig, SimulationConfig};
