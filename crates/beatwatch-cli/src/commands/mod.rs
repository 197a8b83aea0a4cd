pub mod db;
pub mod notify;
pub mod sla;

use std::path::Path;

use beatwatch_core::config::EngineConfig;
use beatwatch_engine::EngineContext;

/// Engine context from the optional `--config` file and the environment
pub fn load_context(config: Option<&Path>) -> Result<EngineContext, Box<dyn std::error::Error>> {
    Ok(EngineContext::new(EngineConfig::load(config)?))
}
