//! Configuration schema types.
//!
//! All structs use `serde(default)` so partial configs work.

mod logging;
mod presence;

pub use logging::*;
pub use presence::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CampusConfig {
    pub presence: PresenceConfig,
    pub logging: LoggingConfig,
}
