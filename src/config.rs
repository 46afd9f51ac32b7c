//! Client configuration.
//!
//! ## Sources (later wins)
//!
//! 1. built-in defaults ([`ClientConfig::default`])
//! 2. optional TOML file (`--config` / `ROBOT_CONFIG`)
//! 3. `ROBOT_*` environment variables, nested keys joined with `__`
//!    (e.g. `ROBOT_DIMENSIONS__ARM_OFFSET=0.75`)
//! 4. command-line flags (applied by the binary)
//!
//! | Key                | Default               | Description                         |
//! |--------------------|-----------------------|-------------------------------------|
//! | `endpoint`         | `http://localhost:5000` | Socket.IO base URL of the authority |
//! | `websocket_only`   | `false`               | Skip the long-polling handshake     |
//! | `render_hz`        | `60`                  | Render loop rate, `(0, 1000]`       |
//! | `request_on_connect` | `true`              | Send `get_robot` once connected     |
//! | `dimensions.*`     | see [`ChainDimensions`] | Fixed segment offsets             |

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chain::ChainDimensions;
use crate::error::Result;

/// Upper bound for `render_hz`; keeps the frame period well above zero.
pub const MAX_RENDER_HZ: f32 = 1000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoint: String,
    pub websocket_only: bool,
    pub render_hz: f32,
    pub request_on_connect: bool,
    pub dimensions: ChainDimensions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5000".into(),
            websocket_only: false,
            render_hz: 60.0,
            request_on_connect: true,
            dimensions: ChainDimensions::default(),
        }
    }
}

impl ClientConfig {
    /// Layer defaults, the optional file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::Config::try_from(&ClientConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let cfg: ClientConfig = builder
            .add_source(
                config::Environment::with_prefix("ROBOT")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        log::debug!("loaded config: {:?}", cfg);
        Ok(cfg)
    }

    /// Reject settings the client cannot run with.  Call again after
    /// applying command-line overrides.
    pub fn validate(&self) -> Result<()> {
        if !(self.render_hz > 0.0 && self.render_hz <= MAX_RENDER_HZ) {
            return Err(config::ConfigError::Message(format!(
                "render_hz must be in (0, {}], got {}",
                MAX_RENDER_HZ, self.render_hz
            ))
            .into());
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
