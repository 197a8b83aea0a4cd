//! Engine configuration
//!
//! Layering: built-in defaults, then an optional TOML file, then
//! `BEATWATCH__SECTION__KEY` environment variables
//! (e.g. `BEATWATCH__SLA__RESPONSE_MINUTES=20`).

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::errors::{BeatwatchError, BwError};
use crate::schedule::DEFAULT_VISIT_DURATION_MINUTES;

pub const ENV_PREFIX: &str = "BEATWATCH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaConfig {
    /// Maximum minutes from raise to first response
    pub response_minutes: f64,
    /// Maximum minutes from raise to resolution
    pub resolution_minutes: f64,
    /// Days an active person may stay pending verification after registration
    pub verification_visit_days: u32,
    /// Days a verified person may go without a completed visit
    pub routine_visit_days: u32,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            response_minutes: 15.0,
            resolution_minutes: 60.0,
            verification_visit_days: 7,
            routine_visit_days: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulingConfig {
    pub default_visit_duration_minutes: u32,
    /// How far ahead the address-change cascade books the re-verification
    pub reverification_lead_hours: u32,
    /// Slots tried when looking for a free window
    pub max_slot_search: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            default_visit_duration_minutes: DEFAULT_VISIT_DURATION_MINUTES,
            reverification_lead_hours: 48,
            max_slot_search: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub prefix: String,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            prefix: "SCID".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sla: SlaConfig,
    pub scheduling: SchedulingConfig,
    pub credential: CredentialConfig,
}

fn config_error(err: config::ConfigError) -> BwError {
    BwError::from(BeatwatchError::InvalidConfig {
        reason: err.to_string(),
    })
}

impl EngineConfig {
    /// Load defaults, then `path` if it exists, then the environment
    ///
    /// # Errors
    ///
    /// `BwErrorKind::Config` for unreadable sources or invalid values.
    #[allow(clippy::result_large_err)]
    pub fn load(path: Option<&Path>) -> Result<Self, BwError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let cfg: EngineConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML document on top of the defaults; no environment layer
    ///
    /// # Errors
    ///
    /// `BwErrorKind::Config` for malformed TOML or invalid values.
    #[allow(clippy::result_large_err)]
    pub fn from_toml_str(toml: &str) -> Result<Self, BwError> {
        let cfg: EngineConfig = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .map_err(config_error)?
            .try_deserialize()
            .map_err(config_error)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// `BwErrorKind::Config` naming the first non-positive setting.
    #[allow(clippy::result_large_err)]
    pub fn validate(&self) -> Result<(), BwError> {
        let invalid = |reason: &str| -> BwError {
            BeatwatchError::InvalidConfig {
                reason: reason.to_string(),
            }
            .into()
        };

        if !(self.sla.response_minutes > 0.0) {
            return Err(invalid("sla.response_minutes must be positive"));
        }
        if !(self.sla.resolution_minutes > 0.0) {
            return Err(invalid("sla.resolution_minutes must be positive"));
        }
        if self.sla.verification_visit_days == 0 {
            return Err(invalid("sla.verification_visit_days must be positive"));
        }
        if self.sla.routine_visit_days == 0 {
            return Err(invalid("sla.routine_visit_days must be positive"));
        }
        if self.scheduling.default_visit_duration_minutes == 0 {
            return Err(invalid(
                "scheduling.default_visit_duration_minutes must be positive",
            ));
        }
        if self.scheduling.max_slot_search == 0 {
            return Err(invalid("scheduling.max_slot_search must be positive"));
        }
        if self.credential.prefix.trim().is_empty() {
            return Err(invalid("credential.prefix must not be empty"));
        }
        Ok(())
    }
}
