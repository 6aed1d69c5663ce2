//! # Configuration
//!
//! [`StepConfig`] collects the device paths and knobs a [`StepContext`]
//! is opened with. Defaults match a stock Linux host with the kernel
//! driver loaded; [`StepConfig::from_env`] overlays environment variables:
//!
//! | Variable             | Field                |
//! |----------------------|----------------------|
//! | `STEP_DRIVER_PATH`   | `driver_path`        |
//! | `STEP_MEMORY_PATH`   | `memory_path`        |
//! | `STEP_ADDRESS_WIDTH` | `address_width`      |
//! | `STEP_LOG`           | `log_level`          |
//!
//! [`StepContext`]: crate::StepContext

use std::path::PathBuf;

use log::LevelFilter;
use step_config_derive::With;
use step_vmem::MAX_PHYSICAL_ADDRESS_WIDTH;

pub const DEFAULT_DRIVER_PATH: &str = "/dev/sgx-step";
pub const DEFAULT_MEMORY_PATH: &str = "/dev/mem";

const ENV_DRIVER_PATH: &str = "STEP_DRIVER_PATH";
const ENV_MEMORY_PATH: &str = "STEP_MEMORY_PATH";
const ENV_ADDRESS_WIDTH: &str = "STEP_ADDRESS_WIDTH";
const ENV_LOG: &str = "STEP_LOG";

/// An environment variable held a value that cannot be used.
#[derive(Debug, Clone, Eq, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a bit count in 1..={max}", var = ENV_ADDRESS_WIDTH, max = MAX_PHYSICAL_ADDRESS_WIDTH)]
    InvalidAddressWidth { value: String },
    #[error("{var}={value:?} is not a log level (off, error, warn, info, debug, trace)", var = ENV_LOG)]
    InvalidLogLevel { value: String },
}

#[derive(Debug, Clone, Eq, PartialEq, With)]
pub struct StepConfig {
    /// Character device answering page-table queries.
    #[with(into)]
    pub driver_path: PathBuf,

    /// Physical memory device that windows are mapped from.
    #[with(into)]
    pub memory_path: PathBuf,

    /// Map windows with `PROT_EXEC` in addition to read/write.
    pub executable_windows: bool,

    /// Implemented physical address bits; `None` asks the CPU.
    #[with(strip_option)]
    pub address_width: Option<u8>,

    /// Maximum level the stderr logger emits.
    pub log_level: LevelFilter,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            driver_path: PathBuf::from(DEFAULT_DRIVER_PATH),
            memory_path: PathBuf::from(DEFAULT_MEMORY_PATH),
            executable_windows: true,
            address_width: None,
            log_level: LevelFilter::Info,
        }
    }
}

impl StepConfig {
    /// Defaults overlaid with the `STEP_*` environment variables.
    ///
    /// # Errors
    /// [`ConfigError`] if a variable is set to an unusable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values produced by `lookup` (keyed by variable name).
    ///
    /// Empty values are treated as unset.
    ///
    /// # Errors
    /// [`ConfigError`] if a value is unusable.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(path) = get(ENV_DRIVER_PATH) {
            self.driver_path = PathBuf::from(path);
        }
        if let Some(path) = get(ENV_MEMORY_PATH) {
            self.memory_path = PathBuf::from(path);
        }
        if let Some(value) = get(ENV_ADDRESS_WIDTH) {
            let width = value
                .trim()
                .parse::<u8>()
                .ok()
                .filter(|w| (1..=MAX_PHYSICAL_ADDRESS_WIDTH).contains(w))
                .ok_or(ConfigError::InvalidAddressWidth { value })?;
            self.address_width = Some(width);
        }
        if let Some(value) = get(ENV_LOG) {
            self.log_level = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidLogLevel { value })?;
        }
        Ok(self)
    }

    /// The configured width, or the CPU's (queried once per process).
    #[must_use]
    pub fn resolved_address_width(&self) -> u8 {
        self.address_width
            .unwrap_or_else(step_registers::physical_address_width)
    }
}
