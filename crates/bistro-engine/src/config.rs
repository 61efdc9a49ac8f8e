//! # Engine Configuration
//!
//! Configuration management for the order engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BISTRO_TERMINAL_ID=T1                                              │
//! │     BISTRO_REQUEST_TIMEOUT_MS=5000                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/bistro-pos/engine.toml (Linux)                           │
//! │     ~/Library/Application Support/com.bistro.pos/engine.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # engine.toml
//! [terminal]
//! id = "T1"
//! name = "Front Counter"
//! order_prefix = "T1"
//! default_order_type = "pickup"
//!
//! [backend]
//! request_timeout_ms = 5000
//!
//! [checkout]
//! print_on_complete = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use bistro_core::OrderType;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Terminal Configuration
// =============================================================================

/// Identity of this terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalConfig {
    /// Unique terminal identifier.
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable terminal name (e.g., "Front Counter", "Bar").
    #[serde(default = "default_terminal_name")]
    pub name: String,

    /// Prefix of human-readable order numbers (`{prefix}-{seq:04}`).
    #[serde(default = "default_order_prefix")]
    pub order_prefix: String,

    /// Order type used when the operator starts a tab without choosing.
    #[serde(default)]
    pub default_order_type: OrderType,
}

fn default_terminal_name() -> String {
    "POS Terminal".to_string()
}

fn default_order_prefix() -> String {
    "POS".to_string()
}

impl Default for TerminalConfig {
    fn default() -> Self {
        TerminalConfig {
            id: Uuid::new_v4().to_string(),
            name: default_terminal_name(),
            order_prefix: default_order_prefix(),
            default_order_type: OrderType::default(),
        }
    }
}

// =============================================================================
// Backend Settings
// =============================================================================

/// How the engine talks to its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    /// Upper bound on any single collaborator call (milliseconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout() -> u64 {
    5_000
}

impl Default for BackendSettings {
    fn default() -> Self {
        BackendSettings {
            request_timeout_ms: default_request_timeout(),
        }
    }
}

// =============================================================================
// Checkout Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSettings {
    /// Print a ticket when an order is completed.
    #[serde(default = "default_true")]
    pub print_on_complete: bool,
}

fn default_true() -> bool {
    true
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            print_on_complete: true,
        }
    }
}

// =============================================================================
// Main Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub terminal: TerminalConfig,

    #[serde(default)]
    pub backend: BackendSettings,

    #[serde(default)]
    pub checkout: CheckoutSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (engine.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> EngineResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| EngineError::Config("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Engine config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.terminal.id.trim().is_empty() {
            return Err(EngineError::Config("terminal.id must not be empty".into()));
        }

        if self.terminal.order_prefix.trim().is_empty() {
            return Err(EngineError::Config(
                "terminal.order_prefix must not be empty".into(),
            ));
        }

        if self.backend.request_timeout_ms == 0 {
            return Err(EngineError::Config(
                "backend.request_timeout_ms must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(id) = std::env::var("BISTRO_TERMINAL_ID") {
            debug!(terminal_id = %id, "Overriding terminal ID from environment");
            self.terminal.id = id;
        }

        if let Ok(name) = std::env::var("BISTRO_TERMINAL_NAME") {
            self.terminal.name = name;
        }

        if let Ok(prefix) = std::env::var("BISTRO_ORDER_PREFIX") {
            self.terminal.order_prefix = prefix;
        }

        if let Ok(order_type) = std::env::var("BISTRO_DEFAULT_ORDER_TYPE") {
            match order_type.parse() {
                Ok(parsed) => self.terminal.default_order_type = parsed,
                Err(_) => warn!(order_type = %order_type, "Unknown order type in environment"),
            }
        }

        if let Ok(timeout) = std::env::var("BISTRO_REQUEST_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                debug!(timeout_ms = ms, "Overriding request timeout from environment");
                self.backend.request_timeout_ms = ms;
            }
        }

        if let Ok(print) = std::env::var("BISTRO_PRINT_ON_COMPLETE") {
            if let Ok(flag) = print.parse::<bool>() {
                self.checkout.print_on_complete = flag;
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "bistro", "pos")
            .map(|dirs| dirs.config_dir().join("engine.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn terminal_id(&self) -> &str {
        &self.terminal.id
    }

    /// Collaborator call timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }
}
