//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → SiteConfig (validated, immutable)
//!     → CLI / environment overrides applied by the binary
//!
//! Content changes:
//!     watcher.rs detects change below the content root
//!     → rate-limited reload of the site
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    ContentConfig, ListenerConfig, ObservabilityConfig, ReloadConfig, SiteConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::ContentWatcher;
