//! Configuration for the Bucko HTTP dispatcher
//!
//! Settings are split by domain (`http`, `logging`), each with defaults and
//! validation, and can be loaded from YAML or JSON files with `BUCKO_*`
//! environment variable overrides.

pub mod error;
pub mod loader;
pub mod validation;

// Domain-specific configuration modules
pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;
pub use validation::Validatable;

// Re-export domain configurations
pub use domains::{
    http::{ConnectionPoolConfig, HttpConfig, ProxyConfig},
    logging::{LogFormat, LogLevel, LoggingConfig},
    BuckoConfig,
};

// Re-export utilities
pub use domains::utils::serde_duration;
