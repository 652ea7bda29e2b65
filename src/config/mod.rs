pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

pub use auth::AuthConfig;
#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use toml_config::AppConfig;
