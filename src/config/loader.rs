//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (ROLEGUARD__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::access_control::SecurityConfigurationBuilder;
use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "roleguard.toml",
    ".roleguard.toml",
    "~/.config/roleguard/config.toml",
    "/etc/roleguard/config.toml",
];

/// Prefix for environment overrides, e.g. `ROLEGUARD__SERVER__PORT`
const ENV_PREFIX: &str = "ROLEGUARD";

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Defaults come from serde defaults on AppConfig

    // 2. Configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // First existing default path wins
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Environment variables; `__` maps to nested keys
    // (ROLEGUARD__SERVER__PORT -> server.port)
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.host.is_empty() {
        return Err(ConfigError::Missing {
            field: "server.host".to_string(),
        });
    }

    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    if config.security.session_timeout_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "security.session_timeout_secs must be greater than 0".to_string(),
        });
    }

    for (i, user) in config.identity.users.iter().enumerate() {
        if user.username.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("identity.users[{}].username", i),
            });
        }
        if user.password.is_empty() {
            return Err(ConfigError::Missing {
                field: format!("identity.users[{}].password", i),
            });
        }
    }

    // Patterns and rule conflicts are checked by flattening the rules
    SecurityConfigurationBuilder::from_config(config).build()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_from_str_basic() {
        let toml = r#"
[server]
port = 9090

[security]
all_paths = "form"

[[security.paths]]
path = "/onlyManagerRole"
roles = ["Manager"]
"#;

        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.security.paths.len(), 1);
        assert_eq!(config.security.paths[0].roles, vec!["Manager"]);
    }

    #[test]
    fn test_zero_port_error() {
        let toml = r#"
[server]
port = 0
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_zero_session_timeout_error() {
        let toml = r#"
[security]
session_timeout_secs = 0
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn test_invalid_pattern_error() {
        let toml = r#"
[[security.paths]]
path = "reports"
roles = ["Manager"]
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::InvalidPattern { .. })));
    }

    #[test]
    fn test_conflicting_rules_error() {
        let toml = r#"
[[security.paths]]
path = "/reports"
roles = ["Manager"]

[[security.paths]]
path = "/reports"
roles = ["Customer"]
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ConflictingRule { .. })));
    }

    #[test]
    fn test_user_without_password_error() {
        let toml = r#"
[[identity.users]]
username = "picketlink"
password = ""
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_bad_context_path_error() {
        let toml = r#"
[server]
context_path = "app/"
"#;

        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
