//! Configuration validation

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::ProjectConfig;

fn identifier_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+(\.\*)?$|^\*$").expect("static regex")
    })
}

fn package_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z][A-Za-z0-9_]*(\.[A-Za-z][A-Za-z0-9_]*)+$").expect("static regex")
    })
}

/// Validate configuration
pub fn validate_config(config: &ProjectConfig) -> Result<()> {
    debug!("validating configuration");
    validate_project(config)?;
    validate_ios(config)?;
    validate_android(config)?;
    validate_apple(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_project(config: &ProjectConfig) -> Result<()> {
    if config.account.trim().is_empty() {
        return Err(ConfigError::MissingField("account".to_string()).into());
    }
    if config.slug.trim().is_empty() {
        return Err(ConfigError::MissingField("slug".to_string()).into());
    }
    if config.api.endpoint.trim().is_empty() {
        return Err(ConfigError::invalid("api.endpoint", "endpoint cannot be empty").into());
    }
    Ok(())
}

fn validate_ios(config: &ProjectConfig) -> Result<()> {
    let Some(ios) = &config.ios else {
        return Ok(());
    };

    if !identifier_pattern().is_match(&ios.bundle_identifier) {
        return Err(ConfigError::invalid(
            "ios.bundle_identifier",
            format!("'{}' is not a valid bundle identifier", ios.bundle_identifier),
        )
        .into());
    }

    let mut names = HashSet::new();
    let bundle_ids: HashSet<&str> = ios
        .targets
        .iter()
        .map(|t| t.bundle_identifier.as_str())
        .collect();

    for (index, target) in ios.targets.iter().enumerate() {
        let field = format!("ios.targets[{index}]");
        if target.name.trim().is_empty() {
            return Err(ConfigError::invalid(field, "target name cannot be empty").into());
        }
        if !names.insert(target.name.as_str()) {
            return Err(ConfigError::invalid(
                field,
                format!("duplicate target name '{}'", target.name),
            )
            .into());
        }
        if !identifier_pattern().is_match(&target.bundle_identifier) {
            return Err(ConfigError::invalid(
                format!("{field}.bundle_identifier"),
                format!("'{}' is not a valid bundle identifier", target.bundle_identifier),
            )
            .into());
        }
        if let Some(parent) = &target.parent_bundle_identifier {
            if !bundle_ids.contains(parent.as_str()) || parent == &target.bundle_identifier {
                return Err(ConfigError::invalid(
                    format!("{field}.parent_bundle_identifier"),
                    format!("'{parent}' does not reference another declared target"),
                )
                .into());
            }
        }
    }

    Ok(())
}

fn validate_android(config: &ProjectConfig) -> Result<()> {
    if let Some(android) = &config.android {
        if !package_pattern().is_match(&android.package) {
            return Err(ConfigError::invalid(
                "android.package",
                format!("'{}' is not a valid package name", android.package),
            )
            .into());
        }
    }
    Ok(())
}

fn validate_apple(config: &ProjectConfig) -> Result<()> {
    let Some(apple) = &config.apple else {
        return Ok(());
    };
    for (field, value) in [
        ("apple.key_id", &apple.key_id),
        ("apple.issuer_id", &apple.issuer_id),
        ("apple.team_id", &apple.team_id),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::MissingField(field.to_string()).into());
        }
    }
    if apple.csr_path.is_some() != apple.csr_key_path.is_some() {
        return Err(ConfigError::invalid(
            "apple.csr_key_path",
            "csr_path and csr_key_path must be set together",
        )
        .into());
    }
    Ok(())
}
