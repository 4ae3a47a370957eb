//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "keysmith.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "keysmith.yaml";

/// Default local credentials file
pub const DEFAULT_CREDENTIALS_FILE: &str = "credentials.json";

/// Default remote credential store endpoint
pub const DEFAULT_API_ENDPOINT: &str = "https://api.keysmith.dev/graphql";

/// Environment variable overriding the API endpoint
pub const API_URL_ENV: &str = "KEYSMITH_API_URL";

/// Environment variable carrying the remote store token
pub const API_TOKEN_ENV: &str = "KEYSMITH_TOKEN";

/// Environment variable forcing non-interactive mode
pub const NON_INTERACTIVE_ENV: &str = "KEYSMITH_NON_INTERACTIVE";

/// Get list of config file names to search for, in priority order
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".keysmith.toml",
        ".keysmith.yaml",
    ]
}
