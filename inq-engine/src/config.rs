//! Scan configuration resolution
//!
//! Credentials and limits are resolved with CLI → ENV → TOML priority.
//! A credential found in more than one tier is used from the highest one,
//! with a warning.

use crate::scan::ScanSettings;
use crate::sources::{GoogleCredentials, SourceSettings, SourcesConfig};
use inq_common::config::{is_valid_key, TomlConfig};
use std::time::Duration;
use tracing::{info, warn};

pub const GOOGLE_DEV_KEY_ENV_VAR: &str = "INQ_GOOGLE_DEV_KEY";
pub const GOOGLE_CSE_ID_ENV_VAR: &str = "INQ_GOOGLE_CSE_ID";
pub const SHODAN_API_KEY_ENV_VAR: &str = "INQ_SHODAN_API_KEY";

/// Values given on the `scan` command line
#[derive(Debug, Clone, Default)]
pub struct ScanOverrides {
    pub google_dev_key: Option<String>,
    pub google_cse_id: Option<String>,
    pub google_page_limit: Option<u32>,
    pub shodan_api_key: Option<String>,
    pub shodan_page_limit: Option<u32>,
    pub workers: Option<usize>,
}

/// Resolve one credential from its three tiers
///
/// Returns `None` when no tier holds a valid (non-blank) value.
pub fn resolve_credential(
    name: &str,
    cli: Option<&str>,
    env_var: &str,
    toml: Option<&str>,
) -> Option<String> {
    let env = std::env::var(env_var).ok();
    let tiers = [
        ("command line", cli),
        ("environment", env.as_deref()),
        ("TOML", toml),
    ];

    let found: Vec<(&str, &str)> = tiers
        .into_iter()
        .filter_map(|(tier, value)| value.filter(|v| is_valid_key(v)).map(|v| (tier, v)))
        .collect();

    if found.len() > 1 {
        let tiers: Vec<&str> = found.iter().map(|(tier, _)| *tier).collect();
        warn!(
            "{} found in multiple sources: {}. Using {} (highest priority).",
            name,
            tiers.join(", "),
            found[0].0
        );
    }

    found.first().map(|(tier, value)| {
        info!("{} loaded from {}", name, tier);
        value.trim().to_string()
    })
}

/// Credentials, quota limits and HTTP timeout for building sources
pub fn resolve_sources_config(overrides: &ScanOverrides, toml: &TomlConfig) -> SourcesConfig {
    let dev_key = resolve_credential(
        "Google developer key",
        overrides.google_dev_key.as_deref(),
        GOOGLE_DEV_KEY_ENV_VAR,
        toml.google.dev_key.as_deref(),
    );
    let cse_id = resolve_credential(
        "Google CSE id",
        overrides.google_cse_id.as_deref(),
        GOOGLE_CSE_ID_ENV_VAR,
        toml.google.cse_id.as_deref(),
    );
    let google = match (dev_key, cse_id) {
        (Some(dev_key), Some(cse_id)) => Some(GoogleCredentials { dev_key, cse_id }),
        _ => None,
    };

    let shodan_api_key = resolve_credential(
        "Shodan API key",
        overrides.shodan_api_key.as_deref(),
        SHODAN_API_KEY_ENV_VAR,
        toml.shodan.api_key.as_deref(),
    );

    SourcesConfig {
        google,
        google_settings: SourceSettings {
            page_limit: overrides.google_page_limit.or(toml.google.page_limit),
            page_budget: toml.google.page_budget,
        },
        shodan_api_key,
        shodan_settings: SourceSettings {
            page_limit: overrides.shodan_page_limit.or(toml.shodan.page_limit),
            page_budget: toml.shodan.page_budget,
        },
        request_timeout: Duration::from_secs(toml.scan.request_timeout_secs.max(1)),
    }
}

/// Worker count and per-asset timeout
pub fn resolve_scan_settings(overrides: &ScanOverrides, toml: &TomlConfig) -> ScanSettings {
    ScanSettings {
        workers: overrides.workers.unwrap_or(toml.scan.workers).max(1),
        asset_timeout: Duration::from_secs(toml.scan.asset_timeout_secs.max(1)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_cli_beats_env_beats_toml() {
        std::env::set_var(SHODAN_API_KEY_ENV_VAR, "from-env");
        assert_eq!(
            resolve_credential("key", Some("from-cli"), SHODAN_API_KEY_ENV_VAR, Some("from-toml")).as_deref(),
            Some("from-cli")
        );
        assert_eq!(
            resolve_credential("key", None, SHODAN_API_KEY_ENV_VAR, Some("from-toml")).as_deref(),
            Some("from-env")
        );
        std::env::remove_var(SHODAN_API_KEY_ENV_VAR);
        assert_eq!(
            resolve_credential("key", None, SHODAN_API_KEY_ENV_VAR, Some("from-toml")).as_deref(),
            Some("from-toml")
        );
    }

    #[test]
    #[serial]
    fn test_blank_credentials_are_skipped() {
        std::env::set_var(SHODAN_API_KEY_ENV_VAR, "   ");
        assert_eq!(
            resolve_credential("key", Some(""), SHODAN_API_KEY_ENV_VAR, Some(" toml-key ")).as_deref(),
            Some("toml-key")
        );
        assert_eq!(resolve_credential("key", None, SHODAN_API_KEY_ENV_VAR, None), None);
        std::env::remove_var(SHODAN_API_KEY_ENV_VAR);
    }

    #[test]
    #[serial]
    fn test_google_needs_both_credentials() {
        std::env::remove_var(GOOGLE_DEV_KEY_ENV_VAR);
        std::env::remove_var(GOOGLE_CSE_ID_ENV_VAR);
        std::env::remove_var(SHODAN_API_KEY_ENV_VAR);

        let mut toml = TomlConfig::default();
        toml.google.dev_key = Some("dev".into());
        toml.google.page_limit = Some(3);
        toml.google.page_budget = Some(100);

        let overrides = ScanOverrides::default();
        let config = resolve_sources_config(&overrides, &toml);
        assert!(config.google.is_none());
        assert!(config.shodan_api_key.is_none());

        let overrides = ScanOverrides {
            google_cse_id: Some("cse".into()),
            google_page_limit: Some(1),
            ..ScanOverrides::default()
        };
        let config = resolve_sources_config(&overrides, &toml);
        let google = config.google.unwrap();
        assert_eq!(google.dev_key, "dev");
        assert_eq!(google.cse_id, "cse");
        assert_eq!(config.google_settings.page_limit, Some(1));
        assert_eq!(config.google_settings.page_budget, Some(100));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_scan_settings() {
        let toml = TomlConfig::default();
        let settings = resolve_scan_settings(&ScanOverrides::default(), &toml);
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.asset_timeout, Duration::from_secs(300));

        let overrides = ScanOverrides {
            workers: Some(0),
            ..ScanOverrides::default()
        };
        assert_eq!(resolve_scan_settings(&overrides, &toml).workers, 1);
    }
}
