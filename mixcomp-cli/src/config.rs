//! Client configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//!
//! # Example Configuration
//!
//! ```toml
//! api_url = "https://computer.mixin.dev"
//! pay_url = "https://mixin.one/pay"
//! timeout_secs = 30
//! fee_ttl_secs = 60
//! transfer_lamports = 10000000
//!
//! [[assets]]
//! id = "64692c23-8971-4cf4-84a7-4dd1271dd887"
//! symbol = "SOL"
//! purpose = "deposit"
//! amount = "${SOL_DEPOSIT}"
//!
//! [[assets]]
//! id = "c94ac88f-4671-3976-b60a-09064f1811e8"
//! symbol = "XIN"
//! purpose = "fee"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to configuration file (default: `mixcomp.toml`)
//! - `COMPUTER_API_URL` - Override the API endpoint
//! - `MIXIN_PAY_URL` - Override the payment link base

use std::path::Path;
use std::time::Duration;

use mixcomp::assets::AssetRegistry;
use mixcomp::deeplink::DEFAULT_PAY_URL;
use mixcomp_http::ComputerClient;
use mixcomp_http::constants::DEFAULT_API_URL;
use mixcomp_svm::PACKET_DATA_SIZE;
use serde::Deserialize;

use crate::error::ConfigError;

/// Default configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "mixcomp.toml";

/// Everything a flow needs besides the user's input.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Computer API endpoint.
    pub api_url: String,
    /// Base of payment deep links.
    pub pay_url: String,
    /// Per-request timeout; none by default.
    pub timeout_secs: Option<u64>,
    /// Seconds a fee quote stays usable after it arrived.
    pub fee_ttl_secs: u64,
    /// Largest serialized transaction, in bytes.
    pub transaction_size_limit: usize,
    /// Lamports moved by an invocation; fee quotes are requested for the
    /// SOL each transaction moves.
    pub transfer_lamports: u64,
    /// Ask the Computer to skip post-processing of the call.
    pub skip_post_process: bool,
    /// Deposit and fee assets.
    pub assets: AssetRegistry,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            pay_url: DEFAULT_PAY_URL.to_owned(),
            timeout_secs: None,
            fee_ttl_secs: 60,
            transaction_size_limit: PACKET_DATA_SIZE,
            transfer_lamports: 10_000_000,
            skip_post_process: false,
            assets: AssetRegistry::default(),
        }
    }
}

impl ClientConfig {
    /// Loads configuration from `path`. A missing file yields the defaults.
    ///
    /// `$VAR` / `${VAR}` references are expanded from the process
    /// environment before parsing; `COMPUTER_API_URL` and `MIXIN_PAY_URL`
    /// override the file values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = if path.exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?
        } else {
            String::new()
        };
        let lookup = |name: &str| std::env::var(name).ok();
        Self::from_toml(&content, lookup)
    }

    /// Parses `content`, resolving variables and overrides through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the expanded text is not a valid
    /// configuration.
    pub fn from_toml<F>(content: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let expanded = expand_vars(content, &lookup);
        let mut config: Self = toml::from_str(&expanded)?;
        if let Some(url) = lookup("COMPUTER_API_URL") {
            config.api_url = url;
        }
        if let Some(url) = lookup("MIXIN_PAY_URL") {
            config.pay_url = url;
        }
        if config.transaction_size_limit == 0 {
            return Err(ConfigError::Invalid(
                "transaction_size_limit must be positive".to_owned(),
            ));
        }
        Ok(config)
    }

    /// Request timeout, if configured.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Builds the API client for [`ClientConfig::api_url`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the URL does not parse.
    pub fn client(&self) -> Result<ComputerClient, ConfigError> {
        let client = ComputerClient::try_from(self.api_url.as_str())
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(match self.timeout() {
            Some(timeout) => client.with_timeout(timeout),
            None => client,
        })
    }
}

/// Replaces `$VAR` and `${VAR}` with `lookup(VAR)`.
///
/// Unresolved variables are left as written.
fn expand_vars<F>(input: &str, lookup: &F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(inner) = after.strip_prefix('{') {
            match inner.find('}') {
                Some(end) => (&inner[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        match (name.is_empty(), lookup(name)) {
            (false, Some(value)) => out.push_str(&value),
            _ => out.push_str(&rest[pos..=pos + consumed]),
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mixcomp::assets::XIN_ASSET_ID;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |name| {
            vars.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn test_expand_vars() {
        let lookup = env(&[("A", "1"), ("LONG_NAME", "two")]);
        assert_eq!(expand_vars("x=$A;", &lookup), "x=1;");
        assert_eq!(expand_vars("${LONG_NAME}/$A", &lookup), "two/1");
        assert_eq!(expand_vars("$MISSING ${ALSO}", &lookup), "$MISSING ${ALSO}");
        assert_eq!(expand_vars("cost $ 5", &lookup), "cost $ 5");
        assert_eq!(expand_vars("${open", &lookup), "${open");
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = ClientConfig::from_toml("", env(&[])).unwrap();
        assert_eq!(config.api_url, "https://computer.mixin.dev");
        assert_eq!(config.pay_url, "https://mixin.one/pay");
        assert_eq!(config.fee_ttl_secs, 60);
        assert_eq!(config.transaction_size_limit, 1232);
        assert_eq!(config.transfer_lamports, 10_000_000);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.assets.deposits().count(), 2);
    }

    #[test]
    fn test_file_values_and_overrides() {
        let content = r#"
            timeout_secs = 5
            skip_post_process = true

            [[assets]]
            id = "64692c23-8971-4cf4-84a7-4dd1271dd887"
            symbol = "SOL"
            purpose = "deposit"
            amount = "${SOL_DEPOSIT}"

            [[assets]]
            id = "c94ac88f-4671-3976-b60a-09064f1811e8"
            symbol = "XIN"
            purpose = "fee"
        "#;
        let config = ClientConfig::from_toml(
            content,
            env(&[
                ("SOL_DEPOSIT", "0.5"),
                ("COMPUTER_API_URL", "http://127.0.0.1:9000"),
            ]),
        )
        .unwrap();
        assert_eq!(config.api_url, "http://127.0.0.1:9000");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert!(config.skip_post_process);
        let deposits: Vec<_> = config.assets.deposits().map(|(_, a)| a.to_string()).collect();
        assert_eq!(deposits, vec!["0.5"]);
        assert_eq!(config.assets.fee_asset().id, XIN_ASSET_ID);
    }

    #[test]
    fn test_invalid_assets_rejected() {
        let content = r#"
            [[assets]]
            id = "64692c23-8971-4cf4-84a7-4dd1271dd887"
            symbol = "SOL"
            purpose = "deposit"
            amount = "1"
        "#;
        assert!(matches!(
            ClientConfig::from_toml(content, env(&[])),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = ClientConfig::load_from(Path::new("/nonexistent/mixcomp.toml")).unwrap();
        assert_eq!(config.fee_ttl_secs, 60);
    }
}
