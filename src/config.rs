use crate::cli::{Check, Cli};
use crate::emoji::GEMOJI_URL;
use crate::http_client::HttpClientConfig;
use crate::images::ImageOptions;
use crate::toc::TocOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Trait for abstracting environment variable access
pub trait EnvProvider {
    fn get(&self, key: &str) -> Option<String>;
}

/// System environment variable provider for production use
pub struct SystemEnvProvider;

impl EnvProvider for SystemEnvProvider {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub checks: ChecksConfig,
    pub paths: PathsConfig,
    pub network: NetworkConfig,
    pub output: OutputConfig,
}

/// Corpus layout
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CorpusConfig {
    /// Directory name prefix of every hub
    pub hub_prefix: String,
    /// Hubs to check; empty means every hub of the stable versions file
    pub hubs: Vec<String>,
    /// Domain whose absolute links count as self links
    pub site_domain: String,
}

/// Which checkers run and their hub-level options
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChecksConfig {
    pub enabled: Vec<Check>,
    /// Hubs whose latest version needs no redirects
    pub redirect_exempt_hubs: Vec<String>,
    /// Bill-of-materials directory name, skipped by ToC coverage
    pub bom_dir: String,
    /// Extra image listings (potential sizes, most referenced)
    pub image_extras: bool,
    /// Entries in each "largest images" listing
    pub image_top_count: usize,
}

/// Input and output files. Relative paths resolve against the corpus root.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub results_dir: PathBuf,
    pub stable_versions: PathBuf,
    pub emoji_names: PathBuf,
}

/// Network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// HTTP request timeout in seconds
    pub timeout_seconds: u64,
    /// Number of retry attempts for failed downloads
    pub retry_attempts: u32,
    /// Retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Source of the emoji catalog when the names file is missing
    pub emoji_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct OutputConfig {
    /// Verbose output
    pub verbose: bool,
    /// Quiet mode (verdict only)
    pub quiet: bool,
    /// Broken links listed per hub
    pub max_link_issues: Option<usize>,
    /// Broken images listed per hub
    pub max_image_issues: Option<usize>,
    /// Only list broken links having this issue code
    pub issue_filter: Option<String>,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            hub_prefix: "farmbot-".to_string(),
            hubs: vec![],
            site_domain: "farm.bot".to_string(),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        let toc = TocOptions::default();
        let images = ImageOptions::default();
        Self {
            enabled: vec![Check::Links, Check::Emoji],
            redirect_exempt_hubs: toc.redirect_exempt_hubs,
            bom_dir: toc.bom_dir,
            image_extras: images.extras,
            image_top_count: images.top_count,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("results"),
            stable_versions: PathBuf::from("STABLE_VERSIONS.json"),
            emoji_names: PathBuf::from("valid_emoji_names.json"),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 1000,
            emoji_url: GEMOJI_URL.to_string(),
        }
    }
}

impl Config {
    /// Resolve a configured path against the corpus root.
    pub fn resolve(root: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    pub fn is_enabled(&self, check: Check) -> bool {
        self.checks.enabled.contains(&check)
    }

    pub fn toc_options(&self) -> TocOptions {
        TocOptions {
            redirect_exempt_hubs: self.checks.redirect_exempt_hubs.clone(),
            bom_dir: self.checks.bom_dir.clone(),
        }
    }

    pub fn image_options(&self) -> ImageOptions {
        ImageOptions {
            top_count: self.checks.image_top_count,
            extras: self.checks.image_extras,
        }
    }

    pub fn http_client_config(&self) -> HttpClientConfig {
        HttpClientConfig {
            timeout_seconds: self.network.timeout_seconds,
            retry_attempts: self.network.retry_attempts,
            retry_delay_ms: self.network.retry_delay_ms,
            ..HttpClientConfig::default()
        }
    }
}

/// Configuration manager for loading and merging configurations
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration with precedence: file -> environment -> CLI
    pub async fn load_config(cli: &Cli) -> Result<Config> {
        let mut config = Config::default();

        if let Some(config_path) = &cli.config {
            let file_config = Self::load_from_file(config_path).await?;
            config = Self::merge_configs(config, file_config);
        } else if let Some(found_config) = Self::find_config_file().await? {
            config = Self::merge_configs(config, found_config);
        }

        config = Self::apply_environment_overrides(config)?;
        config = Self::merge_with_cli(config, cli);

        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Load configuration from a file (TOML or JSON)
    pub async fn load_from_file(path: &Path) -> Result<Config> {
        let content = tokio::fs::read_to_string(path).await?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(toml::from_str(&content)?),
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => {
                // Try to parse as TOML first, then JSON
                if let Ok(config) = toml::from_str::<Config>(&content) {
                    Ok(config)
                } else {
                    Ok(serde_json::from_str(&content)?)
                }
            }
        }
    }

    /// Find configuration file in standard locations
    pub async fn find_config_file() -> Result<Option<Config>> {
        let config_names = [
            "docs-check.toml",
            "docs-check.json",
            ".docs-check.toml",
            ".docs-check.json",
        ];

        for name in &config_names {
            let path = PathBuf::from(name);
            if path.exists() {
                return Ok(Some(Self::load_from_file(&path).await?));
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let app_config_dir = config_dir.join("docs-check");
            for name in &config_names {
                let path = app_config_dir.join(name);
                if path.exists() {
                    return Ok(Some(Self::load_from_file(&path).await?));
                }
            }
        }

        Ok(None)
    }

    /// Apply environment variable overrides using the system environment
    pub fn apply_environment_overrides(config: Config) -> Result<Config> {
        Self::apply_environment_overrides_with(&SystemEnvProvider, config)
    }

    /// Apply environment variable overrides with a custom environment provider
    pub fn apply_environment_overrides_with(
        env: &impl EnvProvider,
        mut config: Config,
    ) -> Result<Config> {
        // Corpus
        if let Some(prefix) = env.get("DOCS_CHECK_HUB_PREFIX") {
            config.corpus.hub_prefix = prefix;
        }
        if let Some(hubs) = env.get("DOCS_CHECK_HUBS") {
            config.corpus.hubs = split_list(&hubs);
        }
        if let Some(domain) = env.get("DOCS_CHECK_SITE_DOMAIN") {
            config.corpus.site_domain = domain;
        }

        // Checks
        if let Some(checks) = env.get("DOCS_CHECK_CHECKS") {
            config.checks.enabled = split_list(&checks)
                .iter()
                .map(|name| {
                    Check::parse(name).ok_or_else(|| {
                        ConfigError::Environment(format!("Invalid DOCS_CHECK_CHECKS value: {}", name))
                    })
                })
                .collect::<Result<_>>()?;
        }

        // Paths
        if let Some(dir) = env.get("DOCS_CHECK_RESULTS_DIR") {
            config.paths.results_dir = PathBuf::from(dir);
        }
        if let Some(path) = env.get("DOCS_CHECK_STABLE_VERSIONS") {
            config.paths.stable_versions = PathBuf::from(path);
        }
        if let Some(path) = env.get("DOCS_CHECK_EMOJI_NAMES") {
            config.paths.emoji_names = PathBuf::from(path);
        }

        // Network
        if let Some(timeout) = env.get("DOCS_CHECK_TIMEOUT") {
            config.network.timeout_seconds = parse_env("DOCS_CHECK_TIMEOUT", &timeout)?;
        }
        if let Some(retry_attempts) = env.get("DOCS_CHECK_RETRY_ATTEMPTS") {
            config.network.retry_attempts = parse_env("DOCS_CHECK_RETRY_ATTEMPTS", &retry_attempts)?;
        }
        if let Some(url) = env.get("DOCS_CHECK_EMOJI_URL") {
            config.network.emoji_url = url;
        }

        // Output
        if let Some(verbose) = env.get("DOCS_CHECK_VERBOSE") {
            config.output.verbose = parse_env("DOCS_CHECK_VERBOSE", &verbose)?;
        }
        if let Some(quiet) = env.get("DOCS_CHECK_QUIET") {
            config.output.quiet = parse_env("DOCS_CHECK_QUIET", &quiet)?;
        }
        if let Some(filter) = env.get("DOCS_CHECK_ISSUE_FILTER") {
            config.output.issue_filter = Some(filter);
        }

        Ok(config)
    }

    /// Merge CLI arguments with configuration (CLI takes precedence)
    pub fn merge_with_cli(mut config: Config, cli: &Cli) -> Config {
        if !cli.hubs.is_empty() {
            config.corpus.hubs = cli.hubs.clone();
        }
        if !cli.checks.is_empty() {
            config.checks.enabled = cli.checks.clone();
        }
        if cli.image_extras {
            config.checks.image_extras = true;
        }

        if let Some(dir) = &cli.results_dir {
            config.paths.results_dir = dir.clone();
        }
        if let Some(path) = &cli.stable_versions {
            config.paths.stable_versions = path.clone();
        }
        if let Some(path) = &cli.emoji_names {
            config.paths.emoji_names = path.clone();
        }

        if let Some(timeout) = cli.timeout {
            config.network.timeout_seconds = timeout;
        }

        // An explicit verbosity flag replaces the configured one
        if cli.verbose || cli.quiet {
            config.output.verbose = cli.verbose;
            config.output.quiet = cli.quiet;
        }
        if cli.max_link_issues.is_some() {
            config.output.max_link_issues = cli.max_link_issues;
        }
        if cli.max_image_issues.is_some() {
            config.output.max_image_issues = cli.max_image_issues;
        }
        if cli.issue_filter.is_some() {
            config.output.issue_filter = cli.issue_filter.clone();
        }

        config
    }

    /// Merge two configurations (second takes precedence for set values)
    pub fn merge_configs(mut base: Config, override_config: Config) -> Config {
        // Corpus
        base.corpus.hub_prefix = override_config.corpus.hub_prefix;
        if !override_config.corpus.hubs.is_empty() {
            base.corpus.hubs = override_config.corpus.hubs;
        }
        base.corpus.site_domain = override_config.corpus.site_domain;

        // Checks
        if !override_config.checks.enabled.is_empty() {
            base.checks.enabled = override_config.checks.enabled;
        }
        base.checks.redirect_exempt_hubs = override_config.checks.redirect_exempt_hubs;
        base.checks.bom_dir = override_config.checks.bom_dir;
        base.checks.image_extras = override_config.checks.image_extras;
        base.checks.image_top_count = override_config.checks.image_top_count;

        // Paths
        base.paths = override_config.paths;

        // Network
        base.network = override_config.network;

        // Output
        base.output.verbose = override_config.output.verbose;
        base.output.quiet = override_config.output.quiet;
        if override_config.output.max_link_issues.is_some() {
            base.output.max_link_issues = override_config.output.max_link_issues;
        }
        if override_config.output.max_image_issues.is_some() {
            base.output.max_image_issues = override_config.output.max_image_issues;
        }
        if override_config.output.issue_filter.is_some() {
            base.output.issue_filter = override_config.output.issue_filter;
        }

        base
    }

    /// Validate configuration values
    pub fn validate_config(config: &Config) -> Result<()> {
        if config.corpus.hub_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "Hub prefix must not be empty".to_string(),
            ));
        }

        if config.checks.enabled.is_empty() {
            return Err(ConfigError::Validation(
                "At least one check must be enabled".to_string(),
            ));
        }

        if config.network.timeout_seconds == 0 {
            return Err(ConfigError::Validation(
                "Timeout must be greater than 0".to_string(),
            ));
        }

        if config.network.retry_attempts > 10 {
            return Err(ConfigError::Validation(
                "Retry attempts cannot exceed 10".to_string(),
            ));
        }

        if config.output.verbose && config.output.quiet {
            return Err(ConfigError::Validation(
                "Cannot enable both verbose and quiet modes".to_string(),
            ));
        }

        if let Some(filter) = &config.output.issue_filter
            && crate::links::link_issue_from_code(filter).is_none()
        {
            return Err(ConfigError::Validation(format!(
                "Unknown link issue filter: {}",
                filter
            )));
        }

        Ok(())
    }

    /// Convert configuration to Duration for network timeout
    pub fn get_timeout_duration(config: &Config) -> Duration {
        Duration::from_secs(config.network.timeout_seconds)
    }

    /// Convert configuration to Duration for retry delay
    pub fn get_retry_delay_duration(config: &Config) -> Duration {
        Duration::from_millis(config.network.retry_delay_ms)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| ConfigError::Environment(format!("Invalid {} value: {}", key, value)))
}
