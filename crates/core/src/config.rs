//! TOML-based configuration system for onboard.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};

/// Shortest generated password the configuration accepts.
pub const MIN_GENERATED_PASSWORD_LENGTH: usize = 8;

/// Top-level onboard configuration, deserialized from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnboardConfig {
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub groups: GroupsConfig,
    #[serde(default)]
    pub passwords: PasswordStrategy,
    #[serde(default)]
    pub home_directory: Option<HomeDirectoryConfig>,
    #[serde(default)]
    pub notification: Option<NotificationConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// LDAP connection settings and the directory locations accounts go to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    pub server: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub base_dn: String,
    /// Parent of the per-department OUs. Defaults to `base_dn`.
    #[serde(default)]
    pub users_root: Option<String>,
    /// Suffix for principal names. Derived from `base_dn` when absent.
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
}

fn default_tls_verify() -> bool {
    true
}

impl DirectoryConfig {
    /// Directory root that department OUs are created under.
    pub fn users_root(&self) -> &str {
        self.users_root
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or(&self.base_dn)
    }

    /// Domain used for `username@domain` principal names.
    pub fn domain(&self) -> String {
        match self.domain.as_deref() {
            Some(d) if !d.trim().is_empty() => d.trim().to_string(),
            _ => base_dn_to_domain(&self.base_dn),
        }
    }
}

/// Convert a base DN like `DC=example,DC=com` to a domain like `example.com`.
pub fn base_dn_to_domain(base_dn: &str) -> String {
    base_dn
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            part.get(..3)
                .filter(|prefix| prefix.eq_ignore_ascii_case("DC="))
                .map(|_| &part[3..])
        })
        .collect::<Vec<&str>>()
        .join(".")
}

/// Group assignment on account creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsConfig {
    /// Groups for departments with no entry in `departments`.
    #[serde(default = "default_groups")]
    pub default: Vec<String>,
    #[serde(default)]
    pub departments: BTreeMap<String, Vec<String>>,
}

impl Default for GroupsConfig {
    fn default() -> Self {
        Self {
            default: default_groups(),
            departments: BTreeMap::new(),
        }
    }
}

fn default_groups() -> Vec<String> {
    vec!["Domain Users".into()]
}

/// How initial passwords are chosen for new accounts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PasswordStrategy {
    /// Every account gets the same placeholder password.
    Fixed { value: String },
    /// Each account gets a random password of `length` characters.
    Generated {
        #[serde(default = "default_password_length")]
        length: usize,
    },
}

impl Default for PasswordStrategy {
    fn default() -> Self {
        Self::Generated {
            length: default_password_length(),
        }
    }
}

fn default_password_length() -> usize {
    12
}

/// Home folder provisioning for new accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeDirectoryConfig {
    /// Share or local path that per-user folders are created under.
    pub root: String,
    /// Drive letter mapped to the folder, e.g. `H:`.
    #[serde(default)]
    pub drive: Option<String>,
}

/// Welcome notification delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub webhook_url: String,
    #[serde(default)]
    pub include_password: bool,
    #[serde(default = "default_notification_timeout")]
    pub timeout_secs: u64,
}

fn default_notification_timeout() -> u64 {
    30
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LoggingConfig {
    /// Optional plain-text copy of the console log.
    #[serde(default)]
    pub file: Option<String>,
}

/// Report artifact settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_report_dir")]
    pub directory: String,
    #[serde(default)]
    pub format: ReportFormat,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            directory: default_report_dir(),
            format: ReportFormat::default(),
        }
    }
}

fn default_report_dir() -> String {
    "reports".into()
}

/// Encoding of the report artifact.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Csv,
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Csv => "csv",
            ReportFormat::Json => "json",
        }
    }
}

impl OnboardConfig {
    /// Load configuration from a TOML file at the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| OnboardError::Config(format!("failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Validate the configuration, returning an error for invalid combinations.
    pub fn validate(&self) -> Result<()> {
        if self.directory.server.trim().is_empty() {
            return Err(OnboardError::Config(
                "directory.server must not be empty".into(),
            ));
        }

        if self.directory.base_dn.trim().is_empty() {
            return Err(OnboardError::Config(
                "directory.base_dn must not be empty".into(),
            ));
        }

        if self.directory.domain().is_empty() {
            return Err(OnboardError::Config(
                "directory.domain is required when base_dn has no DC= components".into(),
            ));
        }

        match &self.passwords {
            PasswordStrategy::Fixed { value } if value.is_empty() => {
                return Err(OnboardError::Config(
                    "passwords.value must not be empty when strategy is fixed".into(),
                ));
            }
            PasswordStrategy::Generated { length } if *length < MIN_GENERATED_PASSWORD_LENGTH => {
                return Err(OnboardError::Config(format!(
                    "passwords.length must be at least {MIN_GENERATED_PASSWORD_LENGTH}"
                )));
            }
            _ => {}
        }

        if let Some((department, _)) = self
            .groups
            .departments
            .iter()
            .find(|(_, groups)| groups.is_empty())
        {
            return Err(OnboardError::Config(format!(
                "groups.departments.{department} must list at least one group"
            )));
        }

        if let Some(ref home) = self.home_directory {
            if home.root.trim().is_empty() {
                return Err(OnboardError::Config(
                    "home_directory.root must not be empty".into(),
                ));
            }
        }

        if let Some(ref notification) = self.notification {
            let url = notification.webhook_url.as_str();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(OnboardError::Config(format!(
                    "notification.webhook_url must be an http(s) URL: {url}"
                )));
            }
        }

        Ok(())
    }

    /// Generate a sensible default configuration.
    pub fn generate_default() -> Self {
        let mut departments = BTreeMap::new();
        departments.insert(
            "IT".to_string(),
            vec!["IT-Staff".to_string(), "VPN-Users".to_string()],
        );
        departments.insert("HR".to_string(), vec!["HR-Staff".to_string()]);

        Self {
            directory: DirectoryConfig {
                server: "ldaps://dc01.corp.local:636".into(),
                bind_dn: "CN=svc-onboard,OU=Service Accounts,DC=corp,DC=local".into(),
                bind_password: "change-me".into(),
                base_dn: "DC=corp,DC=local".into(),
                users_root: Some("OU=Users,DC=corp,DC=local".into()),
                domain: None,
                tls_verify: true,
            },
            groups: GroupsConfig {
                default: default_groups(),
                departments,
            },
            passwords: PasswordStrategy::default(),
            home_directory: None,
            notification: None,
            logging: LoggingConfig::default(),
            report: ReportConfig::default(),
        }
    }
}
