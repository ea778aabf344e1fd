//! Configuration for a settlement ledger and the node that hosts it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{constants, EscrowError, PartyId, PartyRoles, Result};

/// How strictly the buyer's earnest deposit is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EarnestPolicy {
    /// Any positive deposit is accepted.
    Unchecked,
    /// After the deposit, the buyer's cumulative earnest must reach the
    /// record's `escrow_amount`.
    #[default]
    AtLeastEscrowAmount,
}

/// Output format for the log subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(EscrowError::Configuration(format!(
                "unknown log format {other:?} (expected pretty or json)"
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Where snapshots live on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub snapshot_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(constants::DEFAULT_DATA_DIR),
            snapshot_file: constants::DEFAULT_SNAPSHOT_FILE.to_string(),
        }
    }
}

impl StorageConfig {
    #[must_use]
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_file)
    }
}

/// Immutable configuration of one ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// The account under which the ledger holds custody of listed assets.
    pub ledger_account: PartyId,
    /// Identifier of the asset registry this ledger is bound to.
    pub registry_id: String,
    pub roles: PartyRoles,
    #[serde(default)]
    pub earnest_policy: EarnestPolicy,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

fn default_log_level() -> String {
    constants::DEFAULT_LOG_LEVEL.to_string()
}

impl LedgerConfig {
    /// Config with default storage, logging and earnest policy.
    #[must_use]
    pub fn new(ledger_account: impl Into<PartyId>, registry_id: impl Into<String>, roles: PartyRoles) -> Self {
        Self {
            ledger_account: ledger_account.into(),
            registry_id: registry_id.into(),
            roles,
            earnest_policy: EarnestPolicy::default(),
            storage: StorageConfig::default(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }

    #[must_use]
    pub fn with_earnest_policy(mut self, policy: EarnestPolicy) -> Self {
        self.earnest_policy = policy;
        self
    }

    #[must_use]
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage.data_dir = dir.into();
        self
    }

    /// Read a config from a JSON file. Does not validate.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EscrowError::Configuration(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| EscrowError::Configuration(format!("cannot parse {}: {e}", path.display())))
    }

    /// Apply `REALTY_*` environment overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(constants::ENV_DATA_DIR) {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup(constants::ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(format) = lookup(constants::ENV_LOG_FORMAT) {
            self.log_format = format.parse()?;
        }
        Ok(())
    }

    /// Check identifiers and role separation.
    pub fn validate(&self) -> Result<()> {
        if !self.ledger_account.is_valid() {
            return Err(EscrowError::Configuration(
                "ledger_account must be a non-empty party id".into(),
            ));
        }
        if self.registry_id.trim().is_empty() {
            return Err(EscrowError::Configuration("registry_id must not be empty".into()));
        }
        self.roles.validate()?;
        if self.roles.global_role_of(&self.ledger_account).is_some() {
            return Err(EscrowError::Configuration(
                "ledger_account must differ from seller, inspector and lender".into(),
            ));
        }
        if self.storage.snapshot_file.trim().is_empty() {
            return Err(EscrowError::Configuration("snapshot_file must not be empty".into()));
        }
        Ok(())
    }
}

/// Dummy config for unit tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl LedgerConfig {
    pub fn dummy() -> Self {
        Self::new(
            "escrow-ledger",
            "property-registry",
            PartyRoles::new("seller", "inspector", "lender"),
        )
    }
}
