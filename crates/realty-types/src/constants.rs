//! System-wide constants for the realty settlement ledger.

/// Default directory for snapshots.
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Default snapshot file name inside the data directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "ledger.json";

/// Default config file name looked up by the node binary.
pub const DEFAULT_CONFIG_FILE: &str = "realty.json";

/// Snapshot schema version. Bumped on incompatible layout changes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Domain separation tag for journal hashes.
pub const JOURNAL_DOMAIN_TAG: &[u8] = b"realty:journal:v1:";

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable overriding the data directory.
pub const ENV_DATA_DIR: &str = "REALTY_DATA_DIR";

/// Environment variable overriding the log filter.
pub const ENV_LOG_LEVEL: &str = "REALTY_LOG_LEVEL";

/// Environment variable overriding the log format (`pretty` or `json`).
pub const ENV_LOG_FORMAT: &str = "REALTY_LOG_FORMAT";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "RealtyEscrow";
