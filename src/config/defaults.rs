//! System-wide default constants.
//!
//! Centralises magic numbers shared by the binaries, storage and API layers.

// ============================================================================
// Configuration Discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "MOTION_GAUGE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "motion_gauge.toml";

/// Environment variable overriding `server.addr`.
pub const SERVER_ADDR_ENV_VAR: &str = "MOTION_GAUGE_SERVER_ADDR";

// ============================================================================
// Ledger Storage
// ============================================================================

/// Most-recent results kept in the ledger (oldest evicted first).
pub const LEDGER_CAPACITY: usize = 200;

/// Default data directory path.
pub const DATA_DIR: &str = "./data";

/// sled database directory name inside the data directory.
pub const DB_DIR_NAME: &str = "motion_gauge.db";

/// Named sled tree holding the ledger blob.
pub const LEDGER_TREE: &str = "ledger";

/// Key of the single JSON blob inside [`LEDGER_TREE`].
pub const LEDGER_BLOB_KEY: &str = "results";

// ============================================================================
// Pipeline
// ============================================================================

/// Capacity of the command channel feeding the tick loop.
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Base delay between frames in the simulation binary at `--speed 1` (ms).
pub const SIMULATION_FRAME_INTERVAL_MS: u64 = 33;
