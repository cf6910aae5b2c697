//! Ambient tuning knobs for the engine.
//!
//! The only component whose behavior needs external tuning is the external
//! sort: how many rows it buffers per run before spilling, and where it spills
//! them to. Everything else in the engine runs in O(1) memory or is bounded by
//! the data itself (a reduce group, a join's right-hand group).

use std::path::PathBuf;

/// Engine-wide configuration, currently limited to the external sort.
///
/// `Default` uses runs of about 64k rows, spilled into the process's temp
/// directory. Override either field directly, or via `EngineConfig::from_env`,
/// which honors `COMPGRAPH_SORT_RUN_ROWS` and `COMPGRAPH_SORT_SPILL_DIR` if
/// set, falling back to the defaults otherwise.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Number of rows buffered in memory before a sort run is spilled to disk.
    pub sort_run_rows: usize,
    /// Directory spill files are created in.
    pub spill_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sort_run_rows: 65_536,
            spill_dir: std::env::temp_dir(),
        }
    }
}

impl EngineConfig {
    pub fn new(sort_run_rows: usize, spill_dir: impl Into<PathBuf>) -> Self {
        EngineConfig {
            sort_run_rows,
            spill_dir: spill_dir.into(),
        }
    }

    /// Layers environment overrides on top of [`EngineConfig::default`].
    pub fn from_env() -> Self {
        let mut config = EngineConfig::default();
        if let Ok(rows) = std::env::var("COMPGRAPH_SORT_RUN_ROWS") {
            if let Ok(rows) = rows.parse() {
                config.sort_run_rows = rows;
            }
        }
        if let Ok(dir) = std::env::var("COMPGRAPH_SORT_SPILL_DIR") {
            config.spill_dir = PathBuf::from(dir);
        }
        config
    }
}
