use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// File constants
// ---------------------------------------------------------------------------

/// psiTurk experiment configuration, read for the default HIT title.
pub const CONFIG_FILE: &str = "config.txt";
pub const LEDGER_FILE: &str = "hitman-ledger.yaml";
pub const BATCH_LOG_FILE: &str = "hitman-batch.log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

pub fn ledger_path(dir: &Path) -> PathBuf {
    dir.join(LEDGER_FILE)
}

pub fn batch_log_path(dir: &Path) -> PathBuf {
    dir.join(BATCH_LOG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_live_in_working_dir() {
        let dir = Path::new("/tmp/study");
        assert_eq!(config_path(dir), Path::new("/tmp/study/config.txt"));
        assert_eq!(ledger_path(dir), Path::new("/tmp/study/hitman-ledger.yaml"));
        assert_eq!(batch_log_path(dir), Path::new("/tmp/study/hitman-batch.log"));
    }
}
