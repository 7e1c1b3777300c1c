use crate::error::{HitmanError, Result};
use crate::paths;
use std::collections::BTreeMap;
use std::path::Path;

// ---------------------------------------------------------------------------
// ExperimentConfig
// ---------------------------------------------------------------------------

/// Key/value settings read from a psiTurk `config.txt`.
///
/// Only `key = value` lines are kept. Section headers and comment lines are
/// skipped, keys are lowercased, and a later line overrides an earlier one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentConfig {
    values: BTreeMap<String, String>,
}

impl ExperimentConfig {
    pub fn parse(text: &str) -> Self {
        let mut values = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            if key.is_empty() {
                continue;
            }
            values.insert(key, value.trim().to_string());
        }
        Self { values }
    }

    /// Load `config.txt` from `dir`. A missing file is a configuration error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = paths::config_path(dir);
        let text = crate::io::read_optional(&path)?
            .ok_or_else(|| HitmanError::ConfigNotFound(dir.display().to_string()))?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn title(&self) -> Option<&str> {
        self.get("title")
    }

    /// psiTurk's `launch_in_sandbox_mode`; unset counts as false.
    pub fn launches_in_sandbox(&self) -> bool {
        self.get("launch_in_sandbox_mode")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "yes" | "1" | "on"))
            .unwrap_or(false)
    }
}

/// Resolve the experiment title: explicit argument first, then `config.txt`.
pub fn resolve_title(explicit: Option<&str>, dir: &Path) -> Result<String> {
    if let Some(t) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(t.to_string());
    }
    let config = ExperimentConfig::load(dir)?;
    config
        .title()
        .map(str::to_string)
        .ok_or(HitmanError::TitleMissing)
}
