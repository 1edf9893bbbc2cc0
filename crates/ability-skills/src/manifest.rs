//! Ability manifests: the `config.json` that registers an ability with the
//! host.
//!
//! Manifests live one per directory:
//!
//! ```text
//! abilities/
//!   grocery-list/config.json
//!   weather/config.json
//! ```
//!
//! A manifest on disk overrides the hotwords of the built-in ability with
//! the same `unique_name`.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkillError};

/// File name looked up in each ability directory.
pub const MANIFEST_FILE: &str = "config.json";

/// Registration record for one ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityManifest {
    pub unique_name: String,
    #[serde(default)]
    pub matching_hotwords: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl AbilityManifest {
    pub fn new<I, S>(unique_name: impl Into<String>, hotwords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            unique_name: unique_name.into(),
            matching_hotwords: hotwords.into_iter().map(Into::into).collect(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Check the manifest the way the platform's validator does.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        let name = self.unique_name.trim();

        if name.is_empty() {
            report.errors.push("unique_name is empty".to_string());
        } else if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
        {
            report.errors.push(format!(
                "unique_name `{name}` may only contain lowercase letters, digits, `-` and `_`"
            ));
        }

        if self.matching_hotwords.is_empty() {
            report.errors.push("matching_hotwords is empty".to_string());
        }

        let mut seen = HashSet::new();
        for (i, hotword) in self.matching_hotwords.iter().enumerate() {
            let normalised = hotword.trim().to_lowercase();
            if normalised.is_empty() {
                report.errors.push(format!("hotword #{} is blank", i + 1));
                continue;
            }
            if normalised.chars().count() == 1 {
                report
                    .warnings
                    .push(format!("hotword `{normalised}` is a single character"));
            }
            if !seen.insert(normalised.clone()) {
                report
                    .warnings
                    .push(format!("hotword `{normalised}` is listed more than once"));
            }
        }

        report
    }
}

/// Outcome of [`AbilityManifest::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load a single manifest file.
pub fn load_manifest(path: &Path) -> Result<AbilityManifest> {
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| SkillError::InvalidManifest {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load every `<dir>/<ability>/config.json`.
///
/// Subdirectories without a manifest are skipped and unreadable manifests
/// are logged and skipped.  A missing directory yields an empty list.
pub fn load_manifests_from_dir(dir: &Path) -> Result<Vec<AbilityManifest>> {
    if !dir.exists() {
        tracing::debug!(path = %dir.display(), "abilities directory does not exist");
        return Ok(Vec::new());
    }

    let mut manifests = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }

        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            tracing::trace!(path = %path.display(), "no config.json, skipping");
            continue;
        }

        match load_manifest(&manifest_path) {
            Ok(manifest) => {
                tracing::info!(
                    ability = %manifest.unique_name,
                    hotwords = manifest.matching_hotwords.len(),
                    "loaded manifest"
                );
                manifests.push(manifest);
            }
            Err(e) => {
                tracing::warn!(
                    path = %manifest_path.display(),
                    error = %e,
                    "failed to load manifest"
                );
            }
        }
    }

    manifests.sort_by(|a, b| a.unique_name.cmp(&b.unique_name));
    tracing::info!(count = manifests.len(), dir = %dir.display(), "manifests loaded");
    Ok(manifests)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
