use std::path::{Path, PathBuf};

use serde::Deserialize;

/// The parsed Cool.toml manifest.
#[derive(Debug, Clone)]
pub struct CoolManifest {
    pub project: ProjectSection,
    pub analysis: AnalysisSection,
    /// The directory containing the Cool.toml file.
    pub root_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

/// Knobs for the semantic analyzer and its driver.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisSection {
    /// Log graph construction and pass boundaries at debug level.
    #[serde(default)]
    pub debug: bool,
    /// Stop printing diagnostics after this many; the halt decision still
    /// counts all of them.
    #[serde(default)]
    pub max_errors: Option<usize>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Raw TOML structure for deserialization.
#[derive(Deserialize)]
struct RawManifest {
    project: ProjectSection,
    #[serde(default)]
    analysis: AnalysisSection,
}

/// Errors that can occur when loading a manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("no Cool.toml found (searched from {0})")]
    NotFound(String),
    #[error("failed to read Cool.toml: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("invalid Cool.toml: {0}")]
    ParseError(String),
    #[error("invalid Cool.toml: [analysis] max_errors must be at least 1")]
    ZeroMaxErrors,
}

/// Walk up from `start_dir` looking for `Cool.toml`.
/// Returns the path to the manifest file if found.
pub fn find_manifest(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();
    loop {
        let candidate = current.join("Cool.toml");
        if candidate.is_file() {
            return Some(candidate);
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Load and validate a Cool.toml manifest from a file path.
pub fn load_manifest(path: &Path) -> Result<CoolManifest, ManifestError> {
    let content = std::fs::read_to_string(path)?;
    let root_dir = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    parse_manifest(&content, root_dir)
}

/// Parse and validate a Cool.toml manifest from a string.
pub fn parse_manifest(content: &str, root_dir: PathBuf) -> Result<CoolManifest, ManifestError> {
    let raw: RawManifest =
        toml::from_str(content).map_err(|e| ManifestError::ParseError(e.to_string()))?;

    if raw.analysis.max_errors == Some(0) {
        return Err(ManifestError::ZeroMaxErrors);
    }

    Ok(CoolManifest {
        project: raw.project,
        analysis: raw.analysis,
        root_dir,
    })
}

/// Find and load the manifest starting from an input file's directory.
pub fn find_and_load_manifest(input_file: &Path) -> Result<CoolManifest, ManifestError> {
    let start_dir = input_file.parent().unwrap_or_else(|| Path::new("."));
    let manifest_path = find_manifest(start_dir)
        .ok_or_else(|| ManifestError::NotFound(start_dir.display().to_string()))?;
    load_manifest(&manifest_path)
}
