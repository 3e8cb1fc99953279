//! Static asset bundle
//!
//! static/*.json + classified schools → one compact JSON document + SHA-512 manifest

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Key the classified-schools document is stored under.
pub const SCHOOLS_KEY: &str = "schools";

/// Bundle manifest, written next to the bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleInfo {
    /// SHA-512 of the bundle bytes (hex)
    pub sha512: String,
    /// Bundle size in bytes
    pub size: u64,
}

impl BundleInfo {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha512::new();
        hasher.update(bytes);
        Self {
            sha512: format!("{:x}", hasher.finalize()),
            size: bytes.len() as u64,
        }
    }
}

/// Paths used by [`build_bundle`]
#[derive(Debug, Clone)]
pub struct BundlePaths<'a> {
    pub static_dir: &'a Path,
    pub schools: &'a Path,
    pub output: &'a Path,
    pub info: &'a Path,
}

/// Merge every `*.json` of the static directory (keyed by file stem) and the
/// classified-schools document into one bundle.
///
/// Missing inputs are skipped with a warning, like the rest of the asset
/// pipeline. Unless `keep_schools` is set the consumed schools file is removed.
pub fn build_bundle(paths: &BundlePaths<'_>, keep_schools: bool) -> Result<BundleInfo> {
    let mut output = serde_json::Map::new();

    if paths.static_dir.is_dir() {
        let mut entries: Vec<_> = fs::read_dir(paths.static_dir)
            .with_context(|| format!("Failed to read directory: {}", paths.static_dir.display()))?
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            output.insert(name.to_string(), read_json(&path)?);
            debug!(asset = name, "bundled static asset");
        }
    } else {
        warn!("static directory not found: {}", paths.static_dir.display());
    }

    if paths.schools.exists() {
        output.insert(SCHOOLS_KEY.to_string(), read_json(paths.schools)?);
    } else {
        warn!("classified schools not found: {}", paths.schools.display());
    }

    let bytes = serde_json::to_vec(&serde_json::Value::Object(output))
        .context("Failed to serialize bundle")?;
    let info = BundleInfo::of_bytes(&bytes);

    crate::write_file(paths.output, &bytes)?;
    let info_json = serde_json::to_vec(&info).context("Failed to serialize manifest")?;
    crate::write_file(paths.info, &info_json)?;

    if !keep_schools && paths.schools.exists() {
        fs::remove_file(paths.schools)
            .with_context(|| format!("Failed to remove: {}", paths.schools.display()))?;
    }

    Ok(info)
}

/// Check a bundle against its manifest
pub fn verify_bundle(bundle: &Path, info: &Path) -> Result<bool> {
    let bytes = fs::read(bundle)
        .with_context(|| format!("Failed to read bundle: {}", bundle.display()))?;
    let expected: BundleInfo = serde_json::from_slice(
        &fs::read(info).with_context(|| format!("Failed to read manifest: {}", info.display()))?,
    )
    .context("Failed to parse manifest")?;

    Ok(BundleInfo::of_bytes(&bytes) == expected)
}

fn read_json(path: &Path) -> Result<serde_json::Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse JSON: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> Result<TempDir> {
        let dir = TempDir::new()?;
        fs::create_dir(dir.path().join("static"))?;
        fs::create_dir(dir.path().join("dist"))?;
        fs::write(dir.path().join("static/contests.json"), r#"[{"name":"NOI2024"}]"#)?;
        fs::write(dir.path().join("static/grades.json"), r#"{"initial":16}"#)?;
        fs::write(dir.path().join("static/readme.txt"), "not json")?;
        fs::write(
            dir.path().join("dist/school.json"),
            r#"[{"name":"人大附中","province":"北京","city":"海淀","stages":["初中","高中"]}]"#,
        )?;
        Ok(dir)
    }

    #[test]
    fn test_build_and_verify_bundle() -> Result<()> {
        let dir = setup()?;
        let root = dir.path();
        let static_dir = root.join("static");
        let schools = root.join("dist/school.json");
        let output = root.join("dist/static.json");
        let info_path = root.join("dist/static.info.json");
        let paths = BundlePaths {
            static_dir: &static_dir,
            schools: &schools,
            output: &output,
            info: &info_path,
        };

        let info = build_bundle(&paths, false)?;

        let bundle: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output)?)?;
        assert_eq!(bundle["grades"]["initial"], 16);
        assert_eq!(bundle["contests"][0]["name"], "NOI2024");
        assert_eq!(bundle[SCHOOLS_KEY][0]["name"], "人大附中");
        assert!(bundle.get("readme").is_none());

        assert_eq!(info.size, fs::metadata(&output)?.len());
        assert_eq!(info.sha512.len(), 128);
        assert!(!schools.exists());
        assert!(verify_bundle(&output, &info_path)?);

        let manifest: serde_json::Value = serde_json::from_str(&fs::read_to_string(&info_path)?)?;
        assert_eq!(manifest["size"], info.size);

        Ok(())
    }

    #[test]
    fn test_keep_schools_and_tamper_detection() -> Result<()> {
        let dir = setup()?;
        let root = dir.path();
        let static_dir = root.join("static");
        let schools = root.join("dist/school.json");
        let output = root.join("dist/static.json");
        let info_path = root.join("dist/static.info.json");
        let paths = BundlePaths {
            static_dir: &static_dir,
            schools: &schools,
            output: &output,
            info: &info_path,
        };

        build_bundle(&paths, true)?;
        assert!(schools.exists());

        fs::write(&output, b"{}")?;
        assert!(!verify_bundle(&output, &info_path)?);

        Ok(())
    }

    #[test]
    fn test_sha512_of_empty_input() {
        let info = BundleInfo::of_bytes(b"");
        assert_eq!(info.size, 0);
        assert!(info.sha512.starts_with("cf83e1357eefb8bd"));
    }
}
