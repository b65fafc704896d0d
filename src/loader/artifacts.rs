//! Locates and loads forge build artifacts.
//!
//! `forge build --ast` writes one directory per source file under `out/`
//! (`out/Vault.sol/Vault.json`, …); each artifact carries the file's AST
//! under the `ast` key. Sources live under `src/`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::AnalyzerError;

/// One AST document paired with the source text it was compiled from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Path of the artifact the AST came from.
    pub artifact_path: PathBuf,
    /// The `ast` object of the artifact.
    pub ast: Value,
    /// Raw source text, empty when the source file could not be located.
    pub source_text: String,
    /// Source file stem (`Vault` for `Vault.sol`).
    pub stem: String,
}

/// Map source file stems to their `src/*.sol` paths.
pub fn find_source_files(project_root: &Path) -> BTreeMap<String, PathBuf> {
    let mut sources = BTreeMap::new();
    let src_dir = project_root.join("src");
    let Ok(entries) = fs::read_dir(&src_dir) else {
        return sources;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("sol") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                sources.insert(stem.to_string(), path.clone());
            }
        }
    }
    sources
}

/// Every `out/<stem>.sol/*.json` artifact whose stem has a known source file.
pub fn find_ast_files(project_root: &Path, stems: &BTreeMap<String, PathBuf>) -> Vec<PathBuf> {
    let mut artifacts = Vec::new();
    let out_dir = project_root.join("out");
    let Ok(entries) = fs::read_dir(&out_dir) else {
        return artifacts;
    };
    for entry in entries.flatten() {
        let dir = entry.path();
        if !dir.is_dir() {
            continue;
        }
        let Some(name) = dir.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some(stem) = name.strip_suffix(".sol") else {
            continue;
        };
        if !stems.contains_key(stem) {
            continue;
        }
        if let Ok(jsons) = fs::read_dir(&dir) {
            for json in jsons.flatten() {
                let path = json.path();
                if path.extension().and_then(|e| e.to_str()) == Some("json") {
                    artifacts.push(path);
                }
            }
        }
    }
    artifacts.sort();
    artifacts
}

/// Load one artifact and pair it with its source text.
pub fn load_document(
    artifact_path: &Path,
    sources: &BTreeMap<String, PathBuf>,
) -> Result<LoadedDocument, AnalyzerError> {
    let raw = fs::read_to_string(artifact_path).map_err(|e| AnalyzerError::Io {
        path: artifact_path.to_path_buf(),
        source: e,
    })?;
    let document: Value = serde_json::from_str(&raw).map_err(|e| AnalyzerError::JsonParse {
        path: artifact_path.to_path_buf(),
        source: e,
    })?;

    let ast = document
        .get("ast")
        .cloned()
        .ok_or_else(|| AnalyzerError::InputMalformed {
            subject: artifact_path.display().to_string(),
            reason: "artifact has no `ast` object".into(),
        })?;

    // The artifact lives in out/<File>.sol/<Contract>.json; the stem of the
    // enclosing directory names the source file.
    let stem = artifact_path
        .parent()
        .and_then(|d| d.file_name())
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(".sol"))
        .unwrap_or_default()
        .to_string();

    let source_text = sources
        .get(&stem)
        .and_then(|p| fs::read_to_string(p).ok())
        .unwrap_or_default();

    Ok(LoadedDocument {
        artifact_path: artifact_path.to_path_buf(),
        ast,
        source_text,
        stem,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(dir: &Path) {
        fs::create_dir_all(dir.join("src")).unwrap();
        fs::create_dir_all(dir.join("out/Vault.sol")).unwrap();
        fs::write(dir.join("src/Vault.sol"), "contract Vault {}\n").unwrap();
        fs::write(
            dir.join("out/Vault.sol/Vault.json"),
            r#"{"ast": {"nodes": []}}"#,
        )
        .unwrap();
        // An artifact without a matching source is ignored.
        fs::create_dir_all(dir.join("out/Stray.sol")).unwrap();
        fs::write(dir.join("out/Stray.sol/Stray.json"), r#"{"ast": {}}"#).unwrap();
    }

    #[test]
    fn discovers_sources_and_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        project(tmp.path());

        let sources = find_source_files(tmp.path());
        assert_eq!(sources.len(), 1);
        assert!(sources.contains_key("Vault"));

        let artifacts = find_ast_files(tmp.path(), &sources);
        assert_eq!(artifacts.len(), 1);

        let doc = load_document(&artifacts[0], &sources).unwrap();
        assert_eq!(doc.stem, "Vault");
        assert!(doc.source_text.starts_with("contract Vault"));
    }

    #[test]
    fn missing_ast_key_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        fs::write(&path, r#"{"abi": []}"#).unwrap();
        let err = load_document(&path, &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, AnalyzerError::InputMalformed { .. }));
    }
}
