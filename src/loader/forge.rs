//! Thin driver around the Foundry toolchain. Runs before the core pipeline;
//! the analyzer itself never shells out.

use std::path::Path;
use std::process::Command;

use crate::error::AnalyzerError;

fn run_forge(args: &[&str], project_root: &Path) -> Result<(), AnalyzerError> {
    let output = Command::new("forge")
        .args(args)
        .current_dir(project_root)
        .output()
        .map_err(|e| AnalyzerError::Forge(format!("could not spawn forge {}: {e}", args.join(" "))))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AnalyzerError::Forge(format!(
            "forge {} exited with {}: {}",
            args.join(" "),
            output.status,
            stderr.trim()
        )));
    }
    Ok(())
}

/// `forge clean` — drop stale build artifacts.
pub fn clean_project(project_root: &Path) -> Result<(), AnalyzerError> {
    run_forge(&["clean"], project_root)
}

/// `forge build --ast` — produce AST-carrying artifacts under `out/`.
pub fn build_ast(project_root: &Path) -> Result<(), AnalyzerError> {
    run_forge(&["build", "--ast"], project_root)
}
