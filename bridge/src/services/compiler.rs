//! Companion executable builder
//!
//! Compiles every C++ source found in the companions directory into one
//! standalone executable. Toolchain detection tries the common compiler
//! locations per platform; a missing toolchain or empty directory is a
//! setup failure the bridge reports and survives.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};

use crate::error::{BridgeError, BridgeResult};
use crate::traits::ExecutableBuilder;

#[cfg(windows)]
const OUTPUT_NAME: &str = "companion.exe";
#[cfg(not(windows))]
const OUTPUT_NAME: &str = "companion";

#[cfg(windows)]
const COMPILER_CANDIDATES: &[&str] = &[
    "g++",
    "C:\\msys64\\mingw64\\bin\\g++.exe",
    "C:\\msys64\\ucrt64\\bin\\g++.exe",
    "C:\\TDM-GCC-64\\bin\\g++.exe",
];
#[cfg(not(windows))]
const COMPILER_CANDIDATES: &[&str] = &["g++", "c++"];

/// Real builder that shells out to a C++ toolchain.
pub struct RealExecutableBuilder {
    sources_dir: PathBuf,
}

impl RealExecutableBuilder {
    pub fn new(sources_dir: impl Into<PathBuf>) -> Self {
        Self {
            sources_dir: sources_dir.into(),
        }
    }

    pub fn sources_dir(&self) -> &Path {
        &self.sources_dir
    }

    fn find_sources(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.sources_dir) else {
            return Vec::new();
        };
        let mut sources: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().map(|ext| ext == "cpp").unwrap_or(false)
            })
            .collect();
        sources.sort();
        sources
    }

    fn detect_compiler() -> Option<&'static str> {
        COMPILER_CANDIDATES.iter().copied().find(|candidate| {
            Command::new(candidate)
                .arg("--version")
                .output()
                .map(|output| output.status.success())
                .unwrap_or(false)
        })
    }
}

impl ExecutableBuilder for RealExecutableBuilder {
    fn build(&self) -> BridgeResult<PathBuf> {
        if !self.sources_dir.exists() {
            if let Err(e) = std::fs::create_dir_all(&self.sources_dir) {
                warn!(
                    "Failed to create companions directory {}: {e}",
                    self.sources_dir.display()
                );
            }
        }

        let sources = self.find_sources();
        if sources.is_empty() {
            return Err(BridgeError::NoSources {
                path: self.sources_dir.display().to_string(),
            });
        }

        let compiler = Self::detect_compiler().ok_or(BridgeError::ToolchainMissing)?;
        debug!("Using compiler: {compiler}");

        let output_path = self.sources_dir.join(OUTPUT_NAME);
        let mut command = Command::new(compiler);
        command.arg("-std=c++17");
        #[cfg(not(windows))]
        command.arg("-pthread");
        command.arg("-o").arg(&output_path);
        command.args(&sources);

        let output = command.output()?;
        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(BridgeError::CompilationFailed { output: combined });
        }
        if !output_path.exists() {
            return Err(BridgeError::CompilationFailed {
                output: "compilation succeeded but output file not found".to_string(),
            });
        }

        info!(
            "Compiled {} companion source(s) into {}",
            sources.len(),
            output_path.display()
        );
        Ok(output_path)
    }

    fn source_count(&self) -> usize {
        self.find_sources().len()
    }
}
