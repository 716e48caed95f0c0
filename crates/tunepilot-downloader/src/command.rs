//! Downloader command construction.
//!
//! Each provider is served by its own external CLI tool. The registry
//! maps a provider to the binary and argument shape that tool expects;
//! binaries can be overridden for deployments that install them under
//! different names.

use std::collections::HashMap;
use std::path::Path;

use which::which;

use tunepilot_models::Provider;

use crate::error::{DownloadError, Result};

/// How the destination directory is passed to a tool.
#[derive(Debug, Clone)]
enum OutputStyle {
    /// `<flag> <dir>` before the URL.
    Flag(&'static str),
    /// Apple's split ALAC/Atmos layout: two flags, two subdirectories.
    AppleSplit,
    /// The tool reads its destination from its own configuration.
    OwnConfig,
}

/// Command shape for one provider's downloader.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    binary: String,
    /// Arguments placed before the output/url part (subcommands etc.).
    leading_args: Vec<String>,
    output: OutputStyle,
}

impl CommandSpec {
    /// Resolves the binary on `PATH`, then renders the full argument
    /// vector for a download into `dest_dir`.
    pub fn build(&self, url: &str, dest_dir: &Path) -> Result<(std::path::PathBuf, Vec<String>)> {
        let binary = which(&self.binary)
            .map_err(|_| DownloadError::BinaryNotFound(self.binary.clone()))?;

        let mut args = self.leading_args.clone();
        match &self.output {
            OutputStyle::Flag(flag) => {
                args.push(flag.to_string());
                args.push(dest_dir.display().to_string());
            }
            OutputStyle::AppleSplit => {
                args.push("--alac-save-folder".to_string());
                args.push(dest_dir.join("alac").display().to_string());
                args.push("--atmos-save-folder".to_string());
                args.push(dest_dir.join("atmos").display().to_string());
            }
            OutputStyle::OwnConfig => {}
        }
        args.push(url.to_string());

        Ok((binary, args))
    }

    /// Name of the binary this spec invokes.
    pub fn binary_name(&self) -> &str {
        &self.binary
    }
}

/// Maps providers to their downloader tools.
pub struct DownloaderRegistry {
    specs: HashMap<Provider, CommandSpec>,
}

impl Default for DownloaderRegistry {
    fn default() -> Self {
        let mut specs = HashMap::new();
        specs.insert(
            Provider::Tidal,
            CommandSpec {
                binary: "tidal-dl-ng".to_string(),
                leading_args: vec!["dl".to_string()],
                output: OutputStyle::OwnConfig,
            },
        );
        specs.insert(
            Provider::Apple,
            CommandSpec {
                binary: "apple-music-downloader".to_string(),
                leading_args: Vec::new(),
                output: OutputStyle::AppleSplit,
            },
        );
        specs.insert(
            Provider::Deezer,
            CommandSpec {
                binary: "orpheus".to_string(),
                leading_args: Vec::new(),
                output: OutputStyle::Flag("-o"),
            },
        );
        specs.insert(
            Provider::Qobuz,
            CommandSpec {
                binary: "rip".to_string(),
                leading_args: vec!["url".to_string()],
                output: OutputStyle::Flag("--folder"),
            },
        );
        Self { specs }
    }
}

impl DownloaderRegistry {
    /// Creates the registry with stock tool mappings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the binary name used for a provider.
    pub fn with_binary(mut self, provider: Provider, binary: impl Into<String>) -> Self {
        if let Some(spec) = self.specs.get_mut(&provider) {
            spec.binary = binary.into();
        }
        self
    }

    /// The command spec for a provider.
    pub fn spec(&self, provider: Provider) -> &CommandSpec {
        // Every provider variant is seeded in the constructor.
        &self.specs[&provider]
    }
}
