use crate::digest_path::ColonPolicy;
use crate::error::{McDumpError, Result};
use crate::extractor::file_extractor::{DEFAULT_DIR_MODE, DEFAULT_FILE_MODE};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_MODE: u32 = 0o7777;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,
    #[serde(default)]
    pub paths: PathConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Mode for directories created while mirroring.
    pub dir_mode: u32,
    /// Mode for files written while mirroring.
    pub file_mode: u32,
    /// Mirror only the requested paths rather than every declared file.
    pub only_requested: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PathConfig {
    pub colon_policy: ColonPolicy,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
            only_requested: false,
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(McDumpError::Config {
                message: format!("Settings file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| McDumpError::Config {
                message: format!("Failed to read settings file {}: {}", path.display(), e),
            })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| McDumpError::Config {
                message: format!("Failed to parse settings file {}: {}", path.display(), e),
            })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["mcdump.toml", ".mcdump.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        log::debug!("using settings from {}", default_path);
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(dir_mode) = cli_args.dir_mode {
            self.extract.dir_mode = dir_mode;
        }

        if let Some(file_mode) = cli_args.file_mode {
            self.extract.file_mode = file_mode;
        }

        if cli_args.only_requested {
            self.extract.only_requested = true;
        }

        if let Some(policy) = cli_args.colon_policy {
            self.paths.colon_policy = policy;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.extract.dir_mode > MAX_MODE {
            return Err(McDumpError::Config {
                message: format!(
                    "dir_mode {:o} is not a valid permission mode",
                    self.extract.dir_mode
                ),
            });
        }

        if self.extract.file_mode > MAX_MODE {
            return Err(McDumpError::Config {
                message: format!(
                    "file_mode {:o} is not a valid permission mode",
                    self.extract.file_mode
                ),
            });
        }

        // Directories we cannot enter would make every nested write fail.
        if self.extract.dir_mode & 0o100 == 0 {
            return Err(McDumpError::Config {
                message: format!(
                    "dir_mode {:o} must be searchable by the owner",
                    self.extract.dir_mode
                ),
            });
        }

        Ok(())
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub dir_mode: Option<u32>,
    pub file_mode: Option<u32>,
    pub only_requested: bool,
    pub colon_policy: Option<ColonPolicy>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dir_mode(mut self, mode: Option<u32>) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn with_file_mode(mut self, mode: Option<u32>) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn with_only_requested(mut self, only_requested: bool) -> Self {
        self.only_requested = only_requested;
        self
    }

    pub fn with_colon_policy(mut self, policy: Option<ColonPolicy>) -> Self {
        self.colon_policy = policy;
        self
    }
}

/// Parses an octal permission mode such as `755` or `0o755`.
pub fn parse_mode(s: &str) -> std::result::Result<u32, String> {
    let digits = s.trim();
    let digits = digits
        .strip_prefix("0o")
        .or_else(|| digits.strip_prefix("0O"))
        .unwrap_or(digits);

    let mode = u32::from_str_radix(digits, 8)
        .map_err(|_| format!("Invalid octal mode: {}", s))?;

    if mode > MAX_MODE {
        return Err(format!("Mode out of range: {}", s));
    }

    Ok(mode)
}
