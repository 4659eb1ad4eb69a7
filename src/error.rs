use crate::extractor::DataUrlError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum McDumpError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{requested} files requested but no destination directory given")]
    MissingDestination { requested: usize },

    #[error("Failed to parse machine config: {message}")]
    Parse { message: String },

    #[error("Failed to decode contents of {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: DataUrlError,
    },

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file {path}: {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for McDumpError {
    fn user_message(&self) -> String {
        match self {
            McDumpError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            McDumpError::MissingDestination { requested } => {
                format!(
                    "Refusing to write {} files to one output stream",
                    requested
                )
            }
            McDumpError::Parse { message } => {
                format!("Could not parse machine config: {}", message)
            }
            McDumpError::Decode { path, source } => {
                format!("Contents of {} are not a valid data URL: {}", path, source)
            }
            McDumpError::CreateDir { path, source } => {
                format!("Could not create directory {}: {}", path, source)
            }
            McDumpError::WriteFile { path, source } => {
                format!("Could not write {}: {}", path, source)
            }
            McDumpError::InvalidPath { path } => {
                format!("Invalid file path: {}", path)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        let hint = match self {
            McDumpError::Config { .. } => {
                "Check your settings file syntax and the command line arguments."
            }
            McDumpError::MissingDestination { .. } => {
                "Pass --to-dir <DIR> to write every file under a directory, \
                 or request a single file."
            }
            McDumpError::Parse { .. } => {
                "The input must be a MachineConfig or an Ignition config \
                 (spec 2.x or 3.x) in JSON form."
            }
            McDumpError::CreateDir { .. } | McDumpError::WriteFile { .. } => {
                "Ensure you have write permissions and free space in the target directory."
            }
            McDumpError::InvalidPath { .. } => {
                "Declared paths must stay inside the destination directory."
            }
            _ => return None,
        };

        Some(hint.to_string())
    }
}

impl From<toml::de::Error> for McDumpError {
    fn from(error: toml::de::Error) -> Self {
        McDumpError::Config {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for McDumpError {
    fn from(error: serde_json::Error) -> Self {
        McDumpError::Parse {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, McDumpError>;
