use crate::error::{McDumpError, Result};
use crate::machineconfig::model::{DeclaredFile, ParsedConfig};
use serde::Deserialize;
use serde_json::Value;

const SUPPORTED_MAJOR_VERSIONS: &[u64] = &[2, 3];

/// Turns raw config bytes into a file list.
pub trait ConfigParser {
    fn parse(&self, raw: &[u8]) -> Result<ParsedConfig>;
}

/// Parses Ignition JSON, bare or wrapped in a MachineConfig object.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnitionParser;

#[derive(Debug, Deserialize)]
struct IgnitionConfig {
    ignition: Option<IgnitionMeta>,
    #[serde(default)]
    storage: Storage,
}

#[derive(Debug, Deserialize)]
struct IgnitionMeta {
    version: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Storage {
    #[serde(default)]
    files: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct FileEntry {
    path: String,
    #[serde(default)]
    contents: Option<Contents>,
}

#[derive(Debug, Default, Deserialize)]
struct Contents {
    source: Option<String>,
}

impl IgnitionParser {
    pub fn new() -> Self {
        Self
    }
}

impl ConfigParser for IgnitionParser {
    fn parse(&self, raw: &[u8]) -> Result<ParsedConfig> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            log::debug!("empty config, no files declared");
            return Ok(ParsedConfig::default());
        }

        let document: Value = serde_json::from_slice(raw)?;
        let ignition = unwrap_machine_config(document)?;

        // A MachineConfig with no spec.config is valid and declares nothing.
        if ignition.is_null() {
            return Ok(ParsedConfig::default());
        }

        let config: IgnitionConfig = serde_json::from_value(ignition)?;

        let version = config
            .ignition
            .and_then(|meta| meta.version)
            .ok_or_else(|| McDumpError::Parse {
                message: "missing ignition.version".to_string(),
            })?;
        check_version(&version)?;

        let files: Vec<DeclaredFile> = config
            .storage
            .files
            .into_iter()
            .map(|entry| DeclaredFile::new(entry.path, entry.contents.and_then(|c| c.source)))
            .collect();

        log::debug!("parsed ignition {} config with {} files", version, files.len());

        Ok(ParsedConfig::new(files).with_version(version))
    }
}

/// Extracts `spec.config` from a MachineConfig, or returns the document as-is.
fn unwrap_machine_config(document: Value) -> Result<Value> {
    let Value::Object(mut map) = document else {
        return Err(McDumpError::Parse {
            message: "expected a JSON object".to_string(),
        });
    };

    let is_machine_config = map.get("kind").and_then(Value::as_str) == Some("MachineConfig")
        || (map.contains_key("spec") && !map.contains_key("ignition"));

    if !is_machine_config {
        return Ok(Value::Object(map));
    }

    let config = map
        .remove("spec")
        .and_then(|mut spec| spec.get_mut("config").map(Value::take))
        .unwrap_or(Value::Null);

    Ok(config)
}

fn check_version(version: &str) -> Result<()> {
    let major = version
        .split('.')
        .next()
        .and_then(|m| m.parse::<u64>().ok())
        .ok_or_else(|| McDumpError::Parse {
            message: format!("invalid ignition version: {}", version),
        })?;

    if !SUPPORTED_MAJOR_VERSIONS.contains(&major) {
        return Err(McDumpError::Parse {
            message: format!("unsupported ignition version: {}", version),
        });
    }

    Ok(())
}
