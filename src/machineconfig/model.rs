use serde::{Deserialize, Serialize};
use url::Url;

/// URL schemes Ignition fetches at provisioning time rather than embedding.
const REMOTE_SCHEMES: &[&str] = &["http", "https", "tftp", "s3", "gs", "arn"];

/// A file declared in a config's `storage.files` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredFile {
    /// Absolute path the file occupies once the config is applied.
    pub path: String,
    /// Content source URL, if any.
    pub source: Option<String>,
}

impl DeclaredFile {
    pub fn new<P: Into<String>>(path: P, source: Option<String>) -> Self {
        Self {
            path: path.into(),
            source,
        }
    }

    pub fn with_source<P: Into<String>, S: Into<String>>(path: P, source: S) -> Self {
        Self::new(path, Some(source.into()))
    }

    pub fn without_source<P: Into<String>>(path: P) -> Self {
        Self::new(path, None)
    }

    /// The source to decode, or `None` when the file carries no embedded payload.
    ///
    /// Sources pointing at a remote location are fetched by Ignition itself and
    /// count as absent here. Everything else is expected to be a `data:` URL.
    pub fn inline_source(&self) -> Option<&str> {
        let source = self.source.as_deref()?;
        if is_remote_source(source) {
            None
        } else {
            Some(source)
        }
    }
}

fn is_remote_source(source: &str) -> bool {
    Url::parse(source)
        .map(|url| REMOTE_SCHEMES.contains(&url.scheme()))
        .unwrap_or(false)
}

/// The file list of a parsed config, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedConfig {
    /// Ignition spec version the config declared, if it was not empty.
    pub version: Option<String>,
    pub files: Vec<DeclaredFile>,
}

impl ParsedConfig {
    pub fn new(files: Vec<DeclaredFile>) -> Self {
        Self {
            version: None,
            files,
        }
    }

    pub fn with_version<S: Into<String>>(mut self, version: S) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Every declared path, in order.
    pub fn list_paths(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.path.as_str()).collect()
    }

    pub fn find<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a DeclaredFile> + 'a {
        self.files.iter().filter(move |f| f.path == path)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
