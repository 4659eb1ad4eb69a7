use crate::error::{McDumpError, Result};
use crate::extractor::data_url;
use crate::machineconfig::{DeclaredFile, ParsedConfig};
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

pub const DEFAULT_DIR_MODE: u32 = 0o700;
pub const DEFAULT_FILE_MODE: u32 = 0o775;

/// Which declared files to extract, and where to.
#[derive(Debug, Clone, Default)]
pub struct ExtractionRequest {
    pub paths: Vec<String>,
    pub dest_root: Option<PathBuf>,
}

/// How a request will be carried out once validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode<'a> {
    /// Write one file's bytes to the sink.
    Single(&'a str),
    /// Mirror files under a destination root.
    Mirror(&'a Path),
}

impl ExtractionRequest {
    pub fn new<I, S>(paths: I, dest_root: Option<PathBuf>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            dest_root,
        }
    }

    /// Resolves the request into a mode without touching the filesystem.
    pub fn mode(&self) -> Result<ExtractionMode<'_>> {
        let dest_root = self
            .dest_root
            .as_deref()
            .filter(|root| !root.as_os_str().is_empty());

        match (self.paths.as_slice(), dest_root) {
            ([single], _) => Ok(ExtractionMode::Single(single)),
            (_, Some(root)) => Ok(ExtractionMode::Mirror(root)),
            ([], None) => Err(McDumpError::Config {
                message: "no files requested and no destination directory given".to_string(),
            }),
            (paths, None) => Err(McDumpError::MissingDestination {
                requested: paths.len(),
            }),
        }
    }
}

/// What an extraction produced.
#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    /// Contents of `matches` declarations of `path` were written to the sink.
    Emitted { path: String, matches: usize, bytes: u64 },
    /// No declared file has the requested path. Nothing was written.
    NotFound { path: String },
    /// The path is declared but carries no inline contents. Nothing was written.
    NoInlineContent { path: String },
    /// Files were written under a destination root.
    Mirrored(ExtractionProgress),
}

#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub files_written: usize,
    pub files_skipped: usize,
    pub bytes_written: u64,
    pub current_file: Option<PathBuf>,
    pub written: Vec<PathBuf>,
    pub start_time: Instant,
}

impl ExtractionProgress {
    pub fn new() -> Self {
        Self {
            files_written: 0,
            files_skipped: 0,
            bytes_written: 0,
            current_file: None,
            written: Vec::new(),
            start_time: Instant::now(),
        }
    }

    pub fn update_file(&mut self, path: PathBuf, bytes: u64) {
        self.files_written += 1;
        self.bytes_written += bytes;
        self.written.push(path.clone());
        self.current_file = Some(path);
    }

    pub fn skip_file(&mut self) {
        self.files_skipped += 1;
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for ExtractionProgress {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ConfigFileExtractor {
    dir_mode: u32,
    file_mode: u32,
    only_requested: bool,
}

impl ConfigFileExtractor {
    pub fn new() -> Self {
        Self {
            dir_mode: DEFAULT_DIR_MODE,
            file_mode: DEFAULT_FILE_MODE,
            only_requested: false,
        }
    }

    pub fn with_dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Restrict mirror mode to the requested paths instead of every declared file.
    pub fn with_only_requested(mut self, only_requested: bool) -> Self {
        self.only_requested = only_requested;
        self
    }

    /// Extracts files from `config` as described by `request`.
    ///
    /// A single requested path is decoded into `sink`. Otherwise files are
    /// mirrored under the destination root and `progress_callback` is invoked
    /// after each file is written. The first error aborts the extraction;
    /// files already written stay on disk.
    pub fn extract(
        &self,
        config: &ParsedConfig,
        request: &ExtractionRequest,
        sink: &mut dyn Write,
        progress_callback: Option<&dyn Fn(&ExtractionProgress)>,
    ) -> Result<ExtractionOutcome> {
        match request.mode()? {
            ExtractionMode::Single(path) => self.emit_file(config, path, sink),
            ExtractionMode::Mirror(dest_root) => {
                let filter = if self.only_requested && !request.paths.is_empty() {
                    Some(request.paths.as_slice())
                } else {
                    None
                };
                self.mirror_files(config, dest_root, filter, progress_callback)
                    .map(ExtractionOutcome::Mirrored)
            }
        }
    }

    fn emit_file(
        &self,
        config: &ParsedConfig,
        path: &str,
        sink: &mut dyn Write,
    ) -> Result<ExtractionOutcome> {
        let mut declared = 0;
        let mut matches = 0;
        let mut bytes = 0u64;

        for file in config.find(path) {
            declared += 1;
            let Some(source) = file.inline_source() else {
                log::debug!("{} has no inline contents", file.path);
                continue;
            };

            let data = decode_file(file, source)?;
            sink.write_all(&data)?;
            matches += 1;
            bytes += data.len() as u64;
        }

        sink.flush()?;

        let path = path.to_string();
        Ok(match (declared, matches) {
            (0, _) => ExtractionOutcome::NotFound { path },
            (_, 0) => ExtractionOutcome::NoInlineContent { path },
            _ => ExtractionOutcome::Emitted { path, matches, bytes },
        })
    }

    fn mirror_files(
        &self,
        config: &ParsedConfig,
        dest_root: &Path,
        filter: Option<&[String]>,
        progress_callback: Option<&dyn Fn(&ExtractionProgress)>,
    ) -> Result<ExtractionProgress> {
        let mut progress = ExtractionProgress::new();

        for file in &config.files {
            if filter.is_some_and(|paths| !paths.contains(&file.path)) {
                continue;
            }

            let Some(source) = file.inline_source() else {
                log::debug!("skipping {}: no inline contents", file.path);
                progress.skip_file();
                continue;
            };

            let data = decode_file(file, source)?;
            let written = self.write_mirrored(dest_root, &file.path, &data)?;
            progress.update_file(written, data.len() as u64);

            if let Some(callback) = progress_callback {
                callback(&progress);
            }
        }

        Ok(progress)
    }

    /// Writes `data` to the mirror of `declared_path` under `dest_root`,
    /// creating missing parent directories, and returns the path written.
    pub fn write_mirrored(
        &self,
        dest_root: &Path,
        declared_path: &str,
        data: &[u8],
    ) -> Result<PathBuf> {
        let dest_path = mirrored_path(dest_root, declared_path)?;

        if let Some(parent) = dest_path.parent() {
            // A file sitting where a directory belongs fails here, not at the write.
            if !parent.is_dir() {
                self.create_dir(parent)?;
            }
        }

        self.write_file(&dest_path, data)?;
        log::info!("wrote {} ({} bytes)", dest_path.display(), data.len());

        Ok(dest_path)
    }

    fn create_dir(&self, dir: &Path) -> Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.dir_mode);
        }

        builder.create(dir).map_err(|source| McDumpError::CreateDir {
            path: dir.display().to_string(),
            source,
        })
    }

    fn write_file(&self, dest: &Path, data: &[u8]) -> Result<()> {
        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(self.file_mode);
        }

        let to_write_error = |source: std::io::Error| McDumpError::WriteFile {
            path: dest.display().to_string(),
            source,
        };

        let mut file = options.open(dest).map_err(to_write_error)?;
        file.write_all(data).map_err(to_write_error)?;

        Ok(())
    }
}

impl Default for ConfigFileExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_file(file: &DeclaredFile, source: &str) -> Result<Vec<u8>> {
    data_url::decode(source).map_err(|source| McDumpError::Decode {
        path: file.path.clone(),
        source,
    })
}

/// Re-roots an absolute declared path under `dest_root`.
///
/// `..` components are rejected so nothing lands outside the root.
pub fn mirrored_path(dest_root: &Path, declared_path: &str) -> Result<PathBuf> {
    let mut dest = dest_root.to_path_buf();
    let mut has_name = false;

    for component in Path::new(declared_path).components() {
        match component {
            Component::Normal(part) => {
                dest.push(part);
                has_name = true;
            }
            Component::ParentDir => {
                return Err(McDumpError::InvalidPath {
                    path: format!("Directory traversal not allowed: {}", declared_path),
                });
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }

    if !has_name {
        return Err(McDumpError::InvalidPath {
            path: format!("Declared path has no file name: {:?}", declared_path),
        });
    }

    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    fn sample_config() -> ParsedConfig {
        ParsedConfig::new(vec![
            DeclaredFile::with_source("/etc/a.conf", "data:,alpha"),
            DeclaredFile::without_source("/etc/marker"),
            DeclaredFile::with_source("/usr/lib/b.conf", "data:;base64,YmV0YQ=="),
            DeclaredFile::with_source("/opt/remote", "https://example.com/remote"),
        ])
    }

    fn extract(
        config: &ParsedConfig,
        request: &ExtractionRequest,
        sink: &mut Vec<u8>,
    ) -> Result<ExtractionOutcome> {
        ConfigFileExtractor::new().extract(config, request, sink, None)
    }

    #[test]
    fn test_request_modes() {
        let single = ExtractionRequest::new(["/etc/a"], None);
        assert_eq!(single.mode().unwrap(), ExtractionMode::Single("/etc/a"));

        let with_dir = ExtractionRequest::new(["/etc/a"], Some(PathBuf::from("out")));
        assert_eq!(with_dir.mode().unwrap(), ExtractionMode::Single("/etc/a"));

        let many = ExtractionRequest::new(["/a", "/b"], Some(PathBuf::from("out")));
        assert_eq!(many.mode().unwrap(), ExtractionMode::Mirror(Path::new("out")));

        let all = ExtractionRequest::new(Vec::<String>::new(), Some(PathBuf::from("out")));
        assert_eq!(all.mode().unwrap(), ExtractionMode::Mirror(Path::new("out")));

        let none = ExtractionRequest::new(Vec::<String>::new(), None);
        assert!(matches!(none.mode(), Err(McDumpError::Config { .. })));
    }

    #[test]
    fn test_single_file_emits_raw_bytes() {
        let config = ParsedConfig::new(vec![DeclaredFile::with_source(
            "/etc/foo.conf",
            "data:,hello",
        )]);
        let mut out = Vec::new();

        let request = ExtractionRequest::new(["/etc/foo.conf"], None);
        let outcome = extract(&config, &request, &mut out).unwrap();

        assert_eq!(out, b"hello");
        assert!(matches!(outcome, ExtractionOutcome::Emitted { matches: 1, bytes: 5, .. }));
    }

    #[test]
    fn test_single_file_ignores_destination() {
        let dest = TempDir::new().unwrap();
        let mut out = Vec::new();
        let request = ExtractionRequest::new(["/etc/a.conf"], Some(dest.path().to_path_buf()));

        extract(&sample_config(), &request, &mut out).unwrap();

        assert_eq!(out, b"alpha");
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_single_file_no_match() {
        let mut out = Vec::new();
        let request = ExtractionRequest::new(["/etc/nope"], None);
        let outcome = extract(&sample_config(), &request, &mut out).unwrap();

        assert!(out.is_empty());
        assert!(matches!(outcome, ExtractionOutcome::NotFound { ref path } if path == "/etc/nope"));
    }

    #[test]
    fn test_single_file_match_is_exact() {
        let mut out = Vec::new();
        let request = ExtractionRequest::new(["/etc/a.conf/"], None);
        let outcome = extract(&sample_config(), &request, &mut out).unwrap();

        assert!(out.is_empty());
        assert!(matches!(outcome, ExtractionOutcome::NotFound { .. }));
    }

    #[test]
    fn test_single_file_without_contents() {
        let mut out = Vec::new();
        let request = ExtractionRequest::new(["/etc/marker"], None);
        let outcome = extract(&sample_config(), &request, &mut out).unwrap();

        assert!(out.is_empty());
        assert!(matches!(outcome, ExtractionOutcome::NoInlineContent { .. }));

        let request = ExtractionRequest::new(["/opt/remote"], None);
        let outcome = extract(&sample_config(), &request, &mut out).unwrap();
        assert!(out.is_empty());
        assert!(matches!(outcome, ExtractionOutcome::NoInlineContent { .. }));
    }

    #[test]
    fn test_single_file_decode_error() {
        let config =
            ParsedConfig::new(vec![DeclaredFile::with_source("/etc/bad", "not a data url")]);
        let mut out = Vec::new();

        let request = ExtractionRequest::new(["/etc/bad"], None);
        let err = extract(&config, &request, &mut out).unwrap_err();
        assert!(matches!(err, McDumpError::Decode { ref path, .. } if path == "/etc/bad"));
    }

    #[test]
    fn test_multiple_files_require_destination() {
        let dest = TempDir::new().unwrap();
        let config = ParsedConfig::new(vec![DeclaredFile::with_source("/etc/bad", "garbage")]);
        let mut out = Vec::new();

        for dest_root in [None, Some(PathBuf::new())] {
            let request = ExtractionRequest::new(["/etc/bad", "/etc/other"], dest_root);
            let err = extract(&config, &request, &mut out).unwrap_err();
            // Fails before the malformed contents are even looked at.
            assert!(matches!(err, McDumpError::MissingDestination { requested: 2 }));
        }

        assert!(out.is_empty());
        assert_eq!(fs::read_dir(dest.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_mirror_creates_directory_tree() {
        let dest = TempDir::new().unwrap();
        let out_root = dest.path().join("out");
        let request =
            ExtractionRequest::new(["/etc/a.conf", "/usr/lib/b.conf"], Some(out_root.clone()));
        let mut out = Vec::new();

        let outcome = extract(&sample_config(), &request, &mut out).unwrap();

        assert_eq!(fs::read(out_root.join("etc/a.conf")).unwrap(), b"alpha");
        assert_eq!(fs::read(out_root.join("usr/lib/b.conf")).unwrap(), b"beta");
        assert!(!out_root.join("etc/marker").exists());
        assert!(!out_root.join("opt").exists());
        assert!(out.is_empty());

        let ExtractionOutcome::Mirrored(progress) = outcome else {
            panic!("expected mirrored outcome");
        };
        assert_eq!(progress.files_written, 2);
        assert_eq!(progress.files_skipped, 2);
        assert_eq!(progress.bytes_written, 9);
        assert_eq!(
            progress.written,
            vec![out_root.join("etc/a.conf"), out_root.join("usr/lib/b.conf")]
        );
    }

    #[test]
    fn test_mirror_writes_every_declared_file() {
        let dest = TempDir::new().unwrap();
        let request = ExtractionRequest::new(
            ["/etc/a.conf", "/etc/unrelated"],
            Some(dest.path().to_path_buf()),
        );

        extract(&sample_config(), &request, &mut Vec::new()).unwrap();

        assert!(dest.path().join("etc/a.conf").exists());
        assert!(dest.path().join("usr/lib/b.conf").exists());
    }

    #[test]
    fn test_mirror_only_requested() {
        let dest = TempDir::new().unwrap();
        let request = ExtractionRequest::new(
            ["/etc/a.conf", "/etc/unrelated"],
            Some(dest.path().to_path_buf()),
        );

        ConfigFileExtractor::new()
            .with_only_requested(true)
            .extract(&sample_config(), &request, &mut Vec::new(), None)
            .unwrap();

        assert!(dest.path().join("etc/a.conf").exists());
        assert!(!dest.path().join("usr").exists());
    }

    #[test]
    fn test_mirror_overwrites_existing_files() {
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(dest.path().join("etc")).unwrap();
        fs::write(dest.path().join("etc/a.conf"), "stale contents that are longer").unwrap();

        let request = ExtractionRequest::new(Vec::<String>::new(), Some(dest.path().to_path_buf()));
        extract(&sample_config(), &request, &mut Vec::new()).unwrap();

        assert_eq!(fs::read(dest.path().join("etc/a.conf")).unwrap(), b"alpha");
    }

    #[test]
    fn test_decode_failure_aborts_without_rollback() {
        let dest = TempDir::new().unwrap();
        let config = ParsedConfig::new(vec![
            DeclaredFile::with_source("/etc/first", "data:,1"),
            DeclaredFile::with_source("/etc/broken", "data:;base64,%%%"),
            DeclaredFile::with_source("/etc/third", "data:,3"),
        ]);
        let request =
            ExtractionRequest::new(["/etc/first", "/etc/third"], Some(dest.path().to_path_buf()));

        let err = extract(&config, &request, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, McDumpError::Decode { ref path, .. } if path == "/etc/broken"));
        assert_eq!(fs::read(dest.path().join("etc/first")).unwrap(), b"1");
        assert!(!dest.path().join("etc/broken").exists());
        assert!(!dest.path().join("etc/third").exists());
    }

    #[test]
    fn test_file_in_place_of_directory_fails_create_dir() {
        let dest = TempDir::new().unwrap();
        let config = ParsedConfig::new(vec![
            DeclaredFile::with_source("/etc/a", "data:,file"),
            DeclaredFile::with_source("/etc/a/b", "data:,nested"),
        ]);
        let request = ExtractionRequest::new(Vec::<String>::new(), Some(dest.path().to_path_buf()));

        let err = extract(&config, &request, &mut Vec::new()).unwrap_err();

        let expected = dest.path().join("etc").join("a").display().to_string();
        assert!(matches!(err, McDumpError::CreateDir { ref path, .. } if *path == expected));
        assert_eq!(fs::read(dest.path().join("etc/a")).unwrap(), b"file");
    }

    #[test]
    fn test_directory_in_place_of_file_fails_write() {
        let dest = TempDir::new().unwrap();
        fs::create_dir_all(dest.path().join("etc/b")).unwrap();
        let config = ParsedConfig::new(vec![
            DeclaredFile::with_source("/etc/first", "data:,1"),
            DeclaredFile::with_source("/etc/b", "data:,2"),
            DeclaredFile::with_source("/etc/last", "data:,3"),
        ]);
        let request = ExtractionRequest::new(Vec::<String>::new(), Some(dest.path().to_path_buf()));

        let err = extract(&config, &request, &mut Vec::new()).unwrap_err();

        assert!(matches!(err, McDumpError::WriteFile { .. }));
        assert_eq!(fs::read(dest.path().join("etc/first")).unwrap(), b"1");
        assert!(dest.path().join("etc/b").is_dir());
        assert!(!dest.path().join("etc/last").exists());
    }

    #[test]
    fn test_progress_callback_per_file() {
        let dest = TempDir::new().unwrap();
        let seen = RefCell::new(Vec::new());
        let callback = |progress: &ExtractionProgress| {
            seen.borrow_mut().push(progress.current_file.clone().unwrap());
        };
        let request = ExtractionRequest::new(Vec::<String>::new(), Some(dest.path().to_path_buf()));

        ConfigFileExtractor::new()
            .extract(&sample_config(), &request, &mut Vec::new(), Some(&callback))
            .unwrap();

        assert_eq!(
            seen.into_inner(),
            vec![dest.path().join("etc/a.conf"), dest.path().join("usr/lib/b.conf")]
        );
    }

    #[test]
    fn test_traversal_rejected() {
        let dest = TempDir::new().unwrap();
        let config = ParsedConfig::new(vec![DeclaredFile::with_source("/../escape", "data:,x")]);
        let request = ExtractionRequest::new(Vec::<String>::new(), Some(dest.path().join("out")));

        let err = extract(&config, &request, &mut Vec::new()).unwrap_err();
        assert!(matches!(err, McDumpError::InvalidPath { .. }));
        assert!(!dest.path().join("escape").exists());
    }

    #[test]
    fn test_mirrored_path() {
        let root = Path::new("out");
        assert_eq!(mirrored_path(root, "/etc/a.conf").unwrap(), root.join("etc").join("a.conf"));
        assert_eq!(mirrored_path(root, "etc/./a").unwrap(), root.join("etc").join("a"));
        assert!(mirrored_path(root, "/").is_err());
        assert!(mirrored_path(root, "/etc/../a").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_configured_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dest = TempDir::new().unwrap();
        let extractor = ConfigFileExtractor::new().with_dir_mode(0o700).with_file_mode(0o600);

        let written = extractor.write_mirrored(dest.path(), "/etc/secret", b"s").unwrap();

        let file_mode = fs::metadata(&written).unwrap().permissions().mode() & 0o777;
        let dir_meta = fs::metadata(dest.path().join("etc")).unwrap();
        let dir_mode = dir_meta.permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        assert_eq!(dir_mode, 0o700);
    }

    #[test]
    fn test_progress_tracking() {
        let mut progress = ExtractionProgress::new();
        progress.update_file(PathBuf::from("out/a"), 10);
        progress.skip_file();

        assert_eq!(progress.files_written, 1);
        assert_eq!(progress.files_skipped, 1);
        assert_eq!(progress.bytes_written, 10);
        assert_eq!(progress.current_file, Some(PathBuf::from("out/a")));
    }
}
