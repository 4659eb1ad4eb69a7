//! Mapping content addresses (`sha256:abcd...`) onto filesystem paths.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

/// What the filesystem receiving a digest path allows in a path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetFilesystem {
    forbids_colon: bool,
}

impl TargetFilesystem {
    /// The filesystem of the platform this binary was built for, resolved once.
    pub fn host() -> Self {
        static HOST: OnceLock<TargetFilesystem> = OnceLock::new();
        *HOST.get_or_init(|| Self {
            forbids_colon: cfg!(windows),
        })
    }

    /// A filesystem that accepts `:` in path segments.
    pub fn permissive() -> Self {
        Self { forbids_colon: false }
    }

    /// A filesystem that reserves `:` (drive letters, alternate streams).
    pub fn restrictive() -> Self {
        Self { forbids_colon: true }
    }

    pub fn forbids_colon(&self) -> bool {
        self.forbids_colon
    }
}

impl Default for TargetFilesystem {
    fn default() -> Self {
        Self::host()
    }
}

/// How to decide whether `:` must be replaced, as chosen in settings or on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ColonPolicy {
    /// Follow the host platform.
    #[default]
    Auto,
    /// Always keep `:`.
    Allow,
    /// Always replace `:` with `-`.
    Forbid,
}

impl ColonPolicy {
    pub fn target(self) -> TargetFilesystem {
        match self {
            ColonPolicy::Auto => TargetFilesystem::host(),
            ColonPolicy::Allow => TargetFilesystem::permissive(),
            ColonPolicy::Forbid => TargetFilesystem::restrictive(),
        }
    }
}

/// Replaces `:` with `-` when the target does not allow it.
pub fn sanitize_address(address: &str, target: TargetFilesystem) -> String {
    if target.forbids_colon() {
        address.replace(':', "-")
    } else {
        address.to_string()
    }
}

/// Joins `root`, `namespace` and the sanitized `address`.
///
/// Every segment stays below the previous one: a leading `/` on `namespace`
/// or `address` is dropped rather than restarting the path, and empty
/// segments add nothing.
pub fn build_digest_path<P: AsRef<Path>>(
    address: &str,
    root: P,
    namespace: &str,
    target: TargetFilesystem,
) -> PathBuf {
    let mut path = root.as_ref().to_path_buf();
    push_relative(&mut path, namespace);
    push_relative(&mut path, &sanitize_address(address, target));
    path
}

fn push_relative(path: &mut PathBuf, segment: &str) {
    for component in Path::new(segment).components() {
        match component {
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
            other => path.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permissive_target_keeps_address() {
        let target = TargetFilesystem::permissive();
        let path = build_digest_path("sha256:123456", "mnt", "mirror", target);
        assert_eq!(path, Path::new("mnt").join("mirror").join("sha256:123456"));
    }

    #[test]
    fn test_absolute_segments_stay_under_root() {
        let target = TargetFilesystem::permissive();
        let mnt = Path::new("mnt");

        assert_eq!(
            build_digest_path("sha256:1", "mnt", "/mirror", target),
            mnt.join("mirror").join("sha256:1")
        );
        assert_eq!(
            build_digest_path("/etc/passwd", "mnt", "mirror", target),
            mnt.join("mirror").join("etc").join("passwd")
        );
        assert_eq!(
            build_digest_path("sha256:1", "/abs/root", "/", target),
            Path::new("/abs/root").join("sha256:1")
        );
    }

    #[test]
    fn test_empty_segments() {
        let target = TargetFilesystem::permissive();

        assert_eq!(
            build_digest_path("sha256:1", "mnt", "", target),
            Path::new("mnt").join("sha256:1")
        );
        assert_eq!(
            build_digest_path("", "mnt", "mirror", target),
            Path::new("mnt").join("mirror")
        );
        assert_eq!(
            build_digest_path("sha256:1", "", "mirror", target),
            Path::new("mirror").join("sha256:1")
        );
    }

    #[test]
    fn test_restrictive_target_replaces_every_colon() {
        let target = TargetFilesystem::restrictive();
        let path = build_digest_path("sha256:123456", "mnt", "mirror", target);
        assert_eq!(path, Path::new("mnt").join("mirror").join("sha256-123456"));

        assert_eq!(sanitize_address("a:b:c", TargetFilesystem::restrictive()), "a-b-c");
        assert_eq!(sanitize_address("plain", TargetFilesystem::restrictive()), "plain");
    }

    #[test]
    fn test_host_target() {
        let path = build_digest_path("sha256:123456", "mnt", "mirror", TargetFilesystem::host());
        let expected = if cfg!(windows) { "sha256-123456" } else { "sha256:123456" };
        assert_eq!(path, Path::new("mnt").join("mirror").join(expected));
        assert_eq!(TargetFilesystem::host(), TargetFilesystem::default());
    }

    #[test]
    fn test_colon_policy() {
        assert!(ColonPolicy::Forbid.target().forbids_colon());
        assert!(!ColonPolicy::Allow.target().forbids_colon());
        assert_eq!(ColonPolicy::Auto.target(), TargetFilesystem::host());
        assert_eq!(ColonPolicy::default(), ColonPolicy::Auto);
    }
}
