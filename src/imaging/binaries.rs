//! Detection of the optional `cwebp` / `cavif` executables.
//!
//! Binaries live in a fixed directory (`<app root>/vendor/bin`). Each tool is
//! checked at most once per [`BinaryProbe`]: the answer is remembered for the
//! lifetime of the probe, so installing a binary needs a process restart.
//! Absence is an expected state and only ever shows up as `false`/`None`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Directory, relative to the application root, that holds the binaries.
pub const BIN_DIR: &str = "vendor/bin";

/// External conversion tools the pipeline knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryTool {
    Cwebp,
    Cavif,
}

impl BinaryTool {
    pub fn file_name(self) -> &'static str {
        match self {
            BinaryTool::Cwebp => "cwebp",
            BinaryTool::Cavif => "cavif",
        }
    }
}

/// Memoized availability check for executables in one directory.
#[derive(Debug)]
pub struct BinaryProbe {
    bin_dir: PathBuf,
    cache: Mutex<HashMap<String, bool>>,
}

impl BinaryProbe {
    pub fn new(bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin_dir: bin_dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Probe rooted at `<app_root>/vendor/bin`.
    pub fn for_app_root(app_root: &Path) -> Self {
        Self::new(app_root.join(BIN_DIR))
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    /// Whether `tool` exists in the binary directory and is executable.
    pub fn is_available(&self, tool: &str) -> bool {
        // Entries are written whole, so a poisoned map is still consistent.
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(&known) = cache.get(tool) {
            return known;
        }
        let available = is_executable(&self.bin_dir.join(tool));
        cache.insert(tool.to_string(), available);
        available
    }

    /// Full path to `tool`, or `None` when it is not available.
    pub fn path_for(&self, tool: &str) -> Option<PathBuf> {
        self.is_available(tool).then(|| self.bin_dir.join(tool))
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn make_executable(path: &Path) {
        use std::os::unix::fs::PermissionsExt;
        std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        let probe = BinaryProbe::new(tmp.path());
        assert!(!probe.is_available("cwebp"));
        assert_eq!(probe.path_for("cwebp"), None);
    }

    #[test]
    fn missing_directory_is_unavailable() {
        let probe = BinaryProbe::new("/nonexistent/vendor/bin");
        assert!(!probe.is_available("cavif"));
    }

    #[cfg(unix)]
    #[test]
    fn executable_binary_is_available() {
        let tmp = TempDir::new().unwrap();
        make_executable(&tmp.path().join("cwebp"));

        let probe = BinaryProbe::new(tmp.path());
        assert!(probe.is_available("cwebp"));
        assert_eq!(probe.path_for("cwebp"), Some(tmp.path().join("cwebp")));
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_file_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("cavif"), "not executable").unwrap();

        let probe = BinaryProbe::new(tmp.path());
        assert!(!probe.is_available("cavif"));
    }

    #[test]
    fn directory_named_like_tool_is_unavailable() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("cwebp")).unwrap();

        let probe = BinaryProbe::new(tmp.path());
        assert!(!probe.is_available("cwebp"));
    }

    #[cfg(unix)]
    #[test]
    fn result_is_remembered_after_install() {
        let tmp = TempDir::new().unwrap();
        let probe = BinaryProbe::new(tmp.path());
        assert!(!probe.is_available("cwebp"));

        // Installed after the first check: still reported missing
        make_executable(&tmp.path().join("cwebp"));
        assert!(!probe.is_available("cwebp"));

        // A fresh probe sees it
        assert!(BinaryProbe::new(tmp.path()).is_available("cwebp"));
    }

    #[test]
    fn app_root_probe_uses_vendor_bin() {
        let probe = BinaryProbe::for_app_root(Path::new("/srv/shop"));
        assert_eq!(probe.bin_dir(), Path::new("/srv/shop/vendor/bin"));
    }

    #[test]
    fn tool_file_names() {
        assert_eq!(BinaryTool::Cwebp.file_name(), "cwebp");
        assert_eq!(BinaryTool::Cavif.file_name(), "cavif");
    }
}
