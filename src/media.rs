//! The media directory that holds source images and generated artifacts.
//!
//! Records store paths relative to this directory; the filesystem is only
//! ever touched through absolute paths resolved here.

use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct MediaDirectory {
    root: PathBuf,
}

impl MediaDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a media-relative reference. Leading slashes are ignored.
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative.trim_start_matches('/'))
    }

    /// Media-relative reference of an absolute path inside the directory.
    pub fn relative(&self, absolute: &Path) -> Option<String> {
        let rel = absolute.strip_prefix(&self.root).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.absolute(relative).is_file()
    }

    /// Remove a file. A file that is already gone counts as deleted.
    pub fn delete(&self, relative: &str) -> io::Result<()> {
        match std::fs::remove_file(self.absolute(relative)) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }

    /// Copy `source` to `relative`, staging it under a temporary name in the
    /// target directory and renaming it into place.
    pub fn copy_in(&self, source: &Path, relative: &str) -> io::Result<PathBuf> {
        let target = self.absolute(relative);
        let dir = target
            .parent()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no parent"))?;
        std::fs::create_dir_all(dir)?;

        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staging = dir.join(format!(".{file_name}.part"));

        if let Err(e) = std::fs::copy(source, &staging) {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
        if let Err(e) = std::fs::rename(&staging, &target) {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolves_both_directions() {
        let media = MediaDirectory::new("/srv/media");
        let abs = media.absolute("/banner_slider/responsive/1/desktop_x.jpg");
        assert_eq!(
            abs,
            PathBuf::from("/srv/media/banner_slider/responsive/1/desktop_x.jpg")
        );
        assert_eq!(
            media.relative(&abs).as_deref(),
            Some("banner_slider/responsive/1/desktop_x.jpg")
        );
        assert_eq!(media.relative(Path::new("/elsewhere/a.jpg")), None);
    }

    #[test]
    fn delete_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let media = MediaDirectory::new(tmp.path());
        std::fs::write(tmp.path().join("a.jpg"), b"x").unwrap();

        assert!(media.exists("a.jpg"));
        media.delete("a.jpg").unwrap();
        assert!(!media.exists("a.jpg"));
        media.delete("a.jpg").unwrap();
    }

    #[test]
    fn copy_in_creates_dirs_and_leaves_no_staging_file() {
        let tmp = TempDir::new().unwrap();
        let upload = tmp.path().join("upload.tmp");
        std::fs::write(&upload, b"compressed").unwrap();
        let media = MediaDirectory::new(tmp.path().join("media"));

        let target = media.copy_in(&upload, "responsive/3/mobile_abc.webp").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"compressed");
        let entries: Vec<_> = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn copy_in_missing_source_fails_cleanly() {
        let tmp = TempDir::new().unwrap();
        let media = MediaDirectory::new(tmp.path());

        assert!(media.copy_in(&tmp.path().join("nope"), "out/a.jpg").is_err());
        assert!(!tmp.path().join("out/.a.jpg.part").exists());
    }
}
