//! Filesystem checks used to gate repair candidates.

use std::fs;
use std::path::Path;

/// Answers whether a path names an existing regular file.
pub trait FileProbe {
    fn is_regular_file(&self, path: &Path) -> bool;
}

/// Probe backed by the real filesystem. Symlinks are followed.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsProbe;

impl FileProbe for FsProbe {
    fn is_regular_file(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|meta| meta.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_directories_and_missing_paths() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("a.txt");
        fs::write(&file, "a").expect("write");
        fs::create_dir(temp.path().join("dir")).expect("mkdir");

        assert!(FsProbe.is_regular_file(&file));
        assert!(!FsProbe.is_regular_file(&temp.path().join("dir")));
        assert!(!FsProbe.is_regular_file(&temp.path().join("missing.txt")));
    }
}
