use std::fs;
use std::io;
use std::path::Path;

use crate::traits::BaseConfigFiles;

/// Config file access on the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFiles;

impl BaseConfigFiles for LocalFiles {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_files_round_trip_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wp-config.php");

        LocalFiles
            .write(&path, "<?php\n$table_prefix = 'wp_';\n")
            .unwrap();
        let content = LocalFiles.read(&path).unwrap();

        assert_eq!(content, "<?php\n$table_prefix = 'wp_';\n");
    }

    #[test]
    fn test_local_files_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LocalFiles.read(&dir.path().join("wp-config.php")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
