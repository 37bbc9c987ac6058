//! Source folder importer: the newest supported file in a directory is the
//! current import batch.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use shiptrack_recon::{ImportBatch, SourceImporter};
use tracing::{error, info, warn};

use crate::import::{is_supported, read_rows};

pub struct FolderImporter {
    dir: PathBuf,
}

impl FolderImporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Most recently modified supported file. Ties resolve to the greater
    /// file name so the choice is stable.
    pub fn latest_file(&self) -> std::io::Result<Option<PathBuf>> {
        let mut best: Option<(SystemTime, PathBuf)> = None;

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || !is_supported(&path) || is_hidden(&path) {
                continue;
            }
            let modified = entry.metadata()?.modified()?;
            let newer = match &best {
                None => true,
                Some((t, p)) => modified > *t || (modified == *t && path > *p),
            };
            if newer {
                best = Some((modified, path));
            }
        }

        Ok(best.map(|(_, p)| p))
    }
}

/// Dotfiles and Office lock files (`~$envios.xlsx`).
fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.') || n.starts_with("~$"))
        .unwrap_or(true)
}

impl SourceImporter for FolderImporter {
    fn fetch_latest(&mut self) -> Option<ImportBatch> {
        let path = match self.latest_file() {
            Ok(Some(p)) => p,
            Ok(None) => {
                error!(dir = %self.dir.display(), "no import files found in source folder");
                return None;
            }
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "cannot list source folder");
                return None;
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!(file = %name, "latest import file");

        match read_rows(&path) {
            Ok(rows) => Some(ImportBatch { name, rows }),
            Err(e) => {
                warn!(file = %name, error = %e, "import file rejected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn touch(path: &Path, content: &str, age_secs: u64) {
        fs::write(path, content).unwrap();
        let mtime = SystemTime::now() - Duration::from_secs(age_secs);
        let file = fs::File::options().write(true).open(path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn picks_newest_supported_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("old.csv"), "ID,NÚMERO GUIA,ESTATUS\nA1,1,X\n", 300);
        touch(&dir.path().join("new.csv"), "ID,NÚMERO GUIA,ESTATUS\nA2,2,Y\n", 10);
        touch(&dir.path().join("newest.txt"), "ignored", 0);
        touch(&dir.path().join("~$lock.csv"), "ignored", 0);

        let mut importer = FolderImporter::new(dir.path());
        assert_eq!(importer.latest_file().unwrap(), Some(dir.path().join("new.csv")));

        let batch = importer.fetch_latest().unwrap();
        assert_eq!(batch.name, "new.csv");
        assert_eq!(batch.rows.len(), 1);
        assert_eq!(batch.rows[0].tracking_number, "2");
    }

    #[test]
    fn empty_folder_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut importer = FolderImporter::new(dir.path());
        assert!(importer.fetch_latest().is_none());
    }

    #[test]
    fn missing_folder_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut importer = FolderImporter::new(dir.path().join("absent"));
        assert!(importer.fetch_latest().is_none());
    }

    #[test]
    fn bad_headers_yield_none() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("batch.csv"), "ID,GUIA\nA1,1\n", 0);
        let mut importer = FolderImporter::new(dir.path());
        assert!(importer.fetch_latest().is_none());
    }
}
