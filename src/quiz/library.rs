use std::fs::{self, File};
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;

use crate::quiz::{QuizError, Result};

/// Folder of quiz files a corpus can be loaded from.
#[derive(Debug, Clone)]
pub struct QuizLibrary {
    folder: PathBuf,
}

impl QuizLibrary {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// All `.txt` files directly inside the folder. A missing folder has no files.
    pub fn quiz_files(&self) -> Result<Vec<PathBuf>> {
        let entries = match fs::read_dir(&self.folder) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "txt") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    pub fn random_quiz_file(&self) -> Result<PathBuf> {
        let files = self.quiz_files()?;
        let file = files
            .choose(&mut rand::thread_rng())
            .ok_or_else(|| QuizError::NoCorpusFiles(self.folder.display().to_string()))?;
        log::info!("Randomly picked quiz file {}", file.display());
        Ok(file.clone())
    }
}

/// Extracts a zip archive of quiz files into `output_folder`, creating it if needed.
/// Returns the number of archive entries.
pub fn unpack_archive(zip_path: &Path, output_folder: &Path) -> Result<usize> {
    fs::create_dir_all(output_folder)?;

    let mut archive = zip::ZipArchive::new(File::open(zip_path)?)?;
    let entries = archive.len();
    archive.extract(output_folder)?;

    log::info!(
        "Unpacked {} entries from {} into {}",
        entries,
        zip_path.display(),
        output_folder.display()
    );
    Ok(entries)
}
