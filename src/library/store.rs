//! JSON file persistence shared by the history and playlist stores.

use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::error::LibraryError;

/// A JSON document on disk holding one `T`.
///
/// Loading never fails: a missing file or one that no longer parses reads as
/// `T::default()`. Saving writes a sibling temp file and renames it over the
/// target, so a crash mid-save leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonFile<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> T {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "library file not found, starting empty");
                return T::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "could not read library file, starting empty");
                return T::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "library file is corrupt, starting empty");
                T::default()
            }
        }
    }

    /// # Errors
    ///
    /// Returns [`LibraryError::Io`] if the directory, temp file, or rename
    /// fails, and [`LibraryError::Json`] if serialization fails.
    pub fn save(&self, value: &T) -> Result<(), LibraryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| LibraryError::io(parent, e))?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file = std::fs::File::create(&temp_path).map_err(|e| LibraryError::io(&temp_path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)
            .map_err(|e| LibraryError::json(&self.path, e))?;
        writer.flush().map_err(|e| LibraryError::io(&temp_path, e))?;
        drop(writer);

        std::fs::rename(&temp_path, &self.path).map_err(|e| LibraryError::io(&self.path, e))?;
        debug!(path = %self.path.display(), "library file saved");
        Ok(())
    }
}
