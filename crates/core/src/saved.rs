//! Locally saved movies.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::{config::config_root, models::Movie};

/// File name of the saved list inside the config directory.
pub const SAVED_FILE: &str = "saved.json";

/// A movie the user saved, with the time it was (last) saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedMovie {
    /// Movie summary as it was when saved.
    pub movie: Movie,
    /// When the movie was saved.
    pub saved_at: DateTime<Utc>,
}

/// Reads and writes the saved-movie list.
pub struct SavedStore {
    path: PathBuf,
}

impl SavedStore {
    /// Store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location under the user's config directory.
    pub fn default_path() -> PathBuf {
        config_root().join(SAVED_FILE)
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved movies, most recently saved first.
    pub fn list(&self) -> Result<Vec<SavedMovie>> {
        let mut saved = self.read()?;
        saved.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(saved)
    }

    /// Whether a movie with `id` is saved.
    pub fn contains(&self, id: u64) -> Result<bool> {
        Ok(self.read()?.iter().any(|entry| entry.movie.id == id))
    }

    /// Save `movie`, replacing an existing entry with the same id.
    pub fn save(&self, movie: &Movie) -> Result<SavedMovie> {
        let mut saved = self.read()?;
        saved.retain(|entry| entry.movie.id != movie.id);
        let entry = SavedMovie {
            movie: movie.clone(),
            saved_at: Utc::now(),
        };
        saved.push(entry.clone());
        self.write(&saved)?;
        info!(id = movie.id, title = %movie.title, "Saved movie");
        Ok(entry)
    }

    /// Remove the movie with `id`. Returns whether anything was removed.
    pub fn remove(&self, id: u64) -> Result<bool> {
        let mut saved = self.read()?;
        let before = saved.len();
        saved.retain(|entry| entry.movie.id != id);
        if saved.len() == before {
            return Ok(false);
        }
        self.write(&saved)?;
        info!(id, "Removed saved movie");
        Ok(true)
    }

    /// Save `movie` if absent, remove it otherwise. Returns whether it is now saved.
    pub fn toggle(&self, movie: &Movie) -> Result<bool> {
        if self.remove(movie.id)? {
            Ok(false)
        } else {
            self.save(movie)?;
            Ok(true)
        }
    }

    fn read(&self) -> Result<Vec<SavedMovie>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let values: Vec<Value> = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", self.path.display()))?;

        let mut saved = Vec::with_capacity(values.len());
        for value in values {
            match serde_json::from_value::<SavedMovie>(value) {
                Ok(entry) => saved.push(entry),
                Err(err) => warn!("Skipping unreadable entry in {:?}: {err}", self.path),
            }
        }
        Ok(saved)
    }

    fn write(&self, saved: &[SavedMovie]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let serialised = serde_json::to_vec_pretty(saved)?;
        fs::write(&self.path, serialised)
            .with_context(|| format!("failed to write {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn movie(id: u64, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            release_date: "1979-05-25".to_string(),
            vote_average: 8.1,
            ..Movie::default()
        }
    }

    #[test]
    fn missing_file_is_an_empty_list() -> Result<()> {
        let dir = tempdir()?;
        let store = SavedStore::new(dir.path().join("nested").join(SAVED_FILE));
        assert!(store.list()?.is_empty());
        assert!(!store.contains(1)?);
        Ok(())
    }

    #[test]
    fn save_is_idempotent_and_lists_newest_first() -> Result<()> {
        let dir = tempdir()?;
        let store = SavedStore::new(dir.path().join(SAVED_FILE));

        let first = store.save(&movie(1, "Alien"))?;
        store.save(&movie(2, "Heat"))?;
        let again = store.save(&movie(1, "Alien"))?;
        assert!(again.saved_at >= first.saved_at);

        let saved = store.list()?;
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].movie.id, 1);
        assert_eq!(saved[1].movie.title, "Heat");
        assert!(store.path().exists());
        Ok(())
    }

    #[test]
    fn toggle_and_remove() -> Result<()> {
        let dir = tempdir()?;
        let store = SavedStore::new(dir.path().join(SAVED_FILE));
        let alien = movie(1, "Alien");

        assert!(store.toggle(&alien)?);
        assert!(store.contains(1)?);
        assert!(!store.toggle(&alien)?);
        assert!(!store.contains(1)?);

        store.save(&alien)?;
        assert!(store.remove(1)?);
        assert!(!store.remove(1)?);
        Ok(())
    }

    #[test]
    fn unreadable_entries_are_skipped() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(SAVED_FILE);
        fs::write(
            &path,
            r#"[
                {"movie": {"id": 7, "title": "Se7en"}, "saved_at": "2024-01-02T03:04:05Z"},
                {"movie": {"id": 8}, "saved_at": "yesterday"}
            ]"#,
        )?;
        let store = SavedStore::new(path);
        let saved = store.list()?;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].movie.title, "Se7en");
        Ok(())
    }
}
