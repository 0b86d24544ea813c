//! Persistence seam for application state that must survive a restart.
//!
//! State with a load-on-init / save-on-change lifecycle goes through an
//! explicit [`Store`] injected into whatever owns the state, never through
//! ambient global access, so owners are testable against a temp directory.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::Path;
use std::path::PathBuf;

use crate::error::Result;

pub trait Store<T> {
    /// Load the persisted value, or `None` if nothing has been saved yet.
    fn load(&self) -> Result<Option<T>>;

    fn save(&self, value: &T) -> Result<()>;
}

/// File-backed store holding one pretty-printed JSON document.
///
/// Saves go through a sibling temp file and a rename so a crash mid-write
/// never leaves a truncated document behind.
pub struct JsonFileStore<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T> Store<T> for JsonFileStore<T>
where
    T: Serialize + DeserializeOwned,
{
    fn load(&self) -> Result<Option<T>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => {
                tracing::error!("failed to read {}: {e}", self.path.display());
                Err(e.into())
            }
        }
    }

    fn save(&self, value: &T) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(value)?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
