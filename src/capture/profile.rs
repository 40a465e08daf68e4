use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Browser profile directory owned by one capture session.
///
/// Created under `root` with a fresh random name and removed when dropped,
/// on every exit path of the owning worker.
#[derive(Debug)]
pub struct ProfileDir {
    path: PathBuf,
}

impl ProfileDir {
    pub fn create(root: &Path) -> Result<Self> {
        let path = root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path)
            .with_context(|| format!("failed to create profile directory {}", path.display()))?;
        debug!("Created browser profile {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProfileDir {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!("Removed browser profile {}", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove browser profile {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
