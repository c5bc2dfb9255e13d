use std::path::{Path, PathBuf};

use crate::error::StoreError;

pub const DEFAULT_DB_NAME: &str = "hh";

/// Where the database lives: `<dir>/<name>.db`.
#[derive(Debug, Clone)]
pub struct DbConfig {
    name: String,
    dir: PathBuf,
}

impl DbConfig {
    pub fn new(name: &str, dir: Option<PathBuf>) -> Result<Self, StoreError> {
        let name = name.trim();
        let bad_char = |c: char| c == '/' || c == '\\' || c.is_control();
        if name.is_empty() || name == "." || name == ".." || name.contains(bad_char) {
            return Err(StoreError::InvalidName(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            dir: dir.unwrap_or_else(Self::default_dir),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn database_path(&self) -> PathBuf {
        self.dir.join(format!("{}.db", self.name))
    }

    fn default_dir() -> PathBuf {
        // XDG data directory, or the working directory if there is no home
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "hhdb") {
            proj_dirs.data_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }
}
