use directories::ProjectDirs;
use std::path::PathBuf;

use crate::{Error, Result};

/// Application directories following platform conventions
#[derive(Debug, Clone)]
pub struct Directories {
    /// Config directory (~/.config/mobupps)
    pub config: PathBuf,

    /// Data directory (~/.local/share/mobupps)
    pub data: PathBuf,

    /// Config file path
    pub config_file: PathBuf,

    /// Persisted search history
    pub history_file: PathBuf,

    /// Default destination for exported metrics
    pub exports: PathBuf,
}

impl Directories {
    /// Resolve the standard per-user paths.
    ///
    /// # Errors
    ///
    /// Returns a config error if the system's project directories cannot be
    /// determined (no home directory).
    pub fn new() -> Result<Self> {
        let project = ProjectDirs::from("", "", "mobupps").ok_or_else(|| {
            Error::Config("Failed to determine project directories".to_string())
        })?;

        let config = project.config_dir().to_path_buf();
        let data = project.data_dir().to_path_buf();

        Ok(Self {
            config_file: config.join("config.json"),
            history_file: data.join("search-history.json"),
            exports: data.join("exports"),
            config,
            data,
        })
    }

    #[must_use]
    pub fn with_base(base: PathBuf) -> Self {
        Self {
            config_file: base.join("config.json"),
            history_file: base.join("search-history.json"),
            exports: base.join("exports"),
            config: base.clone(),
            data: base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_sets_all_paths() {
        let base = PathBuf::from("/tmp/test-mobupps");
        let dirs = Directories::with_base(base.clone());

        assert_eq!(dirs.config, base);
        assert_eq!(dirs.data, base);
        assert_eq!(dirs.config_file, base.join("config.json"));
        assert_eq!(dirs.history_file, base.join("search-history.json"));
        assert_eq!(dirs.exports, base.join("exports"));
    }
}
