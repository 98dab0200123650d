use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub db_path: PathBuf,
    pub index_dir: PathBuf,
    pub config_path: PathBuf,
}

impl AppPaths {
    pub fn new() -> Self {
        Self::from_data_dir(discover_data_dir())
    }

    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        let log_dir = data_dir.join("logs");
        let db_path = data_dir.join("database.db");
        let index_dir = data_dir.join("storage");
        let config_path = env::var("DISCOLLAMA_CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("config.yml"));

        for dir in [&data_dir, &log_dir] {
            let _ = fs::create_dir_all(dir);
        }

        AppPaths {
            data_dir,
            log_dir,
            db_path,
            index_dir,
            config_path,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}

fn discover_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("DISCOLLAMA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_layout_from_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_data_dir(tmp.path());

        assert_eq!(paths.db_path, tmp.path().join("database.db"));
        assert_eq!(paths.index_dir, tmp.path().join("storage"));
        assert!(paths.log_dir.is_dir());
    }
}
