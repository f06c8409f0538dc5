use std::path::PathBuf;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "SCANBOX_DATA_DIR";

/// File name of the redb database inside the data directory.
pub const DB_FILE: &str = "scanbox.redb";

/// Where the scanner keeps its durable state.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Directory holding the local database.
    /// Falls back to `$SCANBOX_DATA_DIR`, then `~/.scanbox`.
    pub data_dir: Option<PathBuf>,

    /// Explicit redb database path.
    /// Defaults to `{data_dir}/scanbox.redb` if not specified.
    pub db_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: Some(data_dir.into()),
            db_path: None,
        }
    }

    /// Fill unset fields from the environment.
    pub fn with_env(mut self) -> Self {
        if self.data_dir.is_none() {
            self.data_dir = std::env::var_os(DATA_DIR_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from);
        }
        self
    }

    /// Resolve the data directory, falling back to `~/.scanbox`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }

    /// Resolve the redb database path, falling back to `{data_dir}/scanbox.redb`.
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| self.resolve_data_dir().join(DB_FILE))
    }
}

/// Return the scanbox home directory (~/.scanbox).
pub fn default_data_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".scanbox")
}
