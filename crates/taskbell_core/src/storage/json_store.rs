use crate::error::AppError;
use crate::storage::KeyValueStore;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

const STORE_FILE_NAME: &str = "store.json";
const STORE_ENV_VAR: &str = "TASKBELL_STORE_PATH";

pub fn store_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskbell").join(STORE_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskbell")
            .join(STORE_FILE_NAME))
    }
}

/// A JSON object of string values kept in a single file.
///
/// Every `set` replaces the whole file by renaming a finished temporary
/// file over it, so readers never see a partial write. A missing or
/// unreadable file reads as an empty store.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    pub fn open_default() -> Result<Self, AppError> {
        let path = store_path()?;
        Ok(Self::open(&path))
    }

    pub fn open(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            entries: read_entries(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<(), AppError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let content = serde_json::to_string_pretty(&self.entries)?;
        let mut file = NamedTempFile::new_in(dir)?;
        file.write_all(content.as_bytes())?;
        file.as_file().sync_all()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(file.path(), permissions)?;
        }

        file.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), AppError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.write()
    }

    fn refresh(&mut self) {
        self.entries = read_entries(&self.path);
    }
}

fn read_entries(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        return BTreeMap::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "store unreadable, starting empty");
            return BTreeMap::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "store is not a string map, starting empty");
            BTreeMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FileStore;
    use crate::storage::KeyValueStore;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn set_then_reopen_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");

        let mut store = FileStore::open(&path);
        store.set("darkMode", "true").unwrap();
        store.set("tasks", "[]").unwrap();

        let reopened = FileStore::open(&path);
        assert_eq!(reopened.get("darkMode").unwrap().as_deref(), Some("true"));
        assert_eq!(reopened.get("tasks").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn missing_file_reads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(&dir.path().join("absent.json"));

        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[test]
    fn corrupt_file_reads_empty_and_is_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = FileStore::open(&path);
        assert_eq!(store.get("tasks").unwrap(), None);

        store.set("tasks", "[]").unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "tasks": "[]" }));
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("store.json");

        let mut store = FileStore::open(&path);
        store.set("darkMode", "false").unwrap();

        assert!(path.exists());
    }

    #[test]
    fn refresh_picks_up_external_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let mut store = FileStore::open(&path);
        store.set("darkMode", "false").unwrap();

        let mut other = FileStore::open(&path);
        other.set("darkMode", "true").unwrap();

        assert_eq!(store.get("darkMode").unwrap().as_deref(), Some("false"));
        store.refresh();
        assert_eq!(store.get("darkMode").unwrap().as_deref(), Some("true"));
    }

    #[cfg(unix)]
    #[test]
    fn readers_never_see_a_partial_write() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let mut store = FileStore::open(&path);
        store.set("tasks", "[]").unwrap();

        let reader_path = path.clone();
        let reader = std::thread::spawn(move || {
            for _ in 0..200 {
                let content = fs::read_to_string(&reader_path).unwrap();
                let parsed: Result<serde_json::Value, _> = serde_json::from_str(&content);
                assert!(parsed.is_ok(), "read a torn store: {content:?}");
            }
        });

        let large = "x".repeat(64 * 1024);
        for round in 0..50 {
            store.set("tasks", &format!("{round}{large}")).unwrap();
        }
        reader.join().unwrap();

        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn written_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("store.json");
        let mut store = FileStore::open(&path);
        store.set("tasks", "[]").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
