use std::{
    fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use parking_lot::Mutex;

use crate::api::AuthToken;

const KEY_AUTH_TOKEN: &str = "auth-token";

/// Where the bearer token lives between requests
pub trait TokenStore: Send + Sync {
    fn load(&self) -> anyhow::Result<Option<AuthToken>>;
    fn save(&self, token: &AuthToken) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore(Mutex<Option<AuthToken>>);

impl MemoryTokenStore {
    pub fn new() -> MemoryTokenStore {
        MemoryTokenStore(Mutex::new(None))
    }

    pub fn with_token(token: AuthToken) -> MemoryTokenStore {
        MemoryTokenStore(Mutex::new(Some(token)))
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> anyhow::Result<Option<AuthToken>> {
        Ok(self.0.lock().clone())
    }

    fn save(&self, token: &AuthToken) -> anyhow::Result<()> {
        *self.0.lock() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.0.lock() = None;
        Ok(())
    }
}

/// Key-value JSON file, so that other settings can share it later on
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

type Entries = serde_json::Map<String, serde_json::Value>;

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> FileTokenStore {
        FileTokenStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> anyhow::Result<Entries> {
        match fs::read(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => {
                Err(e).with_context(|| format!("reading token file {:?}", self.path))
            }
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("parsing token file {:?}", self.path)),
        }
    }

    fn write_entries(&self, entries: &Entries) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(entries).context("serializing token file")?;
        fs::write(&self.path, bytes)
            .with_context(|| format!("writing token file {:?}", self.path))
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> anyhow::Result<Option<AuthToken>> {
        self.read_entries()?
            .remove(KEY_AUTH_TOKEN)
            .map(serde_json::from_value)
            .transpose()
            .with_context(|| format!("parsing auth token from {:?}", self.path))
    }

    fn save(&self, token: &AuthToken) -> anyhow::Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(
            String::from(KEY_AUTH_TOKEN),
            serde_json::to_value(token).context("serializing auth token")?,
        );
        self.write_entries(&entries)
    }

    fn clear(&self) -> anyhow::Result<()> {
        let mut entries = self.read_entries()?;
        if entries.remove(KEY_AUTH_TOKEN).is_some() {
            self.write_entries(&entries)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.load().unwrap(), None);
        store.save(&AuthToken(String::from("abc"))).unwrap();
        assert_eq!(store.load().unwrap(), Some(AuthToken(String::from("abc"))));
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = tempfile::tempdir().expect("creating tempdir");
        let path = dir.path().join("inkwell.json");

        let store = FileTokenStore::new(&path);
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
        assert!(!path.exists(), "clearing an absent token must not create the file");

        store.save(&AuthToken(String::from("tok-1"))).unwrap();
        let reopened = FileTokenStore::new(&path);
        assert_eq!(reopened.load().unwrap(), Some(AuthToken(String::from("tok-1"))));

        reopened.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn file_store_keeps_unrelated_entries() {
        let dir = tempfile::tempdir().expect("creating tempdir");
        let path = dir.path().join("inkwell.json");
        fs::write(&path, r#"{"theme": "dark"}"#).unwrap();

        let store = FileTokenStore::new(&path);
        store.save(&AuthToken(String::from("t"))).unwrap();
        store.clear().unwrap();

        let left: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(left, serde_json::json!({ "theme": "dark" }));
    }

    #[test]
    fn file_store_reports_corrupt_files() {
        let dir = tempfile::tempdir().expect("creating tempdir");
        let path = dir.path().join("inkwell.json");
        fs::write(&path, "not json").unwrap();
        assert!(FileTokenStore::new(&path).load().is_err());
    }
}
