//! Persistence of the configuration document
//!
//! `ConfigStore` locates, parses, structurally validates and writes the
//! [`ConfigDocument`]. It knows nothing about what the credentials mean to the
//! remote service and never touches the network.
//!
//! Saves are atomic: the new document is written to a temporary file in the same
//! directory, flushed to disk and then renamed over `config.toml`. A reader sees
//! either the previous document or the new one, never a truncated mix.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Url;
use tracing::debug;

use crate::config::{resolve_config_dir, ConfigDocument, CONFIG_FILE_NAME};
use crate::error::ConfigError;

#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
    path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(CONFIG_FILE_NAME);
        Self { dir, path }
    }

    /// Store rooted at the resolved config directory
    ///
    /// See [`resolve_config_dir`] for the lookup order.
    pub fn open(dir_override: Option<&Path>) -> Result<Self, ConfigError> {
        Ok(Self::new(resolve_config_dir(dir_override)?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read, parse and validate the document
    ///
    /// # Errors
    ///
    /// - `ConfigError::Missing` if there is no config file
    /// - `ConfigError::Malformed` if it is not valid TOML of the expected shape
    /// - `ConfigError::Invalid` if it breaks the credential invariants
    pub fn load(&self) -> Result<ConfigDocument, ConfigError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let document: ConfigDocument =
            toml::from_str(&content).map_err(|source| ConfigError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        let document = document.normalized();
        document.validate(&self.path)?;

        debug!(path = %self.path.display(), "Loaded config document");
        Ok(document)
    }

    /// Atomically replace the stored document
    ///
    /// The document is validated first; an invalid document is never written.
    pub fn save(&self, document: &ConfigDocument) -> Result<(), ConfigError> {
        let document = document.clone().normalized();
        document.validate(&self.path)?;
        let content = toml::to_string_pretty(&document)?;

        self.ensure_dir()?;

        // NamedTempFile is created with mode 0600 on Unix
        let mut temp = tempfile::Builder::new()
            .prefix(".config.toml.")
            .suffix(".tmp")
            .tempfile_in(&self.dir)
            .map_err(|source| self.io_error(&self.dir, source))?;

        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|source| self.io_error(temp.path(), source))?;

        temp.persist(&self.path)
            .map_err(|e| self.io_error(&self.path, e.error))?;

        #[cfg(unix)]
        {
            fs::File::open(&self.dir)
                .and_then(|dir| dir.sync_all())
                .map_err(|source| self.io_error(&self.dir, source))?;
        }

        debug!(path = %self.path.display(), "Saved config document");
        Ok(())
    }

    /// Record the operator-supplied instance URL
    ///
    /// Creates a document holding only `base_url` when no config file exists yet, or
    /// fills in the URL of an existing document that lacks one. Giving the URL that
    /// is already stored is a no-op; a different instance is never replaced.
    pub fn init_instance(&self, base_url: &Url) -> Result<ConfigDocument, ConfigError> {
        let mut document = match self.load() {
            Ok(document) => document,
            Err(ConfigError::Missing { .. }) => {
                let document = ConfigDocument::with_base_url(base_url);
                self.save(&document)?;
                return Ok(document);
            }
            Err(e) => return Err(e),
        };

        if let Some(existing) = &document.instance.base_url {
            if document.base_url().ok().as_ref() == Some(base_url) {
                return Ok(document);
            }
            return Err(ConfigError::AlreadyConfigured {
                path: self.path.clone(),
                base_url: existing.clone(),
            });
        }

        document.instance.base_url = Some(base_url.to_string());
        self.save(&document)?;
        Ok(document)
    }

    /// Create the config directory, readable only by the owner
    fn ensure_dir(&self) -> Result<(), ConfigError> {
        if self.dir.is_dir() {
            return Ok(());
        }

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(0o700);
        }

        builder
            .create(&self.dir)
            .map_err(|source| self.io_error(&self.dir, source))
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ConfigError {
        ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, ConfigStore) {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("tootcast"));
        (dir, store)
    }

    fn url() -> Url {
        Url::parse("https://example.social/").unwrap()
    }

    #[test]
    fn test_load_missing_file() {
        let (_dir, store) = temp_store();

        match store.load() {
            Err(ConfigError::Missing { path }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected ConfigError::Missing, got {:?}", other),
        }
    }

    #[test]
    fn test_load_malformed_file() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(), "[instance\nbase_url = ").unwrap();

        assert!(matches!(store.load(), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn test_load_wrong_shape_is_malformed() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(), "instance = \"https://example.social\"\n").unwrap();

        assert!(matches!(store.load(), Err(ConfigError::Malformed { .. })));
    }

    #[test]
    fn test_load_empty_file_is_empty_document() {
        let (_dir, store) = temp_store();
        fs::create_dir_all(store.dir()).unwrap();
        fs::write(store.path(), "").unwrap();

        assert_eq!(store.load().unwrap(), ConfigDocument::default());
    }

    #[test]
    fn test_save_then_load() {
        let (_dir, store) = temp_store();
        let mut document = ConfigDocument::with_base_url(&url());
        document.instance.client_key = Some("key1".to_string());
        document.instance.client_secret = Some("secret1".to_string());

        store.save(&document).unwrap();

        assert_eq!(store.load().unwrap(), document);
    }

    #[test]
    fn test_save_refuses_invalid_document() {
        let (_dir, store) = temp_store();
        let mut document = ConfigDocument::with_base_url(&url());
        document.instance.client_key = Some("key1".to_string());

        assert!(matches!(
            store.save(&document),
            Err(ConfigError::Invalid { .. })
        ));
        assert!(!store.exists());
    }

    #[test]
    fn test_save_leaves_no_temporary_files() {
        let (_dir, store) = temp_store();
        store.save(&ConfigDocument::with_base_url(&url())).unwrap();
        store.save(&ConfigDocument::with_base_url(&url())).unwrap();

        let names: Vec<String> = fs::read_dir(store.dir())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["config.toml".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = temp_store();
        store.save(&ConfigDocument::with_base_url(&url())).unwrap();

        let dir_mode = fs::metadata(store.dir()).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700, "config directory should be 700");

        let file_mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600, "config file should be 600");
    }

    #[test]
    fn test_init_instance_creates_document() {
        let (_dir, store) = temp_store();

        let document = store.init_instance(&url()).unwrap();

        assert_eq!(document.instance.base_url.as_deref(), Some("https://example.social/"));
        assert_eq!(store.load().unwrap(), document);
    }

    #[test]
    fn test_init_instance_fills_existing_document() {
        let (_dir, store) = temp_store();
        let mut document = ConfigDocument::default();
        document.user.username = Some("alice".to_string());
        store.save(&document).unwrap();

        let document = store.init_instance(&url()).unwrap();

        assert_eq!(document.user.username.as_deref(), Some("alice"));
        assert!(document.instance.base_url.is_some());
    }

    #[test]
    fn test_init_instance_same_url_is_noop() {
        let (_dir, store) = temp_store();
        let mut document = ConfigDocument::with_base_url(&url());
        document.instance.client_key = Some("key1".to_string());
        document.instance.client_secret = Some("secret1".to_string());
        store.save(&document).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        // Same instance, spelled without the trailing slash
        let again = Url::parse("https://example.social").unwrap();
        let result = store.init_instance(&again).unwrap();

        assert_eq!(result, document);
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_init_instance_refuses_to_replace() {
        let (_dir, store) = temp_store();
        store.init_instance(&url()).unwrap();

        let other = Url::parse("https://other.social/").unwrap();
        match store.init_instance(&other) {
            Err(ConfigError::AlreadyConfigured { base_url, .. }) => {
                assert_eq!(base_url, "https://example.social/");
            }
            other => panic!("Expected ConfigError::AlreadyConfigured, got {:?}", other),
        }
    }
}
