use super::{lookup, ConfigSource};
use crate::error::{Result, WeaverError};
use figment::providers::{Env, Format, Json, Toml};
use figment::Figment;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

/// Prefix of environment variables overriding file values.
///
/// `WEAVER_APP__NAME=demo` sets `app.name`.
pub const ENV_PREFIX: &str = "WEAVER_";

/// Configuration loaded from a TOML or JSON file with environment overrides
///
/// The format follows the file extension (`.json` is JSON, anything else is
/// TOML). Environment variables carrying [`ENV_PREFIX`] are merged on top,
/// with `__` separating nested keys.
///
/// # Example
///
/// ```rust,ignore
/// let source = FileSource::open("weaver.toml")?;
/// let app = source.subtree("app")?;
/// ```
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    env_prefix: Option<String>,
    data: RwLock<Value>,
}

impl FileSource {
    /// Load `path`, with [`ENV_PREFIX`] overrides
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_env_prefix(path, Some(ENV_PREFIX))
    }

    /// Load `path`, merging variables with `prefix` when given
    pub fn with_env_prefix(path: impl AsRef<Path>, prefix: Option<&str>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(WeaverError::Config(format!(
                "configuration file {} not found",
                path.display()
            )));
        }

        let source = Self {
            path,
            env_prefix: prefix.map(str::to_string),
            data: RwLock::new(Value::Null),
        };
        source.reload()?;
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn figment(&self) -> Figment {
        let figment = match self.path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Figment::from(Json::file(&self.path)),
            _ => Figment::from(Toml::file(&self.path)),
        };
        match &self.env_prefix {
            Some(prefix) => figment.merge(Env::prefixed(prefix).split("__")),
            None => figment,
        }
    }
}

impl ConfigSource for FileSource {
    fn subtree(&self, key: &str) -> Result<Option<Value>> {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(lookup(&data, key).cloned())
    }

    /// Re-read the file. On failure the previously loaded data is kept.
    fn reload(&self) -> Result<()> {
        let loaded: Value = self.figment().extract()?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = loaded;
        tracing::debug!(path = %self.path.display(), "Configuration loaded");
        Ok(())
    }
}

/// In-memory configuration tree
#[derive(Debug, Default)]
pub struct ValueSource {
    root: RwLock<Value>,
}

impl ValueSource {
    pub fn new(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    /// Set the value under a dotted key, creating intermediate tables
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let mut root = self.root.write().unwrap_or_else(PoisonError::into_inner);
        let mut node = &mut *root;
        for segment in key.split('.') {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            node = match node {
                Value::Object(map) => map.entry(segment).or_insert(Value::Null),
                _ => return,
            };
        }
        *node = value.into();
    }

    /// Snapshot of the whole tree
    pub fn get(&self) -> Value {
        self.root.read().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ConfigSource for ValueSource {
    fn subtree(&self, key: &str) -> Result<Option<Value>> {
        let root = self.root.read().unwrap_or_else(PoisonError::into_inner);
        Ok(lookup(&root, key).cloned())
    }
}

impl From<Value> for ValueSource {
    fn from(root: Value) -> Self {
        Self::new(root)
    }
}
