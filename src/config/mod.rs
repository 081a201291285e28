//! Configuration sources
//!
//! A [`ConfigSource`] is a hierarchical key/value tree queried by dotted path.
//! Components bind subtrees of it into their configuration fields, and the
//! framework reads its own options from the `weaver` subtree.
//!
//! ```toml
//! [weaver.logger]
//! level = "debug"
//! type = "json"
//!
//! [app]
//! name = "demo"
//! ```

mod options;
mod source;
mod watcher;

pub use options::{FrameworkOptions, FRAMEWORK_KEY};
pub use source::{FileSource, ValueSource, ENV_PREFIX};
pub use watcher::ConfigWatcher;

use crate::error::Result;
use serde_json::Value;

/// A hierarchical configuration tree
pub trait ConfigSource: Send + Sync {
    /// The subtree under the dotted `key`, or `None` when nothing is set there.
    fn subtree(&self, key: &str) -> Result<Option<Value>>;

    /// Re-read the underlying data. Sources without backing storage do nothing.
    fn reload(&self) -> Result<()> {
        Ok(())
    }
}

/// Walk a dotted path through nested objects
pub(crate) fn lookup<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    if key.is_empty() {
        return Some(root);
    }
    key.split('.')
        .try_fold(root, |node, segment| node.as_object()?.get(segment))
        .filter(|value| !value.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup() {
        let root = json!({"app": {"name": "demo", "limits": {"max": 3}}, "empty": null});

        assert_eq!(lookup(&root, "app.name"), Some(&json!("demo")));
        assert_eq!(lookup(&root, "app.limits"), Some(&json!({"max": 3})));
        assert_eq!(lookup(&root, ""), Some(&root));
        assert_eq!(lookup(&root, "app.name.first"), None);
        assert_eq!(lookup(&root, "missing"), None);
        assert_eq!(lookup(&root, "empty"), None);
    }
}
