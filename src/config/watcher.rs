//! Configuration file watcher for hot-reloading

use crate::di::Container;
use crate::error::{Result, WeaverError};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Quiet period after a change before the reload runs
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches a configuration file and reloads the container when it changes.
///
/// Every burst of changes triggers one [`Container::reload`]: the source is
/// re-read, configuration fields are bound again, and running components are
/// shut down and started again. Dropping the watcher stops it.
///
/// # Example
///
/// ```rust,ignore
/// let container = Container::builder().source(FileSource::open("weaver.toml")?).build()?;
/// let _watcher = ConfigWatcher::spawn(container.clone(), "weaver.toml")?;
/// ```
pub struct ConfigWatcher {
    path: PathBuf,
    _watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl ConfigWatcher {
    /// Start watching `path`. Must be called from within a tokio runtime.
    pub fn spawn(container: Container, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = sender.send(res);
            },
            Config::default(),
        )
        .map_err(|err| WeaverError::Config(format!("failed to create file watcher: {err}")))?;

        // Editors often replace the file instead of writing it in place, so
        // the parent directory is watched and events are filtered by name.
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|err| {
                WeaverError::Config(format!("failed to watch {}: {err}", path.display()))
            })?;

        tracing::info!(path = %path.display(), "Watching configuration file");
        let task = tokio::spawn(watch_loop(container, path.clone(), receiver));

        Ok(Self {
            path,
            _watcher: watcher,
            task,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_loop(
    container: Container,
    path: PathBuf,
    mut events: mpsc::UnboundedReceiver<notify::Result<Event>>,
) {
    let token = container.token();
    loop {
        let event = tokio::select! {
            _ = token.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        match event {
            Ok(event) if is_change_of(&event, &path) => {}
            Ok(_) => continue,
            Err(err) => {
                tracing::warn!(error = %err, "File watch error");
                continue;
            }
        }

        // Collapse the rest of the burst into this reload.
        tokio::time::sleep(DEBOUNCE).await;
        while events.try_recv().is_ok() {}

        tracing::info!(path = %path.display(), "Configuration changed, reloading");
        if let Err(err) = container.reload().await {
            tracing::error!(error = %err, "Failed to reload configuration");
        }
    }
    tracing::debug!(path = %path.display(), "Configuration watcher stopped");
}

fn is_change_of(event: &Event, path: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event
            .paths
            .iter()
            .any(|changed| changed.file_name() == path.file_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, ModifyKind};

    #[test]
    fn test_only_changes_of_the_watched_file_count() {
        let path = Path::new("/etc/app/weaver.toml");

        let modified = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/app/weaver.toml"));
        let created = Event::new(EventKind::Create(CreateKind::File))
            .add_path(PathBuf::from("/etc/app/weaver.toml"));
        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/etc/app/other.toml"));
        let read = Event::new(EventKind::Access(AccessKind::Any))
            .add_path(PathBuf::from("/etc/app/weaver.toml"));

        assert!(is_change_of(&modified, path));
        assert!(is_change_of(&created, path));
        assert!(!is_change_of(&other, path));
        assert!(!is_change_of(&read, path));
    }
}
