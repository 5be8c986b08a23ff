//! Directory watcher
//!
//! Wraps a `notify` recommended watcher on a single directory, non-recursive.
//! The backend runs on its own thread; our callback only converts raw
//! notifications into [`CreationEvent`]s and pushes them onto a channel for
//! the service worker.

use std::path::{Path, PathBuf};

use notify::event::CreateKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::contract::CreationEvent;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("watch directory {} is not accessible: {source}", .path.display())]
    Inaccessible {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("watch path {} is not a directory", .path.display())]
    NotADirectory { path: PathBuf },
    #[error("failed to start watcher on {}: {source}", .path.display())]
    Backend {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Creation events carried by `event` for direct children of `root`.
///
/// Anything other than a create notification is dropped, as are paths
/// outside `root` itself.
pub fn creation_events(event: &Event, root: &Path) -> Vec<CreationEvent> {
    let kind = match event.kind {
        EventKind::Create(kind) => kind,
        _ => return Vec::new(),
    };
    event
        .paths
        .iter()
        .filter(|path| path.parent() == Some(root))
        .map(|path| CreationEvent {
            path: path.clone(),
            is_dir: kind == CreateKind::Folder || path.is_dir(),
        })
        .collect()
}

/// A running watcher. Dropping it (or calling [`DirWatcher::stop`]) stops the
/// backend thread and closes the event channel.
pub struct DirWatcher {
    root: PathBuf,
    inner: RecommendedWatcher,
}

impl DirWatcher {
    /// Start watching `dir`, sending creation events to `sender`.
    pub fn start(dir: &Path, sender: UnboundedSender<CreationEvent>) -> Result<Self, WatchError> {
        let root = dir.canonicalize().map_err(|source| WatchError::Inaccessible {
            path: dir.to_path_buf(),
            source,
        })?;
        if !root.is_dir() {
            return Err(WatchError::NotADirectory { path: root });
        }

        let callback_root = root.clone();
        let mut inner = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for creation in creation_events(&event, &callback_root) {
                    debug!(path = %creation.path.display(), is_dir = creation.is_dir, "[WATCH] Creation event");
                    if sender.send(creation).is_err() {
                        warn!("[WATCH] Event channel closed, dropping event");
                    }
                }
            }
            Err(e) => error!(error = %e, "[WATCH] Watcher backend error"),
        })
        .map_err(|source| WatchError::Backend {
            path: root.clone(),
            source,
        })?;

        inner
            .watch(&root, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Backend {
                path: root.clone(),
                source,
            })?;

        info!(path = %root.display(), "[WATCH] Watching directory");
        Ok(Self { root, inner })
    }

    /// The canonical path being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stop watching. The event channel closes once the backend is dropped.
    pub fn stop(mut self) {
        if let Err(e) = self.inner.unwatch(&self.root) {
            warn!(error = %e, path = %self.root.display(), "[WATCH] Unwatch failed");
        }
        info!(path = %self.root.display(), "[WATCH] Watcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn file_creation_in_root_is_kept() {
        let events = creation_events(
            &event(EventKind::Create(CreateKind::File), "/watched/a.txt"),
            Path::new("/watched"),
        );
        assert_eq!(events, vec![CreationEvent::file("/watched/a.txt")]);
    }

    #[test]
    fn folder_creation_is_flagged_as_directory() {
        let events = creation_events(
            &event(EventKind::Create(CreateKind::Folder), "/watched/sub"),
            Path::new("/watched"),
        );
        assert_eq!(events, vec![CreationEvent::dir("/watched/sub")]);
    }

    #[test]
    fn nested_paths_are_out_of_scope() {
        let events = creation_events(
            &event(EventKind::Create(CreateKind::File), "/watched/sub/a.txt"),
            Path::new("/watched"),
        );
        assert!(events.is_empty());
    }

    #[test]
    fn modify_and_remove_are_ignored() {
        let root = Path::new("/watched");
        for kind in [
            EventKind::Modify(ModifyKind::Any),
            EventKind::Remove(RemoveKind::File),
            EventKind::Any,
        ] {
            assert!(creation_events(&event(kind, "/watched/a.txt"), root).is_empty());
        }
    }

    #[test]
    fn missing_directory_fails_to_start() {
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let err = DirWatcher::start(Path::new("/definitely/not/here/watch-upload"), tx)
            .err()
            .unwrap();
        assert!(matches!(err, WatchError::Inaccessible { .. }), "{err}");
    }

    #[test]
    fn regular_file_is_not_a_watch_directory() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let err = DirWatcher::start(file.path(), tx).err().unwrap();
        assert!(matches!(err, WatchError::NotADirectory { .. }), "{err}");
    }
}
