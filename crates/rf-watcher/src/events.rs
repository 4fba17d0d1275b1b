//! Translation of raw `notify` events into queue changes.
//!
//! # Event Flow
//!
//! ```text
//! notify event (create / modify / remove / rename)
//!        │
//!        ▼
//!   classify() ──► QueueChange::Enqueue / QueueChange::Remove
//!        │
//!        ▼
//!   debounce loop applies the change to the pending queue
//! ```
//!
//! Renames are reported differently per platform: some backends deliver
//! both paths in one event, others send the old and new sides separately,
//! and some only say "a rename touched this path". One-sided events with
//! an unknown direction are resolved by checking whether the path still
//! exists.

use camino::Utf8PathBuf;
use notify::EventKind;
use notify::event::{MetadataKind, ModifyKind, RenameMode};
use smallvec::SmallVec;

use crate::error::WatchError;

/// A change to apply to the pending queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueChange {
    /// The file was created or written and should be (re)queued.
    Enqueue(Utf8PathBuf),
    /// The file is gone and must leave the queue.
    Remove(Utf8PathBuf),
}

impl QueueChange {
    /// The path this change refers to.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Enqueue(path) | Self::Remove(path) => path,
        }
    }
}

/// Changes produced by one event. Renames produce two, everything else at
/// most one per path.
pub type QueueChanges = SmallVec<[QueueChange; 2]>;

/// Classifies a raw event into queue changes.
///
/// Access events and metadata-only changes other than write times produce
/// nothing. Paths that are not valid UTF-8 are logged and skipped.
#[must_use]
pub fn classify(event: &notify::Event) -> QueueChanges {
    let mut changes = QueueChanges::new();

    match event.kind {
        EventKind::Create(_) => {
            changes.extend(utf8_paths(&event.paths).map(QueueChange::Enqueue));
        }
        EventKind::Modify(ModifyKind::Name(mode)) => classify_rename(mode, event, &mut changes),
        EventKind::Modify(ModifyKind::Metadata(
            MetadataKind::AccessTime
            | MetadataKind::Permissions
            | MetadataKind::Ownership
            | MetadataKind::Extended,
        )) => {}
        EventKind::Modify(_) => {
            changes.extend(utf8_paths(&event.paths).map(QueueChange::Enqueue));
        }
        EventKind::Remove(_) => {
            changes.extend(utf8_paths(&event.paths).map(QueueChange::Remove));
        }
        // access, any, other
        _ => {}
    }

    changes
}

fn classify_rename(mode: RenameMode, event: &notify::Event, changes: &mut QueueChanges) {
    match mode {
        RenameMode::From => changes.extend(utf8_paths(&event.paths).map(QueueChange::Remove)),
        RenameMode::To => changes.extend(utf8_paths(&event.paths).map(QueueChange::Enqueue)),
        RenameMode::Both => {
            let mut paths = utf8_paths(&event.paths);
            if let Some(old) = paths.next() {
                changes.push(QueueChange::Remove(old));
            }
            if let Some(new) = paths.next() {
                changes.push(QueueChange::Enqueue(new));
            }
        }
        _ => {
            changes.extend(utf8_paths(&event.paths).map(|path| {
                if path.exists() {
                    QueueChange::Enqueue(path)
                } else {
                    QueueChange::Remove(path)
                }
            }));
        }
    }
}

fn utf8_paths(paths: &[std::path::PathBuf]) -> impl Iterator<Item = Utf8PathBuf> + '_ {
    paths
        .iter()
        .filter_map(|path| match Utf8PathBuf::try_from(path.clone()) {
            Ok(path) => Some(path),
            Err(_) => {
                let error = WatchError::non_utf8_path(path.clone());
                tracing::warn!(error = %error, "Skipping file event");
                None
            }
        })
}
