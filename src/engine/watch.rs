//! File watching - notify events → [`Trigger::Changes`]
//!
//! This module is only available with the "watch" feature enabled.

use notify::event::EventKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::Arc;

use crate::core::model::{ChangeEvent, ChangeKind};
use crate::core::paths::cache_dir;
use crate::scanner::ContentSet;

use super::queue::{Trigger, TriggerQueue};

/// Translate one notify event. Access events and unrelated paths are dropped.
pub fn change_events(event: &notify::Event, content: &ContentSet) -> Vec<ChangeEvent> {
    let kind = match &event.kind {
        EventKind::Create(_) => ChangeKind::Created,
        EventKind::Remove(_) => ChangeKind::Removed,
        EventKind::Modify(_) | EventKind::Any => ChangeKind::Modified,
        EventKind::Access(_) | EventKind::Other => return Vec::new(),
    };
    let internal = cache_dir(content.root());

    event
        .paths
        .iter()
        .filter(|path| !path.starts_with(&internal))
        .filter_map(|path| {
            // Renames report both ends and saves may delete then recreate;
            // what is on disk now decides
            let kind = match (kind, path.exists()) {
                (_, false) => ChangeKind::Removed,
                (ChangeKind::Removed, true) => ChangeKind::Modified,
                (kind, true) => kind,
            };
            let relevant = kind == ChangeKind::Removed || path.is_dir() || content.matches(path);
            relevant.then(|| ChangeEvent::new(path.clone(), kind))
        })
        .collect()
}

/// Watch the content roots and push a trigger per relevant event.
///
/// The returned watcher stops when dropped.
pub fn watch_content(
    content: ContentSet,
    queue: Arc<TriggerQueue>,
) -> notify::Result<RecommendedWatcher> {
    let roots: Vec<_> = content
        .walk_roots()
        .iter()
        .filter(|root| root.exists())
        .cloned()
        .collect();

    let handler_content = content.clone();
    let mut watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
        match result {
            Ok(event) => {
                let events = change_events(&event, &handler_content);
                if !events.is_empty() {
                    queue.push(Trigger::Changes(events));
                }
            }
            Err(err) => tracing::warn!("watch error: {}", err),
        }
    })?;

    if roots.is_empty() {
        watch_root(&mut watcher, content.root())?;
    }
    for root in &roots {
        watch_root(&mut watcher, root)?;
    }
    Ok(watcher)
}

fn watch_root(watcher: &mut RecommendedWatcher, root: &Path) -> notify::Result<()> {
    tracing::debug!(root = %root.display(), "watching");
    watcher.watch(root, RecursiveMode::Recursive)
}
