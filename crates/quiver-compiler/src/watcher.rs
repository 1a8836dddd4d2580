//! Handler discovery and file system watching.
//!
//! The watcher turns file system membership changes into [`WatchEvent`]s on a
//! bounded channel. Content edits are not reported; only files appearing and
//! disappearing matter here.
//!
//! In persistent mode the OS watcher is attached before the initial scan so
//! nothing created during the scan is lost. Live events are held back until
//! the scan has been sent, then flushed in arrival order ahead of the single
//! [`WatchEvent::InitialScanComplete`].
//!
//! The sink remembers which handlers it has reported, so a directory that is
//! deleted or renamed away yields a `Removed` for every handler inside it.

use crate::error::{Error, Result};
use ignore::overrides::{Override, OverrideBuilder};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Membership change reported by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    Removed(PathBuf),
    /// Sent exactly once, after every pre-existing match.
    InitialScanComplete,
}

/// What to watch and how long to keep watching.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Directory holding handler files.
    pub tools_root: PathBuf,
    /// Glob relative to `tools_root`.
    pub pattern: String,
    /// Optional interceptor file, matched by exact path.
    pub middleware: Option<PathBuf>,
    /// Keep watching after the initial scan.
    pub persistent: bool,
    /// Channel capacity.
    pub capacity: usize,
}

impl WatchOptions {
    pub fn new(tools_root: impl Into<PathBuf>) -> Self {
        Self {
            tools_root: tools_root.into(),
            pattern: crate::HANDLER_GLOB.to_string(),
            middleware: None,
            persistent: false,
            capacity: 256,
        }
    }

    pub fn middleware(mut self, path: impl Into<PathBuf>) -> Self {
        self.middleware = Some(path.into());
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }
}

/// Decides which paths are handler files.
#[derive(Debug, Clone)]
pub struct HandlerMatcher {
    root: PathBuf,
    globs: Override,
}

impl HandlerMatcher {
    pub fn new(root: impl Into<PathBuf>, pattern: &str) -> Result<Self> {
        let root = root.into();
        let globs = OverrideBuilder::new(&root)
            .add(pattern)
            .and_then(|builder| builder.build())
            .map_err(|e| Error::watch_setup(&root, format!("invalid pattern '{pattern}': {e}")))?;
        Ok(Self { root, globs })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True for paths under the root whose relative path matches the glob and
    /// has no hidden component.
    pub fn is_match(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };
        if relative.as_os_str().is_empty() || has_hidden_component(relative) {
            return false;
        }
        self.globs.matched(relative, false).is_whitelist()
    }

    /// True for visible paths strictly below the root, i.e. anything that may
    /// be a directory holding handlers.
    pub fn is_below_root(&self, path: &Path) -> bool {
        path.strip_prefix(&self.root)
            .is_ok_and(|relative| !relative.as_os_str().is_empty() && !has_hidden_component(relative))
    }
}

fn has_hidden_component(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(name) => is_hidden(name),
        _ => false,
    })
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|s| s.starts_with('.'))
}

/// Channel end shared by the scan thread and the notify callback.
struct EventSink {
    tx: mpsc::Sender<WatchEvent>,
    gate: Mutex<Gate>,
}

#[derive(Default)]
struct Gate {
    open: bool,
    pending: Vec<WatchEvent>,
    /// Paths reported as added and not yet removed.
    known: BTreeSet<PathBuf>,
}

impl Gate {
    /// Reconcile raw events with what has been reported so far.
    ///
    /// A repeated add is dropped. A removal of a path that was never reported
    /// stands for a directory and expands to every known path below it.
    fn track(&mut self, events: Vec<WatchEvent>) -> Vec<WatchEvent> {
        let mut out = Vec::with_capacity(events.len());
        for event in events {
            match event {
                WatchEvent::Added(path) => {
                    if self.known.insert(path.clone()) {
                        out.push(WatchEvent::Added(path));
                    }
                }
                WatchEvent::Removed(path) => {
                    if self.known.remove(&path) {
                        out.push(WatchEvent::Removed(path));
                        continue;
                    }
                    let nested: Vec<PathBuf> = self
                        .known
                        .iter()
                        .filter(|known| known.starts_with(&path))
                        .cloned()
                        .collect();
                    for known in nested {
                        self.known.remove(&known);
                        out.push(WatchEvent::Removed(known));
                    }
                }
                WatchEvent::InitialScanComplete => out.push(event),
            }
        }
        out
    }
}

impl EventSink {
    fn forward(&self, events: Vec<WatchEvent>) {
        if events.is_empty() {
            return;
        }
        let mut gate = self.gate.lock();
        if gate.open {
            let events = gate.track(events);
            self.send_all(events);
        } else {
            gate.pending.extend(events);
        }
    }

    /// Send the scan results, any held-back live events, then the completion marker.
    fn finish_scan(&self, scanned: Vec<WatchEvent>) {
        let mut gate = self.gate.lock();
        let mut events = scanned;
        events.append(&mut gate.pending);
        let events = gate.track(events);
        self.send_all(events);
        self.send_all(vec![WatchEvent::InitialScanComplete]);
        gate.open = true;
    }

    fn send_all(&self, events: Vec<WatchEvent>) {
        for event in events {
            if self.tx.blocking_send(event).is_err() {
                // Receiver gone; the run is shutting down.
                return;
            }
        }
    }
}

/// Keeps the OS watcher alive. Dropping it stops watching.
pub struct WatchHandle {
    watcher: Option<RecommendedWatcher>,
}

impl WatchHandle {
    pub fn is_persistent(&self) -> bool {
        self.watcher.is_some()
    }

    /// Detach the OS watcher. The event channel closes once the scan is done.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            tracing::debug!("file watcher stopped");
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.watcher.take();
    }
}

/// Handler file watcher.
pub struct PathWatcher {
    options: WatchOptions,
}

impl PathWatcher {
    pub fn new(options: WatchOptions) -> Self {
        Self { options }
    }

    /// Validate the root, attach the OS watcher (persistent mode only) and start
    /// the initial scan on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WatchSetup`] before any event is produced if the root is
    /// missing, not a directory, unreadable, or cannot be watched.
    pub fn spawn(self) -> Result<(WatchHandle, mpsc::Receiver<WatchEvent>)> {
        let WatchOptions {
            tools_root,
            pattern,
            middleware,
            persistent,
            capacity,
        } = self.options;

        check_root(&tools_root)?;
        let matcher = HandlerMatcher::new(&tools_root, &pattern)?;

        let (tx, rx) = mpsc::channel(capacity);
        let sink = Arc::new(EventSink {
            tx,
            gate: Mutex::new(Gate::default()),
        });

        let watcher = if persistent {
            Some(attach_watcher(&matcher, middleware.as_deref(), Arc::clone(&sink))?)
        } else {
            None
        };

        // Detached: the thread ends once the scan is sent or the receiver is gone.
        std::thread::Builder::new()
            .name("quiver-scan".to_string())
            .spawn(move || {
                let events = initial_scan(&matcher, middleware.as_deref());
                tracing::debug!(count = events.len(), "initial scan finished");
                sink.finish_scan(events);
            })
            .map_err(|e| Error::watch_setup(&tools_root, e))?;

        Ok((WatchHandle { watcher }, rx))
    }
}

/// Fails unless `root` is a readable directory.
pub(crate) fn check_root(root: &Path) -> Result<()> {
    let metadata = std::fs::metadata(root).map_err(|e| Error::watch_setup(root, e))?;
    if !metadata.is_dir() {
        return Err(Error::watch_setup(root, "not a directory"));
    }
    std::fs::read_dir(root).map_err(|e| Error::watch_setup(root, e))?;
    Ok(())
}

fn attach_watcher(
    matcher: &HandlerMatcher,
    middleware: Option<&Path>,
    sink: Arc<EventSink>,
) -> Result<RecommendedWatcher> {
    let callback_matcher = matcher.clone();
    let callback_middleware = middleware.map(Path::to_path_buf);

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let events = translate(&event, &callback_matcher, callback_middleware.as_deref());
            sink.forward(events);
        }
        Err(e) => tracing::warn!("file watcher error: {}", e),
    })
    .map_err(|e| Error::watch_setup(matcher.root(), e))?;

    watcher
        .watch(matcher.root(), RecursiveMode::Recursive)
        .map_err(|e| Error::watch_setup(matcher.root(), e))?;

    if let Some(parent) = middleware.and_then(Path::parent) {
        if parent.is_dir() && !parent.starts_with(matcher.root()) {
            watcher
                .watch(parent, RecursiveMode::NonRecursive)
                .map_err(|e| Error::watch_setup(parent, e))?;
        } else if !parent.is_dir() {
            tracing::debug!(
                dir = %parent.display(),
                "middleware directory missing, middleware changes will not be watched"
            );
        }
    }

    Ok(watcher)
}

/// Every pre-existing handler (sorted), then the interceptor if present.
fn initial_scan(matcher: &HandlerMatcher, middleware: Option<&Path>) -> Vec<WatchEvent> {
    let mut events: Vec<WatchEvent> = collect_matches(matcher.root(), matcher)
        .into_iter()
        .map(WatchEvent::Added)
        .collect();

    if let Some(middleware) = middleware.filter(|p| p.is_file()) {
        events.push(WatchEvent::Added(middleware.to_path_buf()));
    }

    events
}

fn collect_matches(dir: &Path, matcher: &HandlerMatcher) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("skipping unreadable entry during scan: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| matcher.is_match(path))
        .collect()
}

/// Map one notify event to membership changes.
fn translate(event: &Event, matcher: &HandlerMatcher, middleware: Option<&Path>) -> Vec<WatchEvent> {
    let relevant = |path: &Path| middleware == Some(path) || matcher.is_match(path);

    let added = |path: &Path| -> Vec<WatchEvent> {
        if path.is_dir() {
            // A directory moved or copied in arrives as a single create.
            collect_matches(path, matcher)
                .into_iter()
                .map(WatchEvent::Added)
                .collect()
        } else if relevant(path) {
            vec![WatchEvent::Added(path.to_path_buf())]
        } else {
            Vec::new()
        }
    };

    // A vanished path cannot be inspected, so anything below the root may be a
    // directory. The sink expands it against the handlers it has reported.
    let removed = |path: &Path| -> Vec<WatchEvent> {
        if relevant(path) || matcher.is_below_root(path) {
            vec![WatchEvent::Removed(path.to_path_buf())]
        } else {
            Vec::new()
        }
    };

    match event.kind {
        EventKind::Create(_) => event.paths.iter().flat_map(|p| added(p)).collect(),
        EventKind::Remove(_) => event.paths.iter().flat_map(|p| removed(p)).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match (mode, event.paths.as_slice()) {
            (RenameMode::Both, [from, to]) => {
                let mut events = removed(from);
                events.extend(added(to));
                events
            }
            (RenameMode::From, paths) => paths.iter().flat_map(|p| removed(p)).collect(),
            (RenameMode::To, paths) => paths.iter().flat_map(|p| added(p)).collect(),
            (_, paths) => paths
                .iter()
                .flat_map(|p| if p.exists() { added(p) } else { removed(p) })
                .collect(),
        },
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, RemoveKind};
    use std::fs;
    use tempfile::TempDir;

    fn matcher(root: &Path) -> HandlerMatcher {
        HandlerMatcher::new(root, "**/*.ts").unwrap()
    }

    fn event(kind: EventKind, paths: &[&Path]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(path.to_path_buf()))
    }

    #[test]
    fn test_matcher_accepts_nested_handlers() {
        let m = matcher(Path::new("/project/src/tools"));
        assert!(m.is_match(Path::new("/project/src/tools/greet.ts")));
        assert!(m.is_match(Path::new("/project/src/tools/math/add.ts")));
    }

    #[test]
    fn test_matcher_rejects_other_files() {
        let m = matcher(Path::new("/project/src/tools"));
        assert!(!m.is_match(Path::new("/project/src/tools/readme.md")));
        assert!(!m.is_match(Path::new("/project/src/other.ts")));
        assert!(!m.is_match(Path::new("/project/src/tools")));
    }

    #[test]
    fn test_matcher_ignores_hidden_components() {
        let m = matcher(Path::new("/project/src/tools"));
        assert!(!m.is_match(Path::new("/project/src/tools/.draft.ts")));
        assert!(!m.is_match(Path::new("/project/src/tools/.cache/a.ts")));
    }

    #[test]
    fn test_invalid_pattern_is_setup_error() {
        let err = HandlerMatcher::new("/project", "{unclosed").unwrap_err();
        assert!(matches!(err, Error::WatchSetup { .. }));
    }

    #[test]
    fn test_translate_create_and_remove() {
        let m = matcher(Path::new("/project/src/tools"));
        let path = Path::new("/project/src/tools/a.ts");

        let created = translate(&event(EventKind::Create(CreateKind::File), &[path]), &m, None);
        assert_eq!(created, vec![WatchEvent::Added(path.to_path_buf())]);

        let removed = translate(&event(EventKind::Remove(RemoveKind::File), &[path]), &m, None);
        assert_eq!(removed, vec![WatchEvent::Removed(path.to_path_buf())]);
    }

    #[test]
    fn test_translate_ignores_content_changes() {
        let m = matcher(Path::new("/project/src/tools"));
        let path = Path::new("/project/src/tools/a.ts");
        let kind = EventKind::Modify(ModifyKind::Data(DataChange::Content));

        assert!(translate(&event(kind, &[path]), &m, None).is_empty());
    }

    #[test]
    fn test_translate_rename_both() {
        let m = matcher(Path::new("/project/src/tools"));
        let from = Path::new("/project/src/tools/old.ts");
        let to = Path::new("/project/src/tools/new.ts");
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::Both));

        let events = translate(&event(kind, &[from, to]), &m, None);
        assert_eq!(
            events,
            vec![
                WatchEvent::Removed(from.to_path_buf()),
                WatchEvent::Added(to.to_path_buf()),
            ]
        );
    }

    #[test]
    fn test_translate_middleware_by_exact_path() {
        let m = matcher(Path::new("/project/src/tools"));
        let middleware = Path::new("/project/src/middleware.ts");
        let other = Path::new("/project/src/index.ts");

        let events = translate(
            &event(EventKind::Create(CreateKind::File), &[middleware, other]),
            &m,
            Some(middleware),
        );
        assert_eq!(events, vec![WatchEvent::Added(middleware.to_path_buf())]);
    }

    #[test]
    fn test_initial_scan_is_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::create_dir_all(root.join(".hidden")).unwrap();
        fs::write(root.join("b.ts"), "").unwrap();
        fs::write(root.join("a.ts"), "").unwrap();
        fs::write(root.join("nested/c.ts"), "").unwrap();
        fs::write(root.join("notes.md"), "").unwrap();
        fs::write(root.join(".hidden/d.ts"), "").unwrap();

        let events = initial_scan(&matcher(root), None);

        assert_eq!(
            events,
            vec![
                WatchEvent::Added(root.join("a.ts")),
                WatchEvent::Added(root.join("b.ts")),
                WatchEvent::Added(root.join("nested/c.ts")),
            ]
        );
    }

    #[test]
    fn test_gate_holds_live_events_until_scan_finishes() {
        let (tx, mut rx) = mpsc::channel(16);
        let sink = EventSink {
            tx,
            gate: Mutex::new(Gate::default()),
        };

        sink.forward(vec![WatchEvent::Removed(PathBuf::from("/t/a.ts"))]);
        assert!(rx.try_recv().is_err());

        sink.finish_scan(vec![WatchEvent::Added(PathBuf::from("/t/a.ts"))]);
        sink.forward(vec![WatchEvent::Added(PathBuf::from("/t/b.ts"))]);

        assert_eq!(rx.try_recv().unwrap(), WatchEvent::Added(PathBuf::from("/t/a.ts")));
        assert_eq!(rx.try_recv().unwrap(), WatchEvent::Removed(PathBuf::from("/t/a.ts")));
        assert_eq!(rx.try_recv().unwrap(), WatchEvent::InitialScanComplete);
        assert_eq!(rx.try_recv().unwrap(), WatchEvent::Added(PathBuf::from("/t/b.ts")));
    }

    #[test]
    fn test_translate_removed_directory_is_passed_on() {
        let m = matcher(Path::new("/project/src/tools"));
        let dir = Path::new("/project/src/tools/math");
        let kind = EventKind::Modify(ModifyKind::Name(RenameMode::From));

        let events = translate(&event(kind, &[dir]), &m, None);
        assert_eq!(events, vec![WatchEvent::Removed(dir.to_path_buf())]);

        let hidden = Path::new("/project/src/tools/.cache");
        assert!(translate(&event(EventKind::Remove(RemoveKind::Folder), &[hidden]), &m, None).is_empty());
    }

    #[test]
    fn test_gate_expands_directory_removal() {
        let mut gate = Gate::default();
        gate.track(vec![
            WatchEvent::Added(PathBuf::from("/t/math/add.ts")),
            WatchEvent::Added(PathBuf::from("/t/math/sub.ts")),
            WatchEvent::Added(PathBuf::from("/t/mathematics.ts")),
        ]);

        let events = gate.track(vec![WatchEvent::Removed(PathBuf::from("/t/math"))]);
        assert_eq!(
            events,
            vec![
                WatchEvent::Removed(PathBuf::from("/t/math/add.ts")),
                WatchEvent::Removed(PathBuf::from("/t/math/sub.ts")),
            ]
        );
        assert!(gate.known.contains(Path::new("/t/mathematics.ts")));
    }

    #[test]
    fn test_gate_drops_repeated_adds_and_unknown_removals() {
        let mut gate = Gate::default();
        let a = PathBuf::from("/t/a.ts");

        let events = gate.track(vec![
            WatchEvent::Added(a.clone()),
            WatchEvent::Added(a.clone()),
            WatchEvent::Removed(PathBuf::from("/t/notes.md")),
            WatchEvent::Removed(a.clone()),
            WatchEvent::Added(a.clone()),
        ]);
        assert_eq!(
            events,
            vec![
                WatchEvent::Added(a.clone()),
                WatchEvent::Removed(a.clone()),
                WatchEvent::Added(a),
            ]
        );
    }
}
