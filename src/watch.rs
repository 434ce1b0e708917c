//! Watch mode for automatic rebuilds on file changes
//!
//! Provides file system watching with debouncing for the `bindle watch`
//! command. A small state machine ([`Scheduler`]) decides when a rebuild
//! runs: changes arriving inside the debounce window coalesce into one
//! cycle, changes arriving during a rebuild queue up for the next one,
//! and untracked paths never trigger anything.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use thiserror::Error;

use crate::pipeline::{is_relevant_change, BuildPipeline};
use crate::report::BuildReport;

/// Upper bound on queued change paths. Beyond this the set only coalesces
/// into "something changed", which is all a rebuild needs.
const MAX_PENDING: usize = 1024;

/// Error during watch mode
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(notify::Error),
    /// Channel receive error
    #[error("Watch channel error: {0}")]
    Channel(String),
    /// Source directory not found
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
}

/// Lifecycle of the rebuild scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Not started
    Idle,
    /// Waiting for changes
    Watching,
    /// Changes queued, rebuild not yet started
    Invalidated,
    /// A rebuild is running
    Rebuilding,
    /// Last rebuild failed; still watching for a fix
    Failed,
}

/// What happened when a rebuild finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildDisposition {
    /// Result committed, back to watching
    Committed,
    /// Result committed but the build reported errors
    Failed,
    /// Changes arrived mid-rebuild; the result is already stale and a
    /// fresh cycle should start immediately
    Stale,
}

/// Pure rebuild scheduling state machine.
///
/// Keeps no clocks and does no I/O; the watch loop feeds it events and
/// asks it what to do. That keeps the coalescing and staleness rules
/// testable without a real filesystem watcher.
#[derive(Debug)]
pub struct Scheduler {
    state: SchedulerState,
    pending: BTreeSet<PathBuf>,
    dropped: usize,
}

impl Scheduler {
    /// Create a scheduler in the idle state.
    pub fn new() -> Self {
        Self { state: SchedulerState::Idle, pending: BTreeSet::new(), dropped: 0 }
    }

    /// Current state.
    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of queued change paths.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Changes dropped because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Transition from idle to watching.
    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle {
            self.state = SchedulerState::Watching;
        }
    }

    /// Record a change event. Untracked paths are ignored entirely;
    /// tracked ones queue up and mark the build invalidated (or, during a
    /// rebuild, mark its result stale). Returns whether the path was
    /// accepted.
    pub fn note_change(&mut self, path: PathBuf, tracked: bool) -> bool {
        if !tracked || self.state == SchedulerState::Idle {
            return false;
        }

        if self.pending.len() >= MAX_PENDING && !self.pending.contains(&path) {
            self.dropped += 1;
        } else {
            self.pending.insert(path);
        }

        if matches!(self.state, SchedulerState::Watching | SchedulerState::Failed) {
            self.state = SchedulerState::Invalidated;
        }
        true
    }

    /// Start a rebuild, draining the queued changes into it.
    ///
    /// Returns `None` unless the scheduler is invalidated.
    pub fn begin_rebuild(&mut self) -> Option<Vec<PathBuf>> {
        if self.state != SchedulerState::Invalidated {
            return None;
        }
        self.state = SchedulerState::Rebuilding;
        self.dropped = 0;
        Some(std::mem::take(&mut self.pending).into_iter().collect())
    }

    /// Record the end of a rebuild.
    ///
    /// If changes arrived while it ran, the result is stale and the
    /// scheduler goes straight back to invalidated so the loop reruns.
    pub fn finish_rebuild(&mut self, success: bool) -> RebuildDisposition {
        if !self.pending.is_empty() {
            self.state = SchedulerState::Invalidated;
            return RebuildDisposition::Stale;
        }
        if success {
            self.state = SchedulerState::Watching;
            RebuildDisposition::Committed
        } else {
            self.state = SchedulerState::Failed;
            RebuildDisposition::Failed
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks files whose build failures persist across cycles, to report
/// recoveries.
#[derive(Debug, Default)]
pub struct FailureTracker {
    failing: BTreeSet<PathBuf>,
}

impl FailureTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Update with a new report, returning the files that recovered.
    pub fn update(&mut self, report: &BuildReport) -> Vec<PathBuf> {
        let current: BTreeSet<PathBuf> =
            report.failures.iter().map(|f| f.path.clone()).collect();
        let fixed: Vec<PathBuf> = self.failing.difference(&current).cloned().collect();
        self.failing = current;
        fixed
    }

    /// Whether any file is still failing.
    pub fn has_failures(&self) -> bool {
        !self.failing.is_empty()
    }
}

/// Cheap per-file content fingerprints for the watch loop.
///
/// FNV-1a over the file bytes; enough to tell "editor saved the same
/// bytes again" apart from a real change without re-running a build.
#[derive(Debug, Default)]
pub struct WatchState {
    fingerprints: HashMap<PathBuf, u64>,
}

impl WatchState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record fingerprints for the given files, skipping unreadable ones.
    pub fn refresh(&mut self, paths: &[PathBuf]) {
        self.fingerprints.clear();
        for path in paths {
            if let Ok(bytes) = std::fs::read(path) {
                self.fingerprints.insert(path.clone(), fnv1a_hash(&bytes));
            }
        }
    }

    /// Whether the file's current content differs from the recorded
    /// fingerprint. Unknown or unreadable paths count as changed.
    pub fn has_changed(&self, path: &Path) -> bool {
        match (self.fingerprints.get(path), std::fs::read(path)) {
            (Some(&recorded), Ok(bytes)) => fnv1a_hash(&bytes) != recorded,
            _ => true,
        }
    }
}

/// FNV-1a hash of a byte slice.
fn fnv1a_hash(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Clear the terminal screen
fn clear_screen() {
    // ANSI escape code to clear screen and move cursor to top-left
    print!("\x1B[2J\x1B[1;1H");
}

/// Format duration for display
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400; // seconds since midnight
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Print a build report to the console, with recovery notifications.
fn print_report(report: &BuildReport, fixed: &[PathBuf]) {
    for path in fixed {
        if let Some(name) = path.file_name() {
            println!("[{}] Fixed: {}", timestamp(), name.to_string_lossy());
        }
    }

    if report.is_success() {
        println!("[{}] {}", timestamp(), report.summary());
    } else {
        println!(
            "[{}] Build failed ({}) - {} error{}",
            timestamp(),
            format_duration(report.duration),
            report.failures.len(),
            if report.failures.len() == 1 { "" } else { "s" }
        );
        for failure in &report.failures {
            eprintln!("[{}] Error: {}", timestamp(), failure);
        }
    }

    for warning in &report.warnings {
        eprintln!("[{}] Warning: {}", timestamp(), warning);
    }
}

/// Watch the project and rebuild on changes.
///
/// Blocks until the event channel closes or the watcher cannot be set
/// up. Failed builds keep watching; the next change may fix them.
pub fn watch_and_rebuild(mut pipeline: BuildPipeline) -> Result<(), WatchError> {
    let src_dir = pipeline.context().src_dir();
    if !src_dir.exists() {
        return Err(WatchError::SourceNotFound(src_dir));
    }

    let watch_config = pipeline.context().config.watch;
    let project_root = pipeline.context().project_root.clone();

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(watch_config.debounce_ms);
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer
        .watcher()
        .watch(&project_root, RecursiveMode::Recursive)
        .map_err(WatchError::WatchPath)?;

    let mut scheduler = Scheduler::new();
    let mut tracker = FailureTracker::new();
    let mut state = WatchState::new();
    scheduler.start();

    // Initial build
    if watch_config.clear_screen {
        clear_screen();
    }
    println!("[{}] Building...", timestamp());
    match pipeline.build() {
        Ok(report) => {
            let fixed = tracker.update(&report);
            print_report(&report, &fixed);
        }
        Err(e) => {
            // Fatal for a one-shot build, recoverable here
            eprintln!("[{}] Error: {}", timestamp(), e);
        }
    }
    state.refresh(&pipeline.tracked_paths());
    println!("[{}] Watching {} for changes...", timestamp(), src_dir.display());

    // Watch loop
    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                let out_dir = pipeline.context().out_dir();
                let tracked = pipeline.tracked_paths();
                for event in
                    events.iter().filter(|e| matches!(e.kind, DebouncedEventKind::Any))
                {
                    // Never rebuild because of our own output.
                    if event.path.starts_with(&out_dir) {
                        continue;
                    }
                    let relevant = is_relevant_change(&event.path, &src_dir, &tracked)
                        && state.has_changed(&event.path);
                    if scheduler.note_change(event.path.clone(), relevant) {
                        if let Some(name) = event.path.file_name() {
                            println!("[{}] Changed: {}", timestamp(), name.to_string_lossy());
                        }
                    }
                }

                while let Some(changed) = scheduler.begin_rebuild() {
                    if watch_config.clear_screen {
                        clear_screen();
                    }
                    println!("[{}] Building...", timestamp());

                    let success = match pipeline.rebuild(&changed) {
                        Ok(report) => {
                            let fixed = tracker.update(&report);
                            print_report(&report, &fixed);
                            report.is_success()
                        }
                        Err(e) => {
                            eprintln!("[{}] Error: {}", timestamp(), e);
                            false
                        }
                    };
                    state.refresh(&pipeline.tracked_paths());

                    match scheduler.finish_rebuild(success) {
                        RebuildDisposition::Stale => {
                            println!("[{}] Changes during build, rebuilding...", timestamp());
                        }
                        _ => {
                            println!(
                                "[{}] Watching {} for changes...",
                                timestamp(),
                                src_dir.display()
                            );
                        }
                    }
                }
            }
            Ok(Err(error)) => {
                // Watch error (non-fatal) - log but continue watching
                eprintln!("[{}] Watch error: {:?}", timestamp(), error);
                eprintln!("[{}] Continuing to watch...", timestamp());
            }
            Err(e) => {
                return Err(WatchError::Channel(e.to_string()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scheduler_starts_idle() {
        let scheduler = Scheduler::new();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn test_untracked_change_does_not_transition() {
        let mut scheduler = Scheduler::new();
        scheduler.start();

        assert!(!scheduler.note_change(PathBuf::from("/proj/README.md"), false));
        assert_eq!(scheduler.state(), SchedulerState::Watching);
        assert_eq!(scheduler.pending_len(), 0);
    }

    #[test]
    fn test_tracked_change_invalidates() {
        let mut scheduler = Scheduler::new();
        scheduler.start();

        assert!(scheduler.note_change(PathBuf::from("/proj/src/a.js"), true));
        assert_eq!(scheduler.state(), SchedulerState::Invalidated);
        assert_eq!(scheduler.pending_len(), 1);
    }

    #[test]
    fn test_changes_coalesce_into_one_rebuild() {
        let mut scheduler = Scheduler::new();
        scheduler.start();

        scheduler.note_change(PathBuf::from("/proj/src/a.js"), true);
        scheduler.note_change(PathBuf::from("/proj/src/b.js"), true);
        scheduler.note_change(PathBuf::from("/proj/src/a.js"), true);

        let changed = scheduler.begin_rebuild().expect("should be invalidated");
        // Duplicates collapsed, both files present, one rebuild.
        assert_eq!(changed.len(), 2);
        assert_eq!(scheduler.state(), SchedulerState::Rebuilding);
        assert!(scheduler.begin_rebuild().is_none());
    }

    #[test]
    fn test_quiet_rebuild_commits() {
        let mut scheduler = Scheduler::new();
        scheduler.start();
        scheduler.note_change(PathBuf::from("/proj/src/a.js"), true);
        scheduler.begin_rebuild().unwrap();

        assert_eq!(scheduler.finish_rebuild(true), RebuildDisposition::Committed);
        assert_eq!(scheduler.state(), SchedulerState::Watching);
    }

    #[test]
    fn test_change_during_rebuild_makes_result_stale() {
        let mut scheduler = Scheduler::new();
        scheduler.start();
        scheduler.note_change(PathBuf::from("/proj/src/a.js"), true);
        scheduler.begin_rebuild().unwrap();

        // Arrives while the rebuild is running.
        scheduler.note_change(PathBuf::from("/proj/src/b.js"), true);

        assert_eq!(scheduler.finish_rebuild(true), RebuildDisposition::Stale);
        assert_eq!(scheduler.state(), SchedulerState::Invalidated);
        let next = scheduler.begin_rebuild().unwrap();
        assert_eq!(next, vec![PathBuf::from("/proj/src/b.js")]);
    }

    #[test]
    fn test_failed_rebuild_keeps_watching() {
        let mut scheduler = Scheduler::new();
        scheduler.start();
        scheduler.note_change(PathBuf::from("/proj/src/a.js"), true);
        scheduler.begin_rebuild().unwrap();

        assert_eq!(scheduler.finish_rebuild(false), RebuildDisposition::Failed);
        assert_eq!(scheduler.state(), SchedulerState::Failed);

        // The fix comes in and triggers another cycle.
        assert!(scheduler.note_change(PathBuf::from("/proj/src/a.js"), true));
        assert_eq!(scheduler.state(), SchedulerState::Invalidated);
    }

    #[test]
    fn test_pending_queue_is_bounded() {
        let mut scheduler = Scheduler::new();
        scheduler.start();

        for i in 0..(MAX_PENDING + 10) {
            scheduler.note_change(PathBuf::from(format!("/proj/src/f{i}.js")), true);
        }
        assert_eq!(scheduler.pending_len(), MAX_PENDING);
        assert_eq!(scheduler.dropped(), 10);
        // Still invalidated; the overflow only loses path detail.
        assert_eq!(scheduler.state(), SchedulerState::Invalidated);
    }

    #[test]
    fn test_watch_state_detects_content_change() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "const a = 1;").unwrap();

        let mut state = WatchState::new();
        state.refresh(&[file.clone()]);
        assert!(!state.has_changed(&file));

        fs::write(&file, "const a = 2;").unwrap();
        assert!(state.has_changed(&file));
    }

    #[test]
    fn test_watch_state_same_bytes_not_changed() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "const a = 1;").unwrap();

        let mut state = WatchState::new();
        state.refresh(&[file.clone()]);
        // Rewrite with identical content, as editors do on save.
        fs::write(&file, "const a = 1;").unwrap();
        assert!(!state.has_changed(&file));
    }

    #[test]
    fn test_fnv1a_hash_differs() {
        assert_ne!(fnv1a_hash(b"a"), fnv1a_hash(b"b"));
        assert_eq!(fnv1a_hash(b"same"), fnv1a_hash(b"same"));
    }

    #[test]
    fn test_failure_tracker_detects_recovery() {
        use crate::report::{BuildFailure, FailureKind};

        let mut tracker = FailureTracker::new();
        let mut first = BuildReport::new();
        first.failures.push(BuildFailure::new("/src/a.js", FailureKind::Resolve, "missing"));
        assert!(tracker.update(&first).is_empty());
        assert!(tracker.has_failures());

        let second = BuildReport::new();
        let fixed = tracker.update(&second);
        assert_eq!(fixed, vec![PathBuf::from("/src/a.js")]);
        assert!(!tracker.has_failures());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(999)), "999ms");
        assert_eq!(format_duration(Duration::from_millis(1000)), "1.00s");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
    }
}
