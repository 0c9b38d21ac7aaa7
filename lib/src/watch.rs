//! Filesystem watching with rebuild coalescing.
//!
//! Changes that arrive while a build is running are folded into a
//! single follow-up build, so a burst of editor saves produces at most
//! one extra rebuild. The watch set is recomputed after every build
//! since a config change can add or remove watched paths.

use std::path::PathBuf;
use std::sync::mpsc;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use crate::error::{Chainable, Result};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
enum State {
    #[default]
    Idle,
    Building,
    Scheduled,
}

/// Tracks whether a change should trigger a build now or be deferred
/// until the in-flight build completes.
#[derive(Debug, Default)]
pub struct Schedule {
    state: State,
}

impl Schedule {
    /// Records a change. Returns `true` when a build should start
    /// immediately. Changes during a build collapse into one pending
    /// follow-up regardless of how many arrive.
    pub fn on_change(&mut self) -> bool {
        match self.state {
            State::Idle => {
                self.state = State::Building;
                true
            }
            State::Building | State::Scheduled => {
                self.state = State::Scheduled;
                false
            }
        }
    }

    /// Marks the running build as finished. Returns `true` when a
    /// change arrived mid-build and another build should start.
    pub fn on_build_complete(&mut self) -> bool {
        match self.state {
            State::Scheduled => {
                self.state = State::Building;
                true
            }
            State::Building | State::Idle => {
                self.state = State::Idle;
                false
            }
        }
    }
}

/// Watches `initial` and runs `rebuild` on every coalesced change. The
/// closure returns the paths to watch from then on. A failed rebuild
/// is reported and watching continues with the previous watch set;
/// only a broken watcher channel ends the loop.
pub fn watch<F>(initial: Vec<PathBuf>, mut rebuild: F) -> Result<()>
where
    F: FnMut() -> Result<Vec<PathBuf>>,
{
    let (tx, rx) = mpsc::channel();
    let mut watcher = watcher_for(tx.clone(), &initial)?;
    let mut schedule = Schedule::default();

    tracing::info!(paths = initial.len(), "watching for changes");

    loop {
        let event = rx.recv()
            .chain_with(|| error!("the filesystem watcher hung up"))?;

        if !is_relevant(&event) || !schedule.on_change() {
            continue;
        }

        loop {
            // Absorb anything already queued before building so one
            // burst of events becomes one build.
            while let Ok(event) = rx.try_recv() {
                if is_relevant(&event) {
                    schedule.on_change();
                }
            }

            tracing::info!("change detected, rebuilding");
            match rebuild() {
                // Register the replacement before the old watcher goes
                // away so no change can land unobserved in between.
                Ok(paths) => watcher = watcher_for(tx.clone(), &paths)?,
                Err(e) => tracing::error!("rebuild failed\n{}", e),
            }

            if !schedule.on_build_complete() {
                break;
            }
        }
    }
}

fn is_relevant(event: &notify::Result<notify::Event>) -> bool {
    match event {
        Ok(event) => !matches!(event.kind, EventKind::Access(_)),
        Err(e) => {
            tracing::warn!("filesystem watch error: {}", e);
            false
        }
    }
}

fn watcher_for(
    tx: mpsc::Sender<notify::Result<notify::Event>>,
    paths: &[PathBuf],
) -> Result<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |event| { let _ = tx.send(event); })
        .chain_with(|| error!("couldn't start the filesystem watcher"))?;

    for path in paths {
        let mode = match path.is_dir() {
            true => RecursiveMode::Recursive,
            false => RecursiveMode::NonRecursive,
        };

        watcher.watch(path, mode)
            .chain_with(|| error!("couldn't watch a path", "path" => path.display()))?;
    }

    Ok(watcher)
}
