//! Refresh cache
//!
//! A background thread polls the server and swaps fresh data in; readers
//! always see one complete pass.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Local;
use crossbeam::channel;
use parking_lot::{Mutex, RwLock};

use super::snapshot::Snapshot;
use super::{JailSnapshot, RefreshState, StoreStatus};
use crate::client::JailSource;
use crate::config::Config;
use crate::error::{JailwatchError, Result};

/// Callback fired after every successful refresh pass
pub type UpdateHandler = Arc<dyn Fn(&Store) + Send + Sync + 'static>;

/// Cache of jail data refreshed from a [`JailSource`]
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader
///
/// - **Writer**: the refresh thread. It fetches with no lock held, then takes
///   the write lock only to swap both maps at once.
/// - **Readers**: `get_jails` / `get_jail_by_name` take the read lock and copy
///   out what they need.
///
/// `Store` is a cheap handle; clones share the same cache.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Shared>,
}

struct Shared {
    source: Arc<dyn JailSource>,
    interval: Duration,
    start_delay: Duration,

    data: RwLock<Snapshot>,
    handlers: RwLock<Vec<UpdateHandler>>,
    status: Mutex<StoreStatus>,

    /// Held for the duration of a pass; at most one pass runs at a time
    refresh_lock: Mutex<()>,
    started: AtomicBool,
    /// Set once the refresh loop has ended; written under the status lock
    stopped: AtomicBool,
}

impl Shared {
    /// State a pass settles in once it is done
    fn resting_state(&self) -> RefreshState {
        if self.stopped.load(Ordering::SeqCst) {
            RefreshState::Stopped
        } else {
            RefreshState::Idle
        }
    }

    fn mark_stopped(&self) {
        let mut status = self.status.lock();
        self.stopped.store(true, Ordering::SeqCst);
        status.state = RefreshState::Stopped;
    }
}

impl Store {
    /// Bind a source; the refresh loop is not started
    pub fn new(source: Arc<dyn JailSource>, interval: Duration, start_delay: Duration) -> Self {
        Self {
            inner: Arc::new(Shared {
                source,
                interval,
                start_delay,
                data: RwLock::new(Snapshot::default()),
                handlers: RwLock::new(Vec::new()),
                status: Mutex::new(StoreStatus::default()),
                refresh_lock: Mutex::new(()),
                started: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Bind a source with the refresh interval and start delay from `config`
    pub fn from_config(source: Arc<dyn JailSource>, config: &Config) -> Self {
        Self::new(source, config.refresh_interval(), config.start_delay())
    }

    /// Spawn the refresh thread.
    ///
    /// The first pass runs after the start delay, later passes on every tick
    /// of the interval. The first failed pass ends the thread for good; the
    /// last good data stays readable.
    pub fn start(&self) -> Result<JoinHandle<()>> {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            return Err(JailwatchError::AlreadyStarted);
        }

        let shared = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("jail-refresh".to_string())
            .spawn(move || run_loop(shared))
            .map_err(|e| {
                self.inner.started.store(false, Ordering::SeqCst);
                JailwatchError::Spawn(e)
            })
    }

    /// Run one refresh pass now.
    ///
    /// On error nothing is committed and the previous data stays visible.
    /// Once the refresh loop has stopped, manual passes still run but the
    /// state stays `Stopped`.
    pub fn refresh(&self) -> Result<()> {
        refresh_pass(&self.inner, false)
    }

    /// All jails sorted by name
    pub fn get_jails(&self) -> Vec<JailSnapshot> {
        self.inner.data.read().jails()
    }

    pub fn get_jail_by_name(&self, name: &str) -> Option<JailSnapshot> {
        self.inner.data.read().jail(name)
    }

    /// Register a callback fired after each successful pass.
    ///
    /// Every handler runs on its own thread; handlers are not ordered relative
    /// to each other or to the next pass.
    pub fn register_update_handler<F>(&self, handler: F)
    where
        F: Fn(&Store) + Send + Sync + 'static,
    {
        self.inner.handlers.write().push(Arc::new(handler));
    }

    /// Refresh state, time of the last good pass, and the last error
    pub fn status(&self) -> StoreStatus {
        self.inner.status.lock().clone()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.inner.interval
    }
}

// =============================================================================
// Refresh loop
// =============================================================================

fn run_loop(shared: Arc<Shared>) {
    tracing::debug!(
        "Refresh loop starting in {:?}, interval {:?}",
        shared.start_delay,
        shared.interval
    );
    thread::sleep(shared.start_delay);

    let ticker = channel::tick(shared.interval);
    loop {
        if let Err(e) = refresh_pass(&shared, true) {
            tracing::error!("Refreshing fail2ban data failed, stopping refresh loop: {}", e);
            break;
        }
        if ticker.recv().is_err() {
            break;
        }
    }

    shared.mark_stopped();
}

/// One pass. With `last_on_error`, a failure stops the loop in the same
/// status update that records the error.
fn refresh_pass(shared: &Arc<Shared>, last_on_error: bool) -> Result<()> {
    let _pass = shared.refresh_lock.lock();
    {
        let mut status = shared.status.lock();
        if status.state != RefreshState::Stopped {
            status.state = RefreshState::Refreshing;
        }
    }
    tracing::debug!("Fetching fail2ban data");

    let fetched = fetch(shared.source.as_ref());

    let snapshot = match fetched {
        Ok(snapshot) => snapshot,
        Err(e) => {
            let mut status = shared.status.lock();
            if last_on_error {
                shared.stopped.store(true, Ordering::SeqCst);
            }
            status.state = shared.resting_state();
            status.last_error = Some(e.to_string());
            return Err(e);
        }
    };

    let jail_count = snapshot.banned.len();
    let previous = std::mem::replace(&mut *shared.data.write(), snapshot);
    drop(previous);

    {
        let mut status = shared.status.lock();
        status.state = shared.resting_state();
        status.last_refresh = Some(Local::now());
        status.last_error = None;
    }
    tracing::debug!("Refreshed data for {} jails", jail_count);

    notify(shared);
    Ok(())
}

/// Fetch every jail; the first error abandons the whole pass
fn fetch(source: &dyn JailSource) -> Result<Snapshot> {
    let names = source.jail_names()?;

    let mut banned = HashMap::with_capacity(names.len());
    let mut infos = HashMap::with_capacity(names.len());
    for name in names {
        let entries = source.banned(&name)?;
        let info = source.jail_info(&name)?;
        banned.insert(name.clone(), entries);
        infos.insert(name, info);
    }

    Ok(Snapshot { banned, infos })
}

fn notify(shared: &Arc<Shared>) {
    let handlers = shared.handlers.read().clone();
    for handler in handlers {
        let store = Store {
            inner: Arc::clone(shared),
        };
        let spawned = thread::Builder::new()
            .name("jail-update".to_string())
            .spawn(move || handler(&store));
        if let Err(e) = spawned {
            tracing::warn!("Could not spawn update handler: {}", e);
        }
    }
}
