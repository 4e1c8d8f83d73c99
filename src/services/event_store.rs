//! File-backed event store.
//!
//! The whole collection lives in memory behind one async mutex and is rewritten to disk after
//! every mutation. Writes happen while the lock is held, so snapshots never interleave and the
//! last write always reflects every mutation applied before it. A failed write is logged and
//! the in-memory state stays authoritative until the next restart.

use std::path::{Path, PathBuf};

use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};

use crate::error::EventError;
use crate::models::Event;

pub struct EventStore {
    path: PathBuf,
    events: Mutex<Vec<Event>>,
}

impl EventStore {
    /// Loads the snapshot at `path`. A missing or unreadable file yields an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let events = load_all(&path).await;
        Self {
            path,
            events: Mutex::new(events),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive access for check-then-act sequences. Hold the guard across the check and the
    /// write; nothing else can read or mutate the store meanwhile.
    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            path: &self.path,
            events: self.events.lock().await,
        }
    }

    /// Snapshot of every event, in insertion order.
    pub async fn all(&self) -> Vec<Event> {
        self.events.lock().await.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Event> {
        self.events.lock().await.iter().find(|e| e.id() == id).cloned()
    }

    pub async fn append(&self, event: Event) {
        self.lock().await.append(event).await;
    }

    /// Applies `f` to the event with `id` and persists. No-op (returns `None`) if absent.
    pub async fn mutate<T>(&self, id: &str, f: impl FnOnce(&mut Event) -> T) -> Option<T> {
        self.lock().await.mutate(id, f).await
    }

    /// Like `mutate`, but for fallible updates: a missing id is `EventNotFound`, and nothing is
    /// written when `f` fails.
    pub async fn try_mutate<T>(
        &self,
        id: &str,
        f: impl FnOnce(&mut Event) -> Result<T, EventError>,
    ) -> Result<T, EventError> {
        self.lock().await.try_mutate(id, f).await
    }

    pub async fn persist(&self) -> Result<(), EventError> {
        self.lock().await.persist().await
    }
}

pub struct StoreGuard<'a> {
    path: &'a Path,
    events: MutexGuard<'a, Vec<Event>>,
}

impl StoreGuard<'_> {
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.iter().find(|e| e.id() == id)
    }

    pub async fn append(&mut self, event: Event) {
        self.events.push(event);
        self.persist_logged().await;
    }

    pub async fn mutate<T>(&mut self, id: &str, f: impl FnOnce(&mut Event) -> T) -> Option<T> {
        let event = self.events.iter_mut().find(|e| e.id() == id)?;
        let out = f(event);
        self.persist_logged().await;
        Some(out)
    }

    pub async fn try_mutate<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Event) -> Result<T, EventError>,
    ) -> Result<T, EventError> {
        let event = self
            .events
            .iter_mut()
            .find(|e| e.id() == id)
            .ok_or_else(|| EventError::not_found(id))?;
        let out = f(event)?;
        self.persist_logged().await;
        Ok(out)
    }

    /// Applies `f` to every event and persists once if any call reported a change.
    pub async fn mutate_all(&mut self, mut f: impl FnMut(&mut Event) -> bool) -> usize {
        let changed = self.events.iter_mut().map(|e| f(e)).filter(|c| *c).count();
        if changed > 0 {
            self.persist_logged().await;
        }
        changed
    }

    /// Writes the full snapshot: serialize, write a sibling temp file, rename over the target.
    pub async fn persist(&self) -> Result<(), EventError> {
        let json = serde_json::to_vec_pretty(&*self.events).map_err(EventError::storage)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(EventError::storage)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(EventError::storage)?;
        tokio::fs::rename(&tmp, self.path)
            .await
            .map_err(EventError::storage)?;
        Ok(())
    }

    async fn persist_logged(&self) {
        if let Err(e) = self.persist().await {
            error!("Error saving events to {}: {}", self.path.display(), e);
        }
    }
}

async fn load_all(path: &Path) -> Vec<Event> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No data file at {}, starting empty", path.display());
            return Vec::new();
        }
        Err(e) => {
            error!("Error reading {}: {}", path.display(), e);
            return Vec::new();
        }
    };
    match serde_json::from_slice::<Vec<Event>>(&raw) {
        Ok(events) => {
            info!("Loaded {} events from {}", events.len(), path.display());
            events
        }
        Err(e) => {
            warn!("Error parsing {}: {}. Starting with an empty collection", path.display(), e);
            Vec::new()
        }
    }
}
