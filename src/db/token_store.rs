// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Durable key/value store for the session tokens and cached profile.
//!
//! The file-backed store keeps every entry in memory and rewrites the whole
//! JSON document atomically on each change. Changes are announced on a
//! broadcast channel so that other components can react to them, e.g. the
//! player map refetching when the signed-in email changes.

use crate::db::keys;
use crate::error::AppError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 32;

/// A single key changing value (or disappearing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

enum Backend {
    File {
        path: PathBuf,
        entries: Mutex<BTreeMap<String, String>>,
    },
    Memory(DashMap<String, String>),
}

struct Inner {
    backend: Backend,
    events: broadcast::Sender<StorageEvent>,
}

/// Durable key/value storage. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl TokenStore {
    /// Open (or create on first write) a JSON file store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let path = path.as_ref().to_path_buf();
        let entries = read_entries(&path)?;

        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened token store");

        Ok(Self::with_backend(Backend::File {
            path,
            entries: Mutex::new(entries),
        }))
    }

    /// Store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::with_backend(Backend::Memory(DashMap::new()))
    }

    fn with_backend(backend: Backend) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner { backend, events }),
        }
    }

    /// Subscribe to value changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.inner.events.subscribe()
    }

    // ─── Raw Access ──────────────────────────────────────────────

    pub fn get(&self, key: &str) -> Option<String> {
        match &self.inner.backend {
            Backend::File { entries, .. } => lock(entries).get(key).cloned(),
            Backend::Memory(map) => map.get(key).map(|v| v.value().clone()),
        }
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.update(&[(key, Some(value))])
    }

    pub fn remove(&self, key: &str) -> Result<(), AppError> {
        self.update(&[(key, None)])
    }

    /// Apply several changes with a single write.
    fn update(&self, changes: &[(&str, Option<&str>)]) -> Result<(), AppError> {
        let events = match &self.inner.backend {
            Backend::File { path, entries } => {
                let mut entries = lock(entries);
                let mut next = entries.clone();
                let events = apply(&mut next, changes);
                if !events.is_empty() {
                    write_entries(path, &next)?;
                    *entries = next;
                }
                events
            }
            Backend::Memory(map) => changes
                .iter()
                .filter_map(|(key, value)| {
                    let old_value = match value {
                        Some(v) => map.insert(key.to_string(), v.to_string()),
                        None => map.remove(*key).map(|(_, v)| v),
                    };
                    changed(key, old_value, value.map(str::to_string))
                })
                .collect(),
        };

        self.publish(events);
        Ok(())
    }

    /// Re-read the backing file, announcing keys that another process changed.
    pub fn reload(&self) -> Result<Vec<StorageEvent>, AppError> {
        let Backend::File { path, entries } = &self.inner.backend else {
            return Ok(Vec::new());
        };

        let fresh = read_entries(path)?;
        let events = {
            let mut entries = lock(entries);
            let mut events = Vec::new();
            for key in entries.keys().chain(fresh.keys()) {
                if events.iter().any(|e: &StorageEvent| e.key == *key) {
                    continue;
                }
                if let Some(event) = changed(key, entries.get(key).cloned(), fresh.get(key).cloned())
                {
                    events.push(event);
                }
            }
            *entries = fresh;
            events
        };

        self.publish(events.clone());
        Ok(events)
    }

    fn publish(&self, events: Vec<StorageEvent>) {
        for event in events {
            // No receivers is fine.
            let _ = self.inner.events.send(event);
        }
    }

    // ─── Session Tokens ──────────────────────────────────────────

    pub fn access_token(&self) -> Option<String> {
        self.get(keys::ACCESS_TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get(keys::REFRESH_TOKEN)
    }

    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) -> Result<(), AppError> {
        self.update(&[
            (keys::ACCESS_TOKEN, Some(access_token)),
            (keys::REFRESH_TOKEN, Some(refresh_token)),
        ])
    }

    pub fn set_access_token(&self, access_token: &str) -> Result<(), AppError> {
        self.set(keys::ACCESS_TOKEN, access_token)
    }

    // ─── Cached Profile ──────────────────────────────────────────

    pub fn email(&self) -> Option<String> {
        self.get(keys::EMAIL)
    }

    pub fn display_name(&self) -> Option<String> {
        self.get(keys::DISPLAY_NAME)
    }

    pub fn set_profile(&self, email: &str, display_name: &str) -> Result<(), AppError> {
        self.update(&[
            (keys::EMAIL, Some(email)),
            (keys::DISPLAY_NAME, Some(display_name)),
        ])
    }

    pub fn cached_steps(&self) -> Option<u64> {
        self.get(keys::CURRENT_STEPS).and_then(|v| v.parse().ok())
    }

    pub fn set_cached_steps(&self, steps: u64) -> Result<(), AppError> {
        self.set(keys::CURRENT_STEPS, &steps.to_string())
    }

    /// Remove every key this application owns.
    pub fn clear(&self) -> Result<(), AppError> {
        let changes: Vec<(&str, Option<&str>)> = keys::ALL.iter().map(|k| (*k, None)).collect();
        self.update(&changes)
    }

    /// True when none of the application keys are present.
    pub fn is_empty(&self) -> bool {
        keys::ALL.iter().all(|k| self.get(k).is_none())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // Entries are replaced wholesale, so a poisoned map is still consistent.
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn apply(entries: &mut BTreeMap<String, String>, changes: &[(&str, Option<&str>)]) -> Vec<StorageEvent> {
    changes
        .iter()
        .filter_map(|(key, value)| {
            let old_value = match value {
                Some(v) => entries.insert(key.to_string(), v.to_string()),
                None => entries.remove(*key),
            };
            changed(key, old_value, value.map(str::to_string))
        })
        .collect()
}

fn changed(key: &str, old_value: Option<String>, new_value: Option<String>) -> Option<StorageEvent> {
    (old_value != new_value).then(|| StorageEvent {
        key: key.to_string(),
        old_value,
        new_value,
    })
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, AppError> {
    match fs::read_to_string(path) {
        Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
        Ok(text) => serde_json::from_str(&text).map_err(|e| {
            AppError::Storage(format!("Failed to parse {}: {}", path.display(), e))
        }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(AppError::Storage(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Write to a sibling temp file and rename it into place.
fn write_entries(path: &Path, entries: &BTreeMap<String, String>) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| AppError::Storage(format!("Failed to encode storage: {}", e)))?;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| AppError::Storage(format!("Invalid storage path {}", path.display())))?;
    let tmp_path = dir.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    let result = (|| -> io::Result<()> {
        fs::create_dir_all(&dir)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&tmp_path);
        return Err(AppError::Storage(format!(
            "Failed to write {}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = TokenStore::in_memory();
        assert!(store.is_empty());

        store.set_tokens("access", "refresh").unwrap();
        store.set_profile("a@example.com", "Ada").unwrap();
        store.set_cached_steps(4500).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("access"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh"));
        assert_eq!(store.email().as_deref(), Some("a@example.com"));
        assert_eq!(store.display_name().as_deref(), Some("Ada"));
        assert_eq!(store.cached_steps(), Some(4500));

        store.clear().unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_events_only_on_change() {
        let store = TokenStore::in_memory();
        let mut rx = store.subscribe();

        store.set(keys::EMAIL, "a@example.com").unwrap();
        store.set(keys::EMAIL, "a@example.com").unwrap();
        store.remove(keys::EMAIL).unwrap();
        store.remove(keys::EMAIL).unwrap();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.key, keys::EMAIL);
        assert_eq!(first.old_value, None);
        assert_eq!(first.new_value.as_deref(), Some("a@example.com"));

        let second = rx.try_recv().unwrap();
        assert_eq!(second.new_value, None);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cached_steps_ignores_garbage() {
        let store = TokenStore::in_memory();
        store.set(keys::CURRENT_STEPS, "lots").unwrap();
        assert_eq!(store.cached_steps(), None);
    }
}
