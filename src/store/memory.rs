// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! In-memory key-value store.
//!
//! Cloning a [`MemoryStore`] yields a handle to the same map, which is how
//! several "pages" (guards) share one origin's storage in tests.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::KeyValueStore;

/// Shared in-process store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            entries: Arc::new(RwLock::new(map)),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Remove every key.
    pub fn clear(&self) {
        self.write().clear();
    }

    // A panic while holding the lock must not take every later storage
    // access down with it, so poisoning is logged and recovered.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, String>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            tracing::error!(
                target: "store::memory",
                event = "LOCK_POISONED_READ",
                "Memory store lock was poisoned during read. Recovering data."
            );
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            tracing::error!(
                target: "store::memory",
                event = "LOCK_POISONED_WRITE",
                "Memory store lock was poisoned during write. Recovering data."
            );
            poisoned.into_inner()
        })
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.write().remove(key);
        Ok(())
    }
}
