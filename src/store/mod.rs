// Copyright (c) 2024-2025 Jesse Morgan
// Licensed under the MIT License. See LICENSE file for details.

//! Key-value storage backing the session gate.
//!
//! The guard never touches a concrete storage API. It talks to two
//! [`KeyValueStore`] instances:
//!
//! - a **durable** store holding the session record (survives restarts,
//!   shared by every page of the site)
//! - a **transient** store holding the one-shot redirect target (scoped to
//!   the current browsing session)
//!
//! Two implementations ship with the crate:
//!
//! - [`MemoryStore`] - shared in-process map, used by tests and embedders
//! - [`FileStore`] - JSON object on disk with advisory file locking

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use anyhow::Result;
use std::sync::Arc;

/// Flat string-to-string store with interior mutability.
///
/// Mirrors the browser storage contract: values are plain strings, a
/// missing key reads as `None`, removing a missing key is not an error.
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. No-op when the key is absent.
    fn remove(&self, key: &str) -> Result<()>;

    /// Delete several keys. Stops at the first failure.
    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.remove(key)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}
