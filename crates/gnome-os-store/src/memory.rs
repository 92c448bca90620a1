// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory credential store for tests and ephemeral use.

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use zeroize::Zeroize;

use crate::error::OsStoreResult;
use crate::OsSecretStore;

/// An [`OsSecretStore`] backed by a process-local map.
///
/// Implements the same not-found and idempotent-delete contract as the
/// native adapters so it can stand in for them in tests.
#[derive(Default)]
pub struct MemoryOsStore {
	entries: Mutex<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryOsStore {
	pub fn new() -> Self {
		Self::default()
	}
}

impl Drop for MemoryOsStore {
	fn drop(&mut self) {
		if let Ok(mut entries) = self.entries.lock() {
			for value in entries.values_mut() {
				value.zeroize();
			}
		}
	}
}

impl fmt::Debug for MemoryOsStore {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let len = self.entries.lock().map(|e| e.len()).unwrap_or(0);
		f.debug_struct("MemoryOsStore").field("entries", &len).finish()
	}
}

impl OsSecretStore for MemoryOsStore {
	fn get_secret_bytes(&self, service: &str, account: &str) -> OsStoreResult<Option<Vec<u8>>> {
		let entries = self.entries.lock().expect("store mutex poisoned");
		Ok(entries
			.get(&(service.to_string(), account.to_string()))
			.cloned())
	}

	fn set_secret(&self, service: &str, account: &str, value: &[u8]) -> OsStoreResult<()> {
		let mut entries = self.entries.lock().expect("store mutex poisoned");
		if let Some(mut old) =
			entries.insert((service.to_string(), account.to_string()), value.to_vec())
		{
			old.zeroize();
		}
		Ok(())
	}

	fn delete_secret(&self, service: &str, account: &str) -> OsStoreResult<bool> {
		let mut entries = self.entries.lock().expect("store mutex poisoned");
		match entries.remove(&(service.to_string(), account.to_string())) {
			Some(mut old) => {
				old.zeroize();
				Ok(true)
			}
			None => Ok(false),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies the set/get/delete scenario shared by all adapters.
	#[test]
	fn set_get_delete_roundtrip() {
		let store = MemoryOsStore::new();

		store.set_secret("myapp", "alice", b"p@ss").unwrap();
		assert_eq!(
			store.get_secret("myapp", "alice").unwrap().as_deref(),
			Some("p@ss")
		);

		assert!(store.delete_secret("myapp", "alice").unwrap());
		assert_eq!(store.get_secret("myapp", "alice").unwrap(), None);
	}

	/// Verifies that deleting a nonexistent entry reports false, never an
	/// error.
	#[test]
	fn delete_missing_is_idempotent() {
		let store = MemoryOsStore::new();

		assert!(!store.delete_secret("myapp", "nobody").unwrap());
		assert!(!store.delete_secret("myapp", "nobody").unwrap());
	}

	/// Verifies that set overwrites an existing value.
	#[test]
	fn set_overwrites() {
		let store = MemoryOsStore::new();

		store.set_secret("svc", "a", b"one").unwrap();
		store.set_secret("svc", "a", b"two").unwrap();

		assert_eq!(store.get_secret("svc", "a").unwrap().as_deref(), Some("two"));
	}

	/// Verifies that entries are keyed by the full (service, account) pair.
	#[test]
	fn keys_are_pairwise() {
		let store = MemoryOsStore::new();

		store.set_secret("svc1", "a", b"x").unwrap();
		store.set_secret("svc2", "a", b"y").unwrap();

		assert_eq!(store.get_secret("svc1", "a").unwrap().as_deref(), Some("x"));
		assert_eq!(store.get_secret("svc2", "a").unwrap().as_deref(), Some("y"));
		assert_eq!(store.get_secret("svc1", "b").unwrap(), None);
	}
}
