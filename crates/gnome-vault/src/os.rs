// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OS credential store exposed as a vault.
//!
//! Wraps an [`OsSecretStore`] plus a fixed service name, mapping record names
//! to OS accounts. The OS layer stores only the value: record metadata
//! (timestamps, tags, expiry) is synthesized on read and dropped on write.
//!
//! The store's native calls are blocking, so every operation is offloaded
//! with `tokio::task::spawn_blocking`. Cancelling a vault future can only
//! prevent a call from starting, never interrupt a native call in flight.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use gnome_os_store::OsSecretStore;
use gnome_secret::SecretString;

use crate::error::{VaultError, VaultResult};
use crate::record::SecretRecord;
use crate::vault::SecretVault;

/// A [`SecretVault`] backed by the operating system's credential facility.
#[derive(Debug, Clone)]
pub struct OsStoreVault {
	store: Arc<dyn OsSecretStore>,
	service: String,
}

impl OsStoreVault {
	/// Wrap a store under a fixed service name.
	pub fn new(store: Arc<dyn OsSecretStore>, service: impl Into<String>) -> Self {
		Self {
			store,
			service: service.into(),
		}
	}

	/// The platform's default store under the given service name.
	pub fn for_platform(service: impl Into<String>) -> Self {
		Self::new(Arc::from(gnome_os_store::default_store()), service)
	}

	pub fn service(&self) -> &str {
		&self.service
	}
}

#[async_trait]
impl SecretVault for OsStoreVault {
	async fn get_secret(&self, name: &str) -> VaultResult<Option<SecretRecord>> {
		let store = Arc::clone(&self.store);
		let service = self.service.clone();
		let account = name.to_string();

		let value = task::spawn_blocking(move || store.get_secret(&service, &account))
			.await
			.map_err(|e| VaultError::Task(e.to_string()))??;

		Ok(value.map(|v| {
			let mut record = SecretRecord::new(name);
			record.set_value(SecretString::new(v));
			record
		}))
	}

	async fn set_secret(&self, record: &SecretRecord) -> VaultResult<()> {
		self.set_secret_value(record.name(), record.value().clone())
			.await
	}

	async fn set_secret_value(&self, name: &str, value: SecretString) -> VaultResult<()> {
		let store = Arc::clone(&self.store);
		let service = self.service.clone();
		let account = name.to_string();

		task::spawn_blocking(move || {
			store.set_secret(&service, &account, value.expose().as_bytes())
		})
		.await
		.map_err(|e| VaultError::Task(e.to_string()))??;

		Ok(())
	}

	async fn delete_secret(&self, name: &str) -> VaultResult<bool> {
		let store = Arc::clone(&self.store);
		let service = self.service.clone();
		let account = name.to_string();

		let deleted = task::spawn_blocking(move || store.delete_secret(&service, &account))
			.await
			.map_err(|e| VaultError::Task(e.to_string()))??;

		Ok(deleted)
	}

	/// The OS facilities have no portable enumeration, so listing is not
	/// available through this adapter.
	async fn list_names(&self) -> VaultResult<Vec<String>> {
		Err(VaultError::NotSupported("list_names"))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gnome_os_store::MemoryOsStore;

	fn vault() -> OsStoreVault {
		OsStoreVault::new(Arc::new(MemoryOsStore::new()), "gnome-vault-test")
	}

	#[tokio::test]
	async fn roundtrip() {
		let vault = vault();

		vault
			.set_secret_value("db-password", SecretString::new("p@ss".to_string()))
			.await
			.unwrap();

		let record = vault.get_secret("db-password").await.unwrap().unwrap();
		assert_eq!(record.name(), "db-password");
		assert_eq!(record.value().expose(), "p@ss");
	}

	/// Metadata is synthesized on read: a full record written through the
	/// adapter comes back with fresh timestamps and no tags.
	#[tokio::test]
	async fn metadata_is_not_persisted() {
		let vault = vault();

		let mut record = vault.create_record("api-key");
		record.set_value(SecretString::new("sk-123".to_string()));
		record.set_tag("env", "prod");
		vault.set_secret(&record).await.unwrap();

		let stored = vault.get_secret("api-key").await.unwrap().unwrap();
		assert_eq!(stored.value().expose(), "sk-123");
		assert!(stored.tags().is_empty());
	}

	#[tokio::test]
	async fn delete_is_idempotent() {
		let vault = vault();

		vault
			.set_secret_value("tmp", SecretString::new("x".to_string()))
			.await
			.unwrap();

		assert!(vault.delete_secret("tmp").await.unwrap());
		assert!(!vault.delete_secret("tmp").await.unwrap());
		assert!(vault.get_secret("tmp").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn listing_is_unsupported() {
		assert!(matches!(
			vault().list_names().await,
			Err(VaultError::NotSupported("list_names"))
		));
	}
}
