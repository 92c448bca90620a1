// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory vault for tests and ephemeral use.

use std::collections::HashMap;

use async_trait::async_trait;
use gnome_secret::SecretString;

use crate::error::VaultResult;
use crate::record::SecretRecord;
use crate::vault::SecretVault;

/// A [`SecretVault`] backed by a process-local map.
#[derive(Debug, Default)]
pub struct MemorySecretVault {
	records: tokio::sync::RwLock<HashMap<String, SecretRecord>>,
}

impl MemorySecretVault {
	/// Create a new empty in-memory vault.
	pub fn new() -> Self {
		Self::default()
	}
}

#[async_trait]
impl SecretVault for MemorySecretVault {
	async fn get_secret(&self, name: &str) -> VaultResult<Option<SecretRecord>> {
		let records = self.records.read().await;
		Ok(records.get(name).cloned())
	}

	async fn set_secret(&self, record: &SecretRecord) -> VaultResult<()> {
		let mut records = self.records.write().await;
		match records.get_mut(record.name()) {
			Some(existing) => existing.merge_from(record),
			None => {
				let mut fresh = record.clone();
				fresh.touch();
				records.insert(record.name().to_string(), fresh);
			}
		}
		Ok(())
	}

	async fn set_secret_value(&self, name: &str, value: SecretString) -> VaultResult<()> {
		let mut records = self.records.write().await;
		match records.get_mut(name) {
			Some(existing) => existing.set_value(value),
			None => {
				let mut fresh = SecretRecord::new(name);
				fresh.set_value(value);
				records.insert(name.to_string(), fresh);
			}
		}
		Ok(())
	}

	async fn delete_secret(&self, name: &str) -> VaultResult<bool> {
		let mut records = self.records.write().await;
		Ok(records.remove(name).is_some())
	}

	async fn list_names(&self) -> VaultResult<Vec<String>> {
		let records = self.records.read().await;
		let mut names: Vec<String> = records.keys().cloned().collect();
		names.sort();
		Ok(names)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn roundtrip() {
		let vault = MemorySecretVault::new();

		vault
			.set_secret_value("db-password", SecretString::new("p@ss".to_string()))
			.await
			.unwrap();

		let value = vault.get_secret_value("db-password").await.unwrap().unwrap();
		assert_eq!(value.expose(), "p@ss");
		assert!(vault.has_secret("db-password").await.unwrap());
	}

	#[tokio::test]
	async fn missing_record_is_none() {
		let vault = MemorySecretVault::new();
		assert!(vault.get_secret("nope").await.unwrap().is_none());
		assert!(vault.get_secret_value("nope").await.unwrap().is_none());
	}

	/// Full-record set replaces the tag set and preserves created_at.
	#[tokio::test]
	async fn full_upsert_replaces_tags_and_keeps_created_at() {
		let vault = MemorySecretVault::new();

		let mut record = vault.create_record("api-key");
		record.set_value(SecretString::new("v1".to_string()));
		record.set_tag("env", "prod");
		record.set_tag("team", "payments");
		vault.set_secret(&record).await.unwrap();

		let stored = vault.get_secret("api-key").await.unwrap().unwrap();
		let created = stored.created_at();
		assert_eq!(stored.tags().len(), 2);

		tokio::time::sleep(Duration::from_millis(5)).await;

		let mut replacement = vault.create_record("api-key");
		replacement.set_value(SecretString::new("v2".to_string()));
		replacement.set_tag("env", "staging");
		vault.set_secret(&replacement).await.unwrap();

		let stored = vault.get_secret("api-key").await.unwrap().unwrap();
		assert_eq!(stored.value().expose(), "v2");
		assert_eq!(stored.tags().len(), 1);
		assert_eq!(stored.tags().get("env").map(String::as_str), Some("staging"));
		assert_eq!(stored.created_at(), created);
		assert!(stored.updated_at() > created);
	}

	/// Value-only set leaves existing tags untouched.
	#[tokio::test]
	async fn value_upsert_preserves_tags() {
		let vault = MemorySecretVault::new();

		let mut record = vault.create_record("api-key");
		record.set_value(SecretString::new("v1".to_string()));
		record.set_tag("env", "prod");
		vault.set_secret(&record).await.unwrap();

		vault
			.set_secret_value("api-key", SecretString::new("v2".to_string()))
			.await
			.unwrap();

		let stored = vault.get_secret("api-key").await.unwrap().unwrap();
		assert_eq!(stored.value().expose(), "v2");
		assert_eq!(stored.tags().get("env").map(String::as_str), Some("prod"));
	}

	#[tokio::test]
	async fn delete_is_idempotent() {
		let vault = MemorySecretVault::new();

		vault
			.set_secret_value("tmp", SecretString::new("x".to_string()))
			.await
			.unwrap();

		assert!(vault.delete_secret("tmp").await.unwrap());
		assert!(!vault.delete_secret("tmp").await.unwrap());
		assert!(!vault.has_secret("tmp").await.unwrap());
	}

	#[tokio::test]
	async fn list_names_is_sorted() {
		let vault = MemorySecretVault::new();

		for name in ["charlie", "alpha", "bravo"] {
			vault
				.set_secret_value(name, SecretString::new("v".to_string()))
				.await
				.unwrap();
		}

		assert_eq!(vault.list_names().await.unwrap(), vec!["alpha", "bravo", "charlie"]);
	}
}
