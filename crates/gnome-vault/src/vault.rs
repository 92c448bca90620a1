// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The vault trait.

use async_trait::async_trait;
use gnome_secret::SecretString;

use crate::error::VaultResult;
use crate::record::SecretRecord;

/// Trait for secret vault backends.
///
/// Records are keyed by name. All write operations are upserts:
///
/// - [`set_secret`](Self::set_secret) is a full-record upsert: it replaces
///   the value AND the tag set (tags absent from the new record are removed),
///   preserves the `created_at` of an existing record, and refreshes
///   `updated_at`.
/// - [`set_secret_value`](Self::set_secret_value) is a value-only upsert:
///   existing tags are untouched; the record is created when absent.
///
/// Deleting a missing record reports `false`, never an error.
#[async_trait]
pub trait SecretVault: Send + Sync + std::fmt::Debug {
	/// Build a fresh empty record for this vault. The record is not stored
	/// until passed to [`set_secret`](Self::set_secret).
	fn create_record(&self, name: &str) -> SecretRecord {
		SecretRecord::new(name)
	}

	/// Fetch a record by name.
	async fn get_secret(&self, name: &str) -> VaultResult<Option<SecretRecord>>;

	/// Fetch only the secret value of a record.
	async fn get_secret_value(&self, name: &str) -> VaultResult<Option<SecretString>> {
		Ok(self.get_secret(name).await?.map(|r| r.value().clone()))
	}

	/// Full-record upsert.
	async fn set_secret(&self, record: &SecretRecord) -> VaultResult<()>;

	/// Value-only upsert.
	async fn set_secret_value(&self, name: &str, value: SecretString) -> VaultResult<()>;

	/// Remove a record; `Ok(false)` when it did not exist (idempotent).
	async fn delete_secret(&self, name: &str) -> VaultResult<bool>;

	/// List the names of all stored records.
	async fn list_names(&self) -> VaultResult<Vec<String>>;

	/// Check whether a record exists.
	async fn has_secret(&self, name: &str) -> VaultResult<bool> {
		Ok(self.get_secret(name).await?.is_some())
	}
}
