// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The secret record model.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use gnome_secret::SecretString;

/// A named secret with metadata.
///
/// The name is the unique key within a vault and is immutable once the record
/// is created. `created_at` is set once; `updated_at` is refreshed on every
/// value or tag change. The value itself is a [`SecretString`], so a record
/// never leaks its secret through `Debug` or `Display`.
#[derive(Debug, Clone)]
pub struct SecretRecord {
	name: String,
	value: SecretString,
	expires_at: Option<DateTime<Utc>>,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
	tags: HashMap<String, String>,
}

impl SecretRecord {
	/// Create an empty record with both timestamps set to now.
	pub fn new(name: impl Into<String>) -> Self {
		let now = Utc::now();
		Self {
			name: name.into(),
			value: SecretString::new(String::new()),
			expires_at: None,
			created_at: now,
			updated_at: now,
			tags: HashMap::new(),
		}
	}

	/// Rebuild a record from persisted parts, keeping its stored timestamps.
	pub(crate) fn from_parts(
		name: String,
		value: SecretString,
		expires_at: Option<DateTime<Utc>>,
		created_at: DateTime<Utc>,
		updated_at: DateTime<Utc>,
		tags: HashMap<String, String>,
	) -> Self {
		Self {
			name,
			value,
			expires_at,
			created_at,
			updated_at,
			tags,
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> &SecretString {
		&self.value
	}

	/// Replace the secret value, refreshing `updated_at`.
	pub fn set_value(&mut self, value: SecretString) {
		self.value = value;
		self.touch();
	}

	pub fn expires_at(&self) -> Option<DateTime<Utc>> {
		self.expires_at
	}

	pub fn set_expires_at(&mut self, expires_at: Option<DateTime<Utc>>) {
		self.expires_at = expires_at;
		self.touch();
	}

	/// Whether the record carries an expiry in the past.
	pub fn is_expired(&self) -> bool {
		self.expires_at.is_some_and(|at| at <= Utc::now())
	}

	pub fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}

	pub fn updated_at(&self) -> DateTime<Utc> {
		self.updated_at
	}

	pub fn tags(&self) -> &HashMap<String, String> {
		&self.tags
	}

	/// Set or replace a single tag, refreshing `updated_at`.
	pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.tags.insert(key.into(), value.into());
		self.touch();
	}

	/// Remove a tag; returns the previous value when present.
	pub fn remove_tag(&mut self, key: &str) -> Option<String> {
		let removed = self.tags.remove(key);
		if removed.is_some() {
			self.touch();
		}
		removed
	}

	/// Overwrite value, expiry, and tags from `incoming`, keeping this
	/// record's name and `created_at`. Tags absent from `incoming` are
	/// removed.
	pub(crate) fn merge_from(&mut self, incoming: &SecretRecord) {
		self.value = incoming.value.clone();
		self.expires_at = incoming.expires_at;
		self.tags = incoming.tags.clone();
		self.touch();
	}

	pub(crate) fn touch(&mut self) {
		self.updated_at = Utc::now();
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies that a new record has an empty value and matching timestamps.
	#[test]
	fn new_record_is_empty() {
		let record = SecretRecord::new("db-password");

		assert_eq!(record.name(), "db-password");
		assert_eq!(record.value().expose(), "");
		assert_eq!(record.created_at(), record.updated_at());
		assert!(record.tags().is_empty());
		assert!(!record.is_expired());
	}

	/// Verifies that value and tag changes refresh updated_at but never
	/// created_at.
	#[test]
	fn mutation_refreshes_updated_at_only() {
		let mut record = SecretRecord::new("api-key");
		let created = record.created_at();

		std::thread::sleep(std::time::Duration::from_millis(5));
		record.set_value(SecretString::new("sk-123".to_string()));

		assert_eq!(record.created_at(), created);
		assert!(record.updated_at() > created);

		let after_value = record.updated_at();
		std::thread::sleep(std::time::Duration::from_millis(5));
		record.set_tag("env", "prod");

		assert!(record.updated_at() > after_value);
		assert_eq!(record.created_at(), created);
	}

	/// Verifies expiry evaluation against past and future instants.
	#[test]
	fn expiry_checks_the_clock() {
		let mut record = SecretRecord::new("token");
		record.set_expires_at(Some(Utc::now() - chrono::Duration::seconds(1)));
		assert!(record.is_expired());

		record.set_expires_at(Some(Utc::now() + chrono::Duration::hours(1)));
		assert!(!record.is_expired());
	}

	/// Verifies that Debug output never contains the secret value.
	#[test]
	fn debug_redacts_value() {
		let mut record = SecretRecord::new("pw");
		record.set_value(SecretString::new("hunter2".to_string()));

		let rendered = format!("{record:?}");
		assert!(!rendered.contains("hunter2"));
	}
}
