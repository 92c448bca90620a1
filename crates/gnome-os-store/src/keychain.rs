// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! macOS Keychain adapter.
//!
//! Generic-password items via the Security framework, keyed by
//! `(service, account)`. `set_generic_password` probes for an existing item
//! and modifies its data in place, adding a new item only when none exists,
//! which gives this adapter its overwrite semantics for free.
//!
//! OSStatus codes are translated through a fixed table into the closed
//! [`OsStoreError`] taxonomy; `errSecItemNotFound` is collapsed into
//! `Ok(None)` / `Ok(false)` at reads and deletes.

use security_framework::passwords::{
	delete_generic_password, get_generic_password, set_generic_password,
};

use crate::error::{OsStoreError, OsStoreResult};
use crate::OsSecretStore;

const ERR_SEC_ITEM_NOT_FOUND: i32 = -25300;
const ERR_SEC_DUPLICATE_ITEM: i32 = -25299;
const ERR_SEC_AUTH_FAILED: i32 = -25293;
const ERR_SEC_INVALID_KEYCHAIN: i32 = -25295;
const ERR_SEC_INTERACTION_NOT_ALLOWED: i32 = -25308;
const ERR_SEC_USER_CANCELED: i32 = -128;

/// Translate an OSStatus into the closed error taxonomy.
///
/// Not-found is handled by the caller before reaching here.
fn map_status(op: &'static str, code: i32) -> OsStoreError {
	match code {
		ERR_SEC_DUPLICATE_ITEM => OsStoreError::DuplicateItem,
		ERR_SEC_AUTH_FAILED => OsStoreError::AuthFailed,
		ERR_SEC_INVALID_KEYCHAIN => OsStoreError::InvalidKeychain,
		ERR_SEC_INTERACTION_NOT_ALLOWED => OsStoreError::InteractionNotAllowed,
		ERR_SEC_USER_CANCELED => OsStoreError::UserCanceled,
		code => OsStoreError::Native { op, code },
	}
}

/// The default-keychain credential store.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeychainStore;

impl KeychainStore {
	pub fn new() -> Self {
		Self
	}
}

impl OsSecretStore for KeychainStore {
	fn get_secret_bytes(&self, service: &str, account: &str) -> OsStoreResult<Option<Vec<u8>>> {
		match get_generic_password(service, account) {
			Ok(bytes) => Ok(Some(bytes)),
			Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(None),
			Err(e) => Err(map_status("SecItemCopyMatching", e.code())),
		}
	}

	fn set_secret(&self, service: &str, account: &str, value: &[u8]) -> OsStoreResult<()> {
		set_generic_password(service, account, value)
			.map_err(|e| map_status("SecItemAdd", e.code()))?;
		tracing::debug!(service, account, "keychain item written");
		Ok(())
	}

	fn delete_secret(&self, service: &str, account: &str) -> OsStoreResult<bool> {
		match delete_generic_password(service, account) {
			Ok(()) => Ok(true),
			Err(e) if e.code() == ERR_SEC_ITEM_NOT_FOUND => Ok(false),
			Err(e) => Err(map_status("SecItemDelete", e.code())),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies the error table maps every documented OSStatus.
	#[test]
	fn status_table_is_complete() {
		assert!(matches!(
			map_status("op", ERR_SEC_DUPLICATE_ITEM),
			OsStoreError::DuplicateItem
		));
		assert!(matches!(
			map_status("op", ERR_SEC_AUTH_FAILED),
			OsStoreError::AuthFailed
		));
		assert!(matches!(
			map_status("op", ERR_SEC_INVALID_KEYCHAIN),
			OsStoreError::InvalidKeychain
		));
		assert!(matches!(
			map_status("op", ERR_SEC_INTERACTION_NOT_ALLOWED),
			OsStoreError::InteractionNotAllowed
		));
		assert!(matches!(
			map_status("op", ERR_SEC_USER_CANCELED),
			OsStoreError::UserCanceled
		));
		assert!(matches!(
			map_status("op", -4),
			OsStoreError::Native { code: -4, .. }
		));
	}

	// Live keychain tests mutate the user's default keychain, so they are
	// ignored by default; run with --ignored on a machine where that is
	// acceptable.

	/// Verifies the set/get/delete scenario against the real keychain.
	#[test]
	#[ignore]
	fn live_set_get_delete() {
		let store = KeychainStore::new();

		store.set_secret("gnome-os-store-test", "alice", b"p@ss").unwrap();
		assert_eq!(
			store
				.get_secret("gnome-os-store-test", "alice")
				.unwrap()
				.as_deref(),
			Some("p@ss")
		);

		assert!(store.delete_secret("gnome-os-store-test", "alice").unwrap());
		assert_eq!(store.get_secret("gnome-os-store-test", "alice").unwrap(), None);
		assert!(!store.delete_secret("gnome-os-store-test", "alice").unwrap());
	}
}
