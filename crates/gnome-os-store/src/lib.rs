// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! OS-native credential storage.
//!
//! [`OsSecretStore`] is the platform-agnostic shape over the operating
//! system's credential facility, keyed by a `(service, account)` pair:
//!
//! - **macOS**: Keychain generic passwords ([`KeychainStore`]).
//! - **Windows**: Credential Manager generic credentials
//!   ([`CredManagerStore`]).
//! - **Other platforms**: [`UnsupportedStore`], which fails fast with a
//!   typed error instead of attempting a native call.
//!
//! The trait is synchronous — neither platform has an async-native
//! credential API. Callers in async contexts offload via
//! `tokio::task::spawn_blocking` (see `gnome-vault`). Each call is a single
//! atomic OS operation; the OS store is the source of truth and this layer
//! holds no cached state.
//!
//! One implementation is selected per target OS by conditional compilation;
//! [`default_store`] returns the platform's implementation.

pub mod error;
pub mod memory;

#[cfg(windows)]
pub mod credman;
#[cfg(target_os = "macos")]
pub mod keychain;
pub mod unsupported;

use zeroize::Zeroize;

pub use error::{OsStoreError, OsStoreResult};
pub use memory::MemoryOsStore;
pub use unsupported::UnsupportedStore;

#[cfg(windows)]
pub use credman::{CredManagerStore, CredPersist};
#[cfg(target_os = "macos")]
pub use keychain::KeychainStore;

/// Platform-agnostic OS credential storage keyed by `(service, account)`.
pub trait OsSecretStore: Send + Sync + std::fmt::Debug {
	/// Fetch a secret as a UTF-8 string; `Ok(None)` when absent.
	///
	/// Non-UTF-8 stored values are an error; use
	/// [`get_secret_bytes`](Self::get_secret_bytes) for raw blobs.
	fn get_secret(&self, service: &str, account: &str) -> OsStoreResult<Option<String>> {
		match self.get_secret_bytes(service, account)? {
			Some(mut bytes) => match String::from_utf8(bytes.clone()) {
				Ok(s) => {
					bytes.zeroize();
					Ok(Some(s))
				}
				Err(_) => {
					bytes.zeroize();
					Err(OsStoreError::NotUtf8)
				}
			},
			None => Ok(None),
		}
	}

	/// Fetch a secret's raw bytes; `Ok(None)` when absent.
	fn get_secret_bytes(&self, service: &str, account: &str) -> OsStoreResult<Option<Vec<u8>>>;

	/// Create or overwrite the secret for `(service, account)`.
	fn set_secret(&self, service: &str, account: &str, value: &[u8]) -> OsStoreResult<()>;

	/// Remove the secret; `Ok(false)` when it did not exist (idempotent).
	fn delete_secret(&self, service: &str, account: &str) -> OsStoreResult<bool>;
}

/// The credential store for the current platform.
pub fn default_store() -> Box<dyn OsSecretStore> {
	#[cfg(target_os = "macos")]
	{
		Box::new(KeychainStore::new())
	}
	#[cfg(windows)]
	{
		Box::new(CredManagerStore::new())
	}
	#[cfg(not(any(target_os = "macos", windows)))]
	{
		Box::new(UnsupportedStore)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies that the default trait get_secret surfaces non-UTF-8 values
	/// as a typed error rather than lossy text.
	#[test]
	fn non_utf8_secret_is_an_error() {
		let store = MemoryOsStore::new();
		store.set_secret("svc", "acct", &[0xFF, 0xFE, 0x00]).unwrap();

		assert!(matches!(
			store.get_secret("svc", "acct"),
			Err(OsStoreError::NotUtf8)
		));
		// The raw bytes remain reachable.
		assert_eq!(
			store.get_secret_bytes("svc", "acct").unwrap().unwrap(),
			vec![0xFF, 0xFE, 0x00]
		);
	}
}
