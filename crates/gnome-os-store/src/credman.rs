// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Windows Credential Manager adapter.
//!
//! Generic credentials via the Advapi32 `Cred*` API. The target name is
//! composed as `{service}/{account}`, or the bare service when the store is
//! configured to use the service alone as the key. Native failures carry the
//! `GetLastError` code; `ERROR_NOT_FOUND` collapses into `Ok(None)` /
//! `Ok(false)`.
//!
//! Credential blobs returned by the OS are copied into Rust-owned memory,
//! wiped in place, and released with `CredFree` via a scoped guard.

use std::ptr;

use windows_sys::Win32::Foundation::{GetLastError, FILETIME};
use windows_sys::Win32::Security::Credentials::{
	CredDeleteW, CredEnumerateW, CredFree, CredReadW, CredWriteW, CREDENTIALW,
	CRED_ENUMERATE_ALL_CREDENTIALS, CRED_PERSIST_ENTERPRISE, CRED_PERSIST_LOCAL_MACHINE,
	CRED_PERSIST_SESSION, CRED_TYPE_GENERIC,
};

use crate::error::{OsStoreError, OsStoreResult};
use crate::OsSecretStore;

const ERROR_NOT_FOUND: u32 = 1168;
const ERROR_NOT_SUPPORTED: u32 = 50;
const ERROR_CALL_NOT_IMPLEMENTED: u32 = 120;

/// Credential persistence level.
///
/// `Enterprise` (the default) roams with the user's domain profile;
/// `Session` does not survive logoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredPersist {
	Session,
	LocalMachine,
	Enterprise,
}

impl CredPersist {
	fn as_native(self) -> u32 {
		match self {
			CredPersist::Session => CRED_PERSIST_SESSION,
			CredPersist::LocalMachine => CRED_PERSIST_LOCAL_MACHINE,
			CredPersist::Enterprise => CRED_PERSIST_ENTERPRISE,
		}
	}
}

/// The Credential Manager store.
#[derive(Debug, Clone)]
pub struct CredManagerStore {
	persist: CredPersist,
	use_service_as_key: bool,
}

impl Default for CredManagerStore {
	fn default() -> Self {
		Self {
			persist: CredPersist::Enterprise,
			use_service_as_key: false,
		}
	}
}

impl CredManagerStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_persist(mut self, persist: CredPersist) -> Self {
		self.persist = persist;
		self
	}

	/// Key credentials by the bare service name instead of
	/// `{service}/{account}`.
	pub fn with_service_as_key(mut self) -> Self {
		self.use_service_as_key = true;
		self
	}

	fn target_name(&self, service: &str, account: &str) -> String {
		if self.use_service_as_key || account.is_empty() {
			service.to_string()
		} else {
			format!("{service}/{account}")
		}
	}

	/// List stored credential target names, optionally filtered by a
	/// wildcard pattern like `myapp/*`.
	///
	/// Enumerating all credentials requires Windows Vista / Server 2008 or
	/// later; on older systems the native layer reports not-supported, which
	/// surfaces as [`OsStoreError::NotSupported`] rather than a crash.
	pub fn enumerate(&self, filter: Option<&str>) -> OsStoreResult<Vec<String>> {
		let filter_wide = filter.map(to_wide);
		let flags = if filter.is_none() {
			CRED_ENUMERATE_ALL_CREDENTIALS
		} else {
			0
		};

		let mut count: u32 = 0;
		let mut credentials: *mut *mut CREDENTIALW = ptr::null_mut();

		// SAFETY: the filter (when present) is a live NUL-terminated wide
		// string; the output array is released by CredFree below.
		let ok = unsafe {
			CredEnumerateW(
				filter_wide.as_ref().map_or(ptr::null(), |w| w.as_ptr()),
				flags,
				&mut count,
				&mut credentials,
			)
		};
		if ok == 0 {
			// SAFETY: trivially safe thread-local read.
			let code = unsafe { GetLastError() };
			if code == ERROR_NOT_FOUND {
				return Ok(Vec::new());
			}
			return Err(last_error("CredEnumerate"));
		}

		// SAFETY: CredEnumerateW succeeded, so `credentials` points at
		// `count` valid credential pointers until CredFree.
		let names = unsafe {
			let list = std::slice::from_raw_parts(credentials, count as usize);
			let names = list
				.iter()
				.map(|&cred| {
					let target = (*cred).TargetName;
					let mut len = 0;
					while *target.add(len) != 0 {
						len += 1;
					}
					String::from_utf16_lossy(std::slice::from_raw_parts(target, len))
				})
				.collect();
			CredFree(credentials as *mut core::ffi::c_void);
			names
		};

		Ok(names)
	}
}

fn to_wide(s: &str) -> Vec<u16> {
	s.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Frees an OS-allocated credential when dropped.
struct CredGuard(*mut CREDENTIALW);

impl Drop for CredGuard {
	fn drop(&mut self) {
		if !self.0.is_null() {
			// SAFETY: the pointer came from CredReadW.
			unsafe { CredFree(self.0 as *mut core::ffi::c_void) };
		}
	}
}

fn last_error(op: &'static str) -> OsStoreError {
	// SAFETY: trivially safe thread-local read.
	let code = unsafe { GetLastError() };
	match code {
		ERROR_NOT_SUPPORTED | ERROR_CALL_NOT_IMPLEMENTED => OsStoreError::NotSupported { op },
		code => OsStoreError::Native {
			op,
			code: code as i32,
		},
	}
}

impl OsSecretStore for CredManagerStore {
	fn get_secret_bytes(&self, service: &str, account: &str) -> OsStoreResult<Option<Vec<u8>>> {
		let target = to_wide(&self.target_name(service, account));
		let mut credential: *mut CREDENTIALW = ptr::null_mut();

		// SAFETY: target is a live NUL-terminated wide string; the output
		// credential is released by CredGuard.
		let ok = unsafe { CredReadW(target.as_ptr(), CRED_TYPE_GENERIC, 0, &mut credential) };
		if ok == 0 {
			// SAFETY: trivially safe thread-local read.
			let code = unsafe { GetLastError() };
			if code == ERROR_NOT_FOUND {
				return Ok(None);
			}
			return Err(last_error("CredRead"));
		}

		let _guard = CredGuard(credential);
		// SAFETY: CredReadW succeeded, so the credential is valid and the
		// blob points at CredentialBlobSize bytes (possibly zero).
		let bytes = unsafe {
			let cred = &*credential;
			let len = cred.CredentialBlobSize as usize;
			let copied = if len == 0 {
				Vec::new()
			} else {
				std::slice::from_raw_parts(cred.CredentialBlob, len).to_vec()
			};
			// Wipe the native copy before CredFree releases it.
			if len != 0 {
				ptr::write_bytes(cred.CredentialBlob, 0, len);
			}
			copied
		};

		Ok(Some(bytes))
	}

	fn set_secret(&self, service: &str, account: &str, value: &[u8]) -> OsStoreResult<()> {
		let mut target = to_wide(&self.target_name(service, account));
		let mut user = to_wide(account);

		let credential = CREDENTIALW {
			Flags: 0,
			Type: CRED_TYPE_GENERIC,
			TargetName: target.as_mut_ptr(),
			Comment: ptr::null_mut(),
			LastWritten: FILETIME {
				dwLowDateTime: 0,
				dwHighDateTime: 0,
			},
			CredentialBlobSize: value.len() as u32,
			CredentialBlob: value.as_ptr() as *mut u8,
			Persist: self.persist.as_native(),
			AttributeCount: 0,
			Attributes: ptr::null_mut(),
			TargetAlias: ptr::null_mut(),
			UserName: user.as_mut_ptr(),
		};

		// SAFETY: the credential struct and every buffer it references are
		// live for the duration of the call; the OS copies them.
		let ok = unsafe { CredWriteW(&credential, 0) };
		if ok == 0 {
			return Err(last_error("CredWrite"));
		}

		tracing::debug!(service, account, "credential written");
		Ok(())
	}

	fn delete_secret(&self, service: &str, account: &str) -> OsStoreResult<bool> {
		let target = to_wide(&self.target_name(service, account));

		// SAFETY: target is a live NUL-terminated wide string.
		let ok = unsafe { CredDeleteW(target.as_ptr(), CRED_TYPE_GENERIC, 0) };
		if ok == 0 {
			// SAFETY: trivially safe thread-local read.
			let code = unsafe { GetLastError() };
			if code == ERROR_NOT_FOUND {
				return Ok(false);
			}
			return Err(last_error("CredDelete"));
		}

		Ok(true)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	/// Verifies target-name composition for both keying modes.
	#[test]
	fn target_name_composition() {
		let store = CredManagerStore::new();
		assert_eq!(store.target_name("myapp", "alice"), "myapp/alice");
		assert_eq!(store.target_name("myapp", ""), "myapp");

		let bare = CredManagerStore::new().with_service_as_key();
		assert_eq!(bare.target_name("myapp", "alice"), "myapp");
	}

	/// Verifies the default persistence is Enterprise.
	#[test]
	fn default_persist_is_enterprise() {
		assert_eq!(CredManagerStore::new().persist, CredPersist::Enterprise);
		assert_eq!(CredPersist::Enterprise.as_native(), CRED_PERSIST_ENTERPRISE);
	}

	// Live Credential Manager tests mutate the user's credential set, so
	// they are ignored by default.

	/// Verifies the set/get/delete scenario against the real store.
	#[test]
	#[ignore]
	fn live_set_get_delete() {
		let store = CredManagerStore::new().with_persist(CredPersist::Session);

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
