// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Windows DPAPI bindings.
//!
//! Thin wrappers over `CryptProtectData` / `CryptUnprotectData`. Output blobs
//! allocated by the OS are copied into Rust-owned memory and released with
//! `LocalFree` via a scoped guard, so the native allocation is freed on every
//! path including errors.

use std::ptr;

use windows_sys::Win32::Foundation::{GetLastError, HLOCAL};
use windows_sys::Win32::Security::Cryptography::{
	CryptProtectData, CryptUnprotectData, CRYPT_INTEGER_BLOB, CRYPTPROTECT_LOCAL_MACHINE,
	CRYPTPROTECT_UI_FORBIDDEN,
};
use windows_sys::Win32::System::Memory::LocalFree;

use crate::error::{ProtectError, ProtectResult};
use crate::ProtectionScope;

/// Frees an OS-allocated blob when dropped.
struct BlobGuard(*mut core::ffi::c_void);

impl Drop for BlobGuard {
	fn drop(&mut self) {
		if !self.0.is_null() {
			// SAFETY: the pointer came from CryptProtectData/CryptUnprotectData,
			// which allocate with LocalAlloc.
			unsafe { LocalFree(self.0 as HLOCAL) };
		}
	}
}

fn blob(data: &[u8]) -> CRYPT_INTEGER_BLOB {
	CRYPT_INTEGER_BLOB {
		cbData: data.len() as u32,
		pbData: data.as_ptr() as *mut u8,
	}
}

fn flags(scope: ProtectionScope) -> u32 {
	match scope {
		ProtectionScope::CurrentUser => CRYPTPROTECT_UI_FORBIDDEN,
		ProtectionScope::LocalMachine => CRYPTPROTECT_UI_FORBIDDEN | CRYPTPROTECT_LOCAL_MACHINE,
	}
}

pub fn protect(
	data: &[u8],
	entropy: Option<&[u8]>,
	scope: ProtectionScope,
) -> ProtectResult<Vec<u8>> {
	let input = blob(data);
	let entropy_blob = entropy.map(blob);
	let mut output = CRYPT_INTEGER_BLOB {
		cbData: 0,
		pbData: ptr::null_mut(),
	};

	// SAFETY: all pointers refer to live stack/slice memory for the duration
	// of the call; the output blob is released by BlobGuard.
	let ok = unsafe {
		CryptProtectData(
			&input,
			ptr::null(),
			entropy_blob
				.as_ref()
				.map_or(ptr::null(), |b| b as *const CRYPT_INTEGER_BLOB),
			ptr::null(),
			ptr::null(),
			flags(scope),
			&mut output,
		)
	};

	if ok == 0 {
		let code = unsafe { GetLastError() };
		return Err(ProtectError::Native { code });
	}

	let _guard = BlobGuard(output.pbData as *mut core::ffi::c_void);
	// SAFETY: the OS guarantees pbData points at cbData valid bytes on success.
	let bytes =
		unsafe { std::slice::from_raw_parts(output.pbData, output.cbData as usize) }.to_vec();
	Ok(bytes)
}

pub fn unprotect(
	protected: &[u8],
	entropy: Option<&[u8]>,
	scope: ProtectionScope,
) -> ProtectResult<Vec<u8>> {
	if protected.is_empty() {
		return Err(ProtectError::InvalidEnvelope);
	}

	let input = blob(protected);
	let entropy_blob = entropy.map(blob);
	let mut output = CRYPT_INTEGER_BLOB {
		cbData: 0,
		pbData: ptr::null_mut(),
	};

	// SAFETY: see protect().
	let ok = unsafe {
		CryptUnprotectData(
			&input,
			ptr::null_mut(),
			entropy_blob
				.as_ref()
				.map_or(ptr::null(), |b| b as *const CRYPT_INTEGER_BLOB),
			ptr::null(),
			ptr::null(),
			flags(scope),
			&mut output,
		)
	};

	if ok == 0 {
		let code = unsafe { GetLastError() };
		return Err(ProtectError::Native { code });
	}

	let _guard = BlobGuard(output.pbData as *mut core::ffi::c_void);
	// SAFETY: the OS guarantees pbData points at cbData valid bytes on success.
	let bytes =
		unsafe { std::slice::from_raw_parts(output.pbData, output.cbData as usize) }.to_vec();
	Ok(bytes)
}
